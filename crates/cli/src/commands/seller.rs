//! Seller profile and team invitation commands.

use clap::Subcommand;
use tz_materials_client::api::{InvitationInput, SellerInput, SellerUpdate};
use tz_materials_core::{InvitationId, MemberRole};

use crate::context::Context;
use crate::output;

#[derive(Subcommand)]
pub enum SellerAction {
    /// Show your seller profile and team
    Show,
    /// Register a seller profile for this account
    Create {
        #[arg(long)]
        business_name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: Option<String>,
        /// Tax identification number
        #[arg(long)]
        tin: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Change fields of your seller profile
    Update {
        #[arg(long)]
        business_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        tin: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum InvitationAction {
    /// List invitations sent by your seller team
    List,
    /// Invite someone to your seller team
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        /// `admin` or `staff`
        #[arg(long)]
        role: Option<MemberRole>,
    },
    /// Cancel a pending invitation
    Cancel { id: i64 },
    /// Look up an invitation by its token
    Lookup { token: String },
}

pub async fn seller(ctx: &Context, action: SellerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SellerAction::Show => output::seller(&ctx.own_seller().await?),
        SellerAction::Create {
            business_name,
            phone,
            email,
            tin,
            address,
        } => {
            let access = ctx.access_token()?;
            let input = SellerInput {
                business_name,
                phone,
                email,
                tin,
                address,
            };
            let seller = ctx.client.create_seller(&access, &input).await?;
            output::line("Seller profile created.");
            output::seller(&seller);
        }
        SellerAction::Update {
            business_name,
            phone,
            email,
            tin,
            address,
        } => {
            let access = ctx.access_token()?;
            let own = ctx.own_seller().await?;
            let update = SellerUpdate {
                business_name,
                phone,
                email,
                tin,
                address,
            };
            let seller = ctx.client.update_seller(&access, own.id, &update).await?;
            output::line("Seller profile updated.");
            output::seller(&seller);
        }
    }
    Ok(())
}

pub async fn invitations(
    ctx: &Context,
    action: InvitationAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        InvitationAction::List => {
            let access = ctx.access_token()?;
            output::invitations(&ctx.client.list_invitations(&access).await?);
        }
        InvitationAction::Create { email, phone, role } => {
            let access = ctx.access_token()?;
            let input = InvitationInput { email, phone, role };
            let invitation = ctx.client.create_invitation(&access, &input).await?;
            output::line("Invitation sent.");
            output::invitation(&invitation);
        }
        InvitationAction::Cancel { id } => {
            let access = ctx.access_token()?;
            ctx.client
                .cancel_invitation(&access, InvitationId::new(id))
                .await?;
            output::line("Invitation cancelled.");
        }
        InvitationAction::Lookup { token } => {
            let invitation = ctx.client.lookup_invitation(&token).await?;
            output::invitation(&invitation);
            if !invitation.is_open() {
                output::line("This invitation can no longer be accepted.");
            }
        }
    }
    Ok(())
}
