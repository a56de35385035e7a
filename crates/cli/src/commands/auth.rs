//! Session commands.
//!
//! Passwords are read from `--password` or `TZM_PASSWORD` and held as
//! `SecretString` until serialized into the request body.

use clap::Subcommand;
use secrecy::SecretString;
use tz_materials_client::api::{AcceptInvitationRequest, LoginRequest, RegisterRequest};
use tz_materials_core::UserRole;

use crate::context::{CliError, Context};
use crate::output;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Log in with phone and password
    Login {
        /// Phone number (falls back to `TZM_PHONE`)
        #[arg(short, long)]
        phone: Option<String>,

        /// Password (falls back to `TZM_PASSWORD`)
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and log in
    Register {
        #[arg(short = 'n', long)]
        full_name: String,

        #[arg(short, long)]
        phone: String,

        #[arg(long, env = "TZM_PASSWORD", hide_env_values = true)]
        password: String,

        /// Account role (`buyer`, `seller_admin`, ...)
        #[arg(short, long)]
        role: Option<UserRole>,
    },
    /// Join a seller team through an invitation token
    AcceptInvite {
        token: String,

        #[arg(short = 'n', long)]
        full_name: String,

        #[arg(long, env = "TZM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Drop the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
}

pub async fn run(ctx: &Context, action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Login { phone, password } => {
            let request = login_request(ctx, phone, password)?;
            let user = ctx.auth.login(&request).await?;
            output::line("Logged in.");
            output::user(&user);
        }
        AuthAction::Register {
            full_name,
            phone,
            password,
            role,
        } => {
            let request = RegisterRequest {
                full_name,
                phone,
                password: SecretString::from(password),
                role,
            };
            let user = ctx.auth.register(&request).await?;
            output::line("Account created.");
            output::user(&user);
        }
        AuthAction::AcceptInvite {
            token,
            full_name,
            password,
        } => {
            let request = AcceptInvitationRequest {
                token,
                full_name,
                password: SecretString::from(password),
            };
            let user = ctx.auth.accept_invitation(&request).await?;
            output::line("Invitation accepted.");
            output::user(&user);
        }
        AuthAction::Logout => {
            ctx.auth.logout();
            output::line("Logged out.");
        }
        AuthAction::Whoami => {
            let user = ctx.auth.session().user().ok_or(CliError::NotLoggedIn)?;
            output::user(&user);
        }
    }
    Ok(())
}

/// Command-line values win over the configured credentials.
fn login_request(
    ctx: &Context,
    phone: Option<String>,
    password: Option<String>,
) -> Result<LoginRequest, CliError> {
    let configured = ctx.config.credentials.clone();
    let phone = phone
        .or_else(|| configured.as_ref().map(|c| c.phone.clone()))
        .ok_or(CliError::MissingCredentials)?;
    let password = password
        .map(SecretString::from)
        .or_else(|| configured.map(|c| c.password))
        .ok_or(CliError::MissingCredentials)?;
    Ok(LoginRequest { phone, password })
}
