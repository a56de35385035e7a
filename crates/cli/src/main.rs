//! TZ Materials CLI - Marketplace client from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (phone/password from flags or TZM_PHONE / TZM_PASSWORD)
//! tzm auth login -p +255712345678
//!
//! # Fill the cart and check out, one order per seller
//! tzm cart add 0b8f6f7e-51a4-4d35-9a8f-3c3c3b0c9d11 4
//! tzm checkout --delivery delivery
//!
//! # Buy one product, pay and confirm in one go
//! tzm buy 0b8f6f7e-51a4-4d35-9a8f-3c3c3b0c9d11 -q 2 --pay --confirm
//! ```
//!
//! # Commands
//!
//! - `auth` - Login, registration, invitation acceptance, logout
//! - `products` - Catalogue browsing and seller product management
//! - `cart` - Local cart editing
//! - `checkout` / `buy` - Order and payment workflow
//! - `orders` / `payments` / `webhook` - History and payment confirmation
//! - `seller` / `invitations` - Seller profile and team

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tz_materials_core::DeliveryMethod;

mod commands;
mod context;
mod output;

use commands::auth::AuthAction;
use commands::cart::CartAction;
use commands::catalog::ProductAction;
use commands::checkout::BuyArgs;
use commands::orders::{OrderAction, PaymentAction, WebhookAction};
use commands::seller::{InvitationAction, SellerAction};
use context::Context;

#[derive(Parser)]
#[command(name = "tzm")]
#[command(author, version, about = "TZ Materials marketplace client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, register and manage the session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Browse and manage products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Edit the local cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Check out the cart, one order per seller
    Checkout {
        /// `pickup` or `delivery` (defaults to `TZM_DELIVERY_METHOD`)
        #[arg(long)]
        delivery: Option<DeliveryMethod>,
    },
    /// Order a single product, optionally paying and confirming
    Buy(BuyArgs),
    /// Order history
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Payment history
    Payments {
        #[command(subcommand)]
        action: PaymentAction,
    },
    /// Payment provider webhook simulation
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },
    /// Manage your seller profile
    Seller {
        #[command(subcommand)]
        action: SellerAction,
    },
    /// Manage seller team invitations
    Invitations {
        #[command(subcommand)]
        action: InvitationAction,
    },
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "tz_materials_cli=info,tz_materials_client=info".into()
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::init().await?;
    match cli.command {
        Commands::Auth { action } => commands::auth::run(&ctx, action).await?,
        Commands::Products { action } => commands::catalog::run(&ctx, action).await?,
        Commands::Cart { action } => commands::cart::run(&ctx, action).await?,
        Commands::Checkout { delivery } => commands::checkout::cart(&ctx, delivery).await?,
        Commands::Buy(args) => commands::checkout::buy(&ctx, args).await?,
        Commands::Orders { action } => commands::orders::orders(&ctx, action).await?,
        Commands::Payments { action } => commands::orders::payments(&ctx, action).await?,
        Commands::Webhook { action } => commands::orders::webhook(&ctx, action).await?,
        Commands::Seller { action } => commands::seller::seller(&ctx, action).await?,
        Commands::Invitations { action } => commands::seller::invitations(&ctx, action).await?,
    }
    Ok(())
}
