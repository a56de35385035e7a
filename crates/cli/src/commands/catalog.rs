//! Product catalogue commands.

use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use tz_materials_client::api::{ProductInput, ProductUpdate};
use tz_materials_core::{Money, ProductId, SellerId};

use crate::context::Context;
use crate::output;

#[derive(Subcommand)]
pub enum ProductAction {
    /// List products, optionally for one seller
    List {
        #[arg(short, long)]
        seller: Option<SellerId>,
    },
    /// Show one product
    Show { id: ProductId },
    /// List a new product for your seller profile
    Create(CreateArgs),
    /// Change fields of a product
    Update {
        id: ProductId,
        #[command(flatten)]
        fields: UpdateArgs,
    },
    /// Remove a product
    Delete { id: ProductId },
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    category: String,
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Unit of sale
    #[arg(long, default_value = "bag")]
    unit: String,
    /// Unit price in TZS
    #[arg(long)]
    price: Decimal,
    #[arg(long, default_value_t = 0)]
    stock: u32,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    unit: Option<String>,
    #[arg(long)]
    price: Option<Decimal>,
    #[arg(long)]
    stock: Option<u32>,
}

pub async fn run(ctx: &Context, action: ProductAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ProductAction::List { seller } => {
            let access = ctx.auth.session().access_token();
            let products = ctx.client.list_products(access.as_deref(), seller).await?;
            output::products(&products);
        }
        ProductAction::Show { id } => {
            output::product(&ctx.client.get_product(id).await?);
        }
        ProductAction::Create(args) => {
            let access = ctx.access_token()?;
            let input = ProductInput {
                name: args.name,
                category: args.category,
                brand: args.brand,
                description: args.description,
                unit: args.unit,
                price: Money::new(args.price),
                stock: args.stock,
            };
            let product = ctx.client.create_product(&access, &input).await?;
            output::line("Product created.");
            output::product(&product);
        }
        ProductAction::Update { id, fields } => {
            let access = ctx.access_token()?;
            let update = ProductUpdate {
                name: fields.name,
                category: fields.category,
                brand: fields.brand,
                description: fields.description,
                unit: fields.unit,
                price: fields.price.map(Money::new),
                stock: fields.stock,
            };
            let product = ctx.client.update_product(&access, id, &update).await?;
            output::line("Product updated.");
            output::product(&product);
        }
        ProductAction::Delete { id } => {
            let access = ctx.access_token()?;
            ctx.client.delete_product(&access, id).await?;
            output::line("Product deleted.");
        }
    }
    Ok(())
}
