//! Local cart commands. Only `add` talks to the backend, to snapshot the
//! product.

use clap::Subcommand;
use tz_materials_core::ProductId;

use crate::context::{CliError, Context};
use crate::output;

#[derive(Subcommand)]
pub enum CartAction {
    /// Add units of a product
    Add {
        product: ProductId,
        #[arg(default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity; zero or less removes it
    Set {
        product: ProductId,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove { product: ProductId },
    /// Show the cart grouped by seller
    Show,
    /// Empty the cart
    Clear,
}

pub async fn run(ctx: &Context, action: CartAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut cart = ctx.cart();
    match action {
        CartAction::Add { product, quantity } => {
            let product = ctx.client.get_product(product).await?;
            let wanted = cart
                .get(product.id)
                .map_or(0, |line| line.quantity)
                .saturating_add(quantity);
            if !product.has_stock_for(wanted) {
                return Err(CliError::InsufficientStock {
                    product: product.name,
                    available: product.stock,
                }
                .into());
            }
            cart.add_item(product, quantity)?;
        }
        CartAction::Set { product, quantity } => {
            if cart.get(product).is_none() {
                return Err(CliError::NotInCart(product).into());
            }
            cart.update_item(product, quantity)?;
        }
        CartAction::Remove { product } => cart.remove_item(product)?,
        CartAction::Show => {}
        CartAction::Clear => cart.clear()?,
    }
    output::cart(&cart);
    Ok(())
}
