//! Cart checkout and the single-product purchase flow.
//!
//! Both run under a cancellation token tied to Ctrl-C: an interrupt lets the
//! in-flight call finish and stops before the next step.

use clap::Args;
use tz_materials_client::MarketplaceClient;
use tz_materials_client::checkout::{
    CheckoutController, CheckoutError, OrderDraft, Transaction, WebhookOutcome,
};
use tz_materials_core::{DeliveryMethod, ProductId, TxRef};

use crate::context::{CliError, Context, cancel_on_ctrl_c};
use crate::output;

#[derive(Args)]
pub struct BuyArgs {
    product: ProductId,

    #[arg(short, long, default_value_t = 1)]
    quantity: u32,

    /// `pickup` or `delivery` (defaults to `TZM_DELIVERY_METHOD`)
    #[arg(long)]
    delivery: Option<DeliveryMethod>,

    /// Raise a payment once the order is ready
    #[arg(long)]
    pay: bool,

    /// Deliver the success webhook once the payment exists
    #[arg(long, requires = "pay")]
    confirm: bool,

    /// Payment reference; generated from the order id when omitted
    #[arg(long, requires = "pay")]
    tx_ref: Option<String>,
}

pub async fn cart(
    ctx: &Context,
    delivery: Option<DeliveryMethod>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cart = ctx.cart();
    let controller = ctx.checkout();
    let report = controller
        .checkout_cart(&mut cart, delivery, &cancel_on_ctrl_c())
        .await;

    output::report(&report);
    match report.error {
        Some(error) => Err(redirect_hint(error).into()),
        None => Ok(()),
    }
}

pub async fn buy(ctx: &Context, args: BuyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let product = ctx.client.get_product(args.product).await?;
    if !product.has_stock_for(args.quantity) {
        return Err(CliError::InsufficientStock {
            product: product.name,
            available: product.stock,
        }
        .into());
    }

    let controller = ctx.checkout();
    let mut tx = Transaction::with_cancellation(
        format!("/products/{}", product.id),
        cancel_on_ctrl_c(),
    );
    let draft = OrderDraft::for_product(&product, args.quantity).with_delivery(args.delivery);

    let result = purchase(&controller, &mut tx, &draft, &args).await;
    output::transaction(&tx);
    result.map_err(|e| redirect_hint(e).into())
}

async fn purchase(
    controller: &CheckoutController<MarketplaceClient>,
    tx: &mut Transaction,
    draft: &OrderDraft,
    args: &BuyArgs,
) -> Result<(), CheckoutError> {
    controller.place_order(tx, draft).await?;
    if !args.pay {
        return Ok(());
    }

    controller
        .create_payment(tx, args.tx_ref.clone().map(TxRef::new))
        .await?;
    if !args.confirm {
        return Ok(());
    }

    if let WebhookOutcome::Rejected { reason } = controller.confirm_payment(tx).await? {
        tracing::warn!(reason = %reason, "Payment not confirmed");
    }
    Ok(())
}

fn redirect_hint(error: CheckoutError) -> CheckoutError {
    if let CheckoutError::AuthenticationRequired { redirect } = &error {
        tracing::info!(redirect = %redirect, "Run `tzm auth login`, then retry");
    }
    error
}
