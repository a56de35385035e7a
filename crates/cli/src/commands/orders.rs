//! Order and payment listings, and the webhook simulator.

use clap::Subcommand;
use rust_decimal::Decimal;
use tz_materials_client::api::{CheckoutApi, WebhookRequest};
use tz_materials_core::{Money, PaymentProvider, PaymentStatus, TxRef};

use crate::context::Context;
use crate::output;

#[derive(Subcommand)]
pub enum OrderAction {
    /// List your orders
    List,
}

#[derive(Subcommand)]
pub enum PaymentAction {
    /// List your payments with a status summary
    List,
}

#[derive(Subcommand)]
pub enum WebhookAction {
    /// Post a provider webhook for a payment reference
    Simulate {
        tx_ref: String,

        #[arg(long, default_value = "success")]
        status: PaymentStatus,

        #[arg(long)]
        amount: Option<Decimal>,

        #[arg(long)]
        provider: Option<PaymentProvider>,
    },
}

pub async fn orders(ctx: &Context, action: OrderAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        OrderAction::List => {
            let access = ctx.access_token()?;
            output::orders(&ctx.client.list_orders(&access).await?);
        }
    }
    Ok(())
}

pub async fn payments(
    ctx: &Context,
    action: PaymentAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PaymentAction::List => {
            let access = ctx.access_token()?;
            output::payments(&ctx.client.list_payments(&access).await?);
        }
    }
    Ok(())
}

pub async fn webhook(ctx: &Context, action: WebhookAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        WebhookAction::Simulate {
            tx_ref,
            status,
            amount,
            provider,
        } => {
            let request = WebhookRequest {
                tx_ref: TxRef::new(tx_ref),
                status,
                amount: amount.map(Money::new),
                provider,
                extra: serde_json::Map::new(),
            };
            let response = ctx.client.trigger_payment_webhook(&request).await?;
            if response.ok {
                output::line("Webhook accepted.");
            } else {
                let reason = response.error.as_deref().unwrap_or("rejected");
                output::line(&format!("Webhook responded with error: {reason}"));
            }
        }
    }
    Ok(())
}
