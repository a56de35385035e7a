//! Order and payment workflow.
//!
//! A checkout runs as a strict sequence against the backend: create an empty
//! order, attach its lines one call at a time, raise a payment, then deliver
//! the payment webhook. Each step is awaited before the next starts, checks
//! the transaction's cancellation token first, and stops the sequence on
//! failure without undoing earlier steps.
//!
//! Multi-seller carts become one order per seller, created one after another.

mod state;

pub use state::{CheckoutReport, Confirmation, Transaction, TransactionState, WebhookOutcome};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use tz_materials_core::{
    DeliveryMethod, Order, OrderStatus, Payment, PaymentStatus, Product, ProductId, SellerId,
    TxRef,
};

use crate::api::{
    AddOrderItemRequest, CheckoutApi, CreateOrderRequest, CreatePaymentRequest, WebhookRequest,
};
use crate::cart::{CartError, CartItem, CartStore, SellerBucket};
use crate::config::CheckoutDefaults;
use crate::error::ApiError;
use crate::session::SessionStore;

/// Delivery instructions attached to orders placed from a product page.
pub const PRODUCT_PAGE_INSTRUCTIONS: &str = "Auto generated via product page";
/// Delivery instructions attached to orders placed from the cart.
pub const CART_INSTRUCTIONS: &str = "Auto generated via cart checkout";
/// Return path of a cart checkout.
pub const CART_RETURN_PATH: &str = "/cart";

/// Checkout failures.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No session. Log in at `redirect` and restart the checkout.
    #[error("Please log in to continue.")]
    AuthenticationRequired { redirect: String },

    #[error(
        "Order total is missing. Ensure the order has at least one item to determine the payable amount."
    )]
    MissingTotal,

    #[error("No payment transaction reference available.")]
    MissingTxRef,

    #[error("Nothing to check out.")]
    EmptyCheckout,

    #[error("Checkout cancelled.")]
    Aborted,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cart(#[from] CartError),
}

/// One line to attach to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product: ProductId,
    pub quantity: u32,
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            product: item.product.id,
            quantity: item.quantity,
        }
    }
}

/// Everything needed to place one seller's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub seller: SellerId,
    /// `None` uses the configured default.
    pub delivery_method: Option<DeliveryMethod>,
    pub instructions: String,
    pub lines: Vec<OrderLine>,
}

impl OrderDraft {
    /// A single-product order, as placed from a product page.
    #[must_use]
    pub fn for_product(product: &Product, quantity: u32) -> Self {
        Self {
            seller: product.seller,
            delivery_method: None,
            instructions: PRODUCT_PAGE_INSTRUCTIONS.to_string(),
            lines: vec![OrderLine {
                product: product.id,
                quantity,
            }],
        }
    }

    /// One seller's share of the cart.
    #[must_use]
    pub fn from_bucket(bucket: &SellerBucket) -> Self {
        Self {
            seller: bucket.seller,
            delivery_method: None,
            instructions: CART_INSTRUCTIONS.to_string(),
            lines: bucket.items.iter().map(OrderLine::from).collect(),
        }
    }

    #[must_use]
    pub const fn with_delivery(mut self, delivery_method: Option<DeliveryMethod>) -> Self {
        self.delivery_method = delivery_method;
        self
    }
}

/// Drives checkout transactions against the backend.
pub struct CheckoutController<C> {
    api: C,
    session: SessionStore,
    defaults: CheckoutDefaults,
}

impl<C: CheckoutApi> CheckoutController<C> {
    #[must_use]
    pub const fn new(api: C, session: SessionStore, defaults: CheckoutDefaults) -> Self {
        Self {
            api,
            session,
            defaults,
        }
    }

    #[must_use]
    pub const fn defaults(&self) -> &CheckoutDefaults {
        &self.defaults
    }

    /// Create an order for `draft.seller` and attach every line.
    ///
    /// The transaction's order is replaced with the server's response after
    /// each call, so on failure it holds exactly the lines that were attached.
    ///
    /// # Errors
    ///
    /// - `AuthenticationRequired` without a session; nothing is sent.
    /// - `EmptyCheckout` if the draft has no lines; nothing is sent.
    /// - `Aborted` if the transaction was cancelled before a step.
    /// - `Api` if the order or an item call fails. Later lines are not sent.
    #[instrument(skip_all, fields(seller = %draft.seller, lines = draft.lines.len()))]
    pub async fn place_order(
        &self,
        tx: &mut Transaction,
        draft: &OrderDraft,
    ) -> Result<Order, CheckoutError> {
        checkpoint(tx)?;
        let access = self.access_token(tx)?;
        if draft.lines.is_empty() {
            return Err(precondition(tx, CheckoutError::EmptyCheckout));
        }

        tx.order = None;
        tx.payment = None;
        tx.confirmation = Confirmation::AsReported;
        tx.message = None;
        tx.state = TransactionState::CreatingOrder;

        let request = CreateOrderRequest::with_instructions(
            draft.seller,
            draft.delivery_method.unwrap_or(self.defaults.delivery_method),
            &draft.instructions,
        );
        let mut order = self
            .api
            .create_order(&access, &request)
            .await
            .map_err(|e| fail(tx, e))?;
        let order_id = order.id;
        tracing::info!(order_id = %order_id, "Order created");
        tx.order = Some(order.clone());

        let total = draft.lines.len();
        for (added, line) in draft.lines.iter().enumerate() {
            checkpoint(tx)?;
            tx.state = TransactionState::AddingItems { added, total };
            tracing::debug!(order_id = %order_id, product = %line.product, "Adding item {} of {total}", added + 1);

            let request = AddOrderItemRequest {
                product_id: line.product,
                quantity: line.quantity,
            };
            order = self
                .api
                .add_order_item(&access, order_id, &request)
                .await
                .map_err(|e| fail(tx, e))?;
            tx.order = Some(order.clone());
        }

        let message = if total == 1 {
            "Order created and item added.".to_string()
        } else {
            format!("Order created and {total} items added.")
        };
        tx.settle(TransactionState::OrderReady, message);
        tracing::info!(order_id = %order_id, items = total, "Order ready");

        Ok(order)
    }

    /// Raise a payment for the transaction's order, synthesizing a reference
    /// when `tx_ref` is `None`.
    ///
    /// # Errors
    ///
    /// - `AuthenticationRequired` without a session; nothing is sent.
    /// - `MissingTotal` if there is no order or its total is null or zero;
    ///   nothing is sent.
    /// - `Aborted` if the transaction was cancelled.
    /// - `Api` if the backend rejects the payment.
    #[instrument(skip_all)]
    pub async fn create_payment(
        &self,
        tx: &mut Transaction,
        tx_ref: Option<TxRef>,
    ) -> Result<Payment, CheckoutError> {
        checkpoint(tx)?;
        let access = self.access_token(tx)?;
        let Some((order_id, amount)) = tx
            .order
            .as_ref()
            .and_then(|order| order.payable_total().map(|total| (order.id, total)))
        else {
            return Err(precondition(tx, CheckoutError::MissingTotal));
        };

        tx.state = TransactionState::CreatingPayment;
        let request = CreatePaymentRequest {
            order: order_id,
            method: self.defaults.payment_method,
            provider: self.defaults.payment_provider.clone(),
            tx_ref: tx_ref.unwrap_or_else(|| TxRef::generate_now(order_id)),
            amount,
        };
        let payment = self
            .api
            .create_payment(&access, &request)
            .await
            .map_err(|e| fail(tx, e))?;

        tracing::info!(order_id = %order_id, tx_ref = %request.tx_ref, amount = %amount, "Payment created");
        tx.payment = Some(payment.clone());
        tx.settle(
            TransactionState::PaymentReady,
            "Payment record created. Trigger webhook to confirm.",
        );
        Ok(payment)
    }

    /// Deliver the success webhook for the transaction's payment.
    ///
    /// On acceptance the order is marked confirmed and the payment successful
    /// locally, flagged [`Confirmation::LocallyOptimistic`]. A rejection
    /// changes nothing and leaves the transaction in `PaymentReady`.
    ///
    /// # Errors
    ///
    /// - `MissingTxRef` if there is no payment or it has no reference;
    ///   nothing is sent.
    /// - `Aborted` if the transaction was cancelled.
    /// - `Api` on a transport or HTTP failure. Statuses are left unchanged.
    #[instrument(skip_all)]
    pub async fn confirm_payment(
        &self,
        tx: &mut Transaction,
    ) -> Result<WebhookOutcome, CheckoutError> {
        checkpoint(tx)?;
        let Some(payment) = tx.payment.as_ref() else {
            return Err(precondition(tx, CheckoutError::MissingTxRef));
        };
        let Some(tx_ref) = payment.tx_ref.clone() else {
            return Err(precondition(tx, CheckoutError::MissingTxRef));
        };

        let request = WebhookRequest {
            tx_ref,
            status: PaymentStatus::Success,
            amount: Some(payment.amount),
            provider: payment.provider.clone(),
            extra: serde_json::Map::new(),
        };
        tx.state = TransactionState::ConfirmingWebhook;
        let response = self
            .api
            .trigger_payment_webhook(&request)
            .await
            .map_err(|e| fail(tx, e))?;

        if response.ok {
            if let Some(order) = tx.order.as_mut() {
                order.status = OrderStatus::Confirmed;
            }
            if let Some(payment) = tx.payment.as_mut() {
                payment.status = PaymentStatus::Success;
            }
            tx.confirmation = Confirmation::LocallyOptimistic;
            tx.settle(
                TransactionState::Confirmed,
                "Webhook accepted. Order will reflect confirmed status.",
            );
            tracing::info!(tx_ref = %request.tx_ref, "Payment confirmed");
            return Ok(WebhookOutcome::Accepted);
        }

        let reason = response
            .error
            .unwrap_or_else(|| "Webhook rejected".to_string());
        tracing::info!(tx_ref = %request.tx_ref, reason = %reason, "Webhook rejected");
        tx.settle(
            TransactionState::PaymentReady,
            format!("Webhook responded with error: {reason}"),
        );
        Ok(WebhookOutcome::Rejected { reason })
    }

    /// Check out the whole cart, one order per seller in cart order.
    ///
    /// Stops at the first failure. Orders already created stay live and are
    /// listed in the report. The cart is cleared only when every seller's
    /// order was created and fully populated.
    #[instrument(skip_all, fields(lines = cart.items().len()))]
    pub async fn checkout_cart(
        &self,
        cart: &mut CartStore,
        delivery_method: Option<DeliveryMethod>,
        cancel: &CancellationToken,
    ) -> CheckoutReport {
        let mut report = CheckoutReport::default();
        let buckets = cart.group_by_seller();
        if buckets.is_empty() {
            report.error = Some(CheckoutError::EmptyCheckout);
            return report;
        }

        for bucket in &buckets {
            let mut tx = Transaction::with_cancellation(CART_RETURN_PATH, cancel.clone());
            let draft = OrderDraft::from_bucket(bucket).with_delivery(delivery_method);
            match self.place_order(&mut tx, &draft).await {
                Ok(order) => report.completed.push(order),
                Err(e) => {
                    tracing::warn!(
                        seller = %bucket.seller,
                        completed = report.completed.len(),
                        error = %e,
                        "Cart checkout stopped"
                    );
                    report.failed_seller = Some(bucket.seller);
                    report.partial = tx.order.take();
                    report.error = Some(e);
                    return report;
                }
            }
        }

        if let Err(e) = cart.clear() {
            report.error = Some(e.into());
        }
        tracing::info!(orders = report.completed.len(), "Cart checked out");
        report
    }

    fn access_token(&self, tx: &mut Transaction) -> Result<String, CheckoutError> {
        self.session.access_token().ok_or_else(|| {
            let redirect = tx.login_redirect();
            tracing::debug!(redirect = %redirect, "Checkout needs a session");
            precondition(tx, CheckoutError::AuthenticationRequired { redirect })
        })
    }
}

/// Abort the transaction if its token has fired.
fn checkpoint(tx: &mut Transaction) -> Result<(), CheckoutError> {
    if tx.is_cancelled() {
        tracing::info!(state = %tx.state(), "Checkout aborted");
        let error = CheckoutError::Aborted;
        tx.settle(TransactionState::Aborted, error.to_string());
        return Err(error);
    }
    Ok(())
}

/// Record a failed precondition. The state is left as it was.
fn precondition(tx: &mut Transaction, error: CheckoutError) -> CheckoutError {
    tx.message = Some(error.to_string());
    error
}

/// Record a failed call and move to `Errored`.
fn fail(tx: &mut Transaction, error: ApiError) -> CheckoutError {
    tracing::warn!(state = %tx.state(), error = %error, "Checkout step failed");
    tx.settle(TransactionState::Errored, error.to_string());
    CheckoutError::Api(error)
}
