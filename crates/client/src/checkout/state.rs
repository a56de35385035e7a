//! Per-transaction workflow state.

use std::fmt;

use tokio_util::sync::CancellationToken;
use tz_materials_core::{Order, Payment, SellerId};

use super::CheckoutError;

/// Where a checkout transaction stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    #[default]
    Idle,
    CreatingOrder,
    /// `added` of `total` lines attached so far.
    AddingItems {
        added: usize,
        total: usize,
    },
    OrderReady,
    CreatingPayment,
    PaymentReady,
    ConfirmingWebhook,
    Confirmed,
    Errored,
    Aborted,
}

impl TransactionState {
    /// Whether no further step can run.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Errored | Self::Aborted)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::CreatingOrder => f.write_str("creating order"),
            Self::AddingItems { added, total } => write!(f, "adding item {} of {total}", added + 1),
            Self::OrderReady => f.write_str("order ready"),
            Self::CreatingPayment => f.write_str("creating payment"),
            Self::PaymentReady => f.write_str("payment ready"),
            Self::ConfirmingWebhook => f.write_str("confirming webhook"),
            Self::Confirmed => f.write_str("confirmed"),
            Self::Errored => f.write_str("errored"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

/// How far the local order/payment statuses can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Confirmation {
    /// Statuses are as the backend last returned them.
    #[default]
    AsReported,
    /// Statuses were set locally after the webhook accepted the payment. The
    /// backend's next response is authoritative.
    LocallyOptimistic,
}

/// Result of delivering the payment webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// `ok: true`; the order is confirmed and the payment succeeded locally.
    Accepted,
    /// `ok: false`; nothing changed.
    Rejected { reason: String },
}

/// One checkout transaction: its state, the server snapshots it holds and the
/// message describing its last outcome.
#[derive(Debug)]
pub struct Transaction {
    pub(crate) state: TransactionState,
    pub(crate) order: Option<Order>,
    pub(crate) payment: Option<Payment>,
    pub(crate) confirmation: Confirmation,
    pub(crate) message: Option<String>,
    return_path: String,
    cancel: CancellationToken,
}

impl Transaction {
    /// A new transaction started from the screen at `return_path`.
    #[must_use]
    pub fn new(return_path: impl Into<String>) -> Self {
        Self::with_cancellation(return_path, CancellationToken::new())
    }

    /// A new transaction that aborts when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(return_path: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            state: TransactionState::Idle,
            order: None,
            payment: None,
            confirmation: Confirmation::AsReported,
            message: None,
            return_path: return_path.into(),
            cancel,
        }
    }

    #[must_use]
    pub const fn state(&self) -> TransactionState {
        self.state
    }

    /// The latest server snapshot of the order.
    #[must_use]
    pub const fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    #[must_use]
    pub const fn payment(&self) -> Option<&Payment> {
        self.payment.as_ref()
    }

    #[must_use]
    pub const fn confirmation(&self) -> Confirmation {
        self.confirmation
    }

    /// Message for the last outcome.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The screen to return to after re-authentication.
    #[must_use]
    pub fn return_path(&self) -> &str {
        &self.return_path
    }

    /// A handle that aborts this transaction before its next step.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn login_redirect(&self) -> String {
        format!("/login?next={}", self.return_path)
    }

    /// Record an outcome message and move to `state`.
    pub(crate) fn settle(&mut self, state: TransactionState, message: impl Into<String>) {
        self.state = state;
        self.message = Some(message.into());
    }
}

/// Outcome of a multi-seller cart checkout.
///
/// Orders are created one seller at a time and nothing is rolled back, so a
/// failure leaves `completed` orders live on the backend.
#[derive(Debug, Default)]
pub struct CheckoutReport {
    /// Orders created with every item attached.
    pub completed: Vec<Order>,
    /// Seller whose order was in progress when the checkout stopped.
    pub failed_seller: Option<SellerId>,
    /// Server snapshot of that order, if it had been created.
    pub partial: Option<Order>,
    /// Why the checkout stopped.
    pub error: Option<CheckoutError>,
}

impl CheckoutReport {
    /// Whether every seller's order was created and populated.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Summary line for display.
    #[must_use]
    pub fn message(&self) -> String {
        match (&self.error, self.completed.len()) {
            (Some(error), 0) => error.to_string(),
            (Some(error), done) => format!("{error} ({done} order(s) already created)"),
            (None, 1) => "Order created successfully.".to_string(),
            (None, count) => format!("{count} orders created, one per seller."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_display_is_one_based() {
        let state = TransactionState::AddingItems { added: 1, total: 3 };
        assert_eq!(state.to_string(), "adding item 2 of 3");
    }

    #[test]
    fn test_login_redirect_points_back() {
        let tx = Transaction::new("/products/0b8f6f7e-51a4-4d35-9a8f-3c3c3b0c9d11");
        assert_eq!(
            tx.login_redirect(),
            "/login?next=/products/0b8f6f7e-51a4-4d35-9a8f-3c3c3b0c9d11"
        );
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let tx = Transaction::new("/cart");
        assert!(!tx.is_cancelled());
        tx.cancellation_token().cancel();
        assert!(tx.is_cancelled());
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransactionState::Confirmed.is_terminal());
        assert!(TransactionState::Aborted.is_terminal());
        assert!(!TransactionState::PaymentReady.is_terminal());
    }

    #[test]
    fn test_report_messages() {
        let report = CheckoutReport::default();
        assert!(report.is_complete());
        assert_eq!(report.message(), "0 orders created, one per seller.");

        let failed = CheckoutReport {
            error: Some(CheckoutError::Aborted),
            ..CheckoutReport::default()
        };
        assert!(!failed.is_complete());
        assert_eq!(failed.message(), "Checkout cancelled.");
    }
}
