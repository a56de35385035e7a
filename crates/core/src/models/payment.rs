//! Payments against orders and the provider webhook acknowledgement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Money, OrderId, PaymentId, PaymentMethod, PaymentProvider, PaymentStatus, TxRef};

/// A payment raised against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order: OrderId,
    pub method: PaymentMethod,
    #[serde(default)]
    pub provider: Option<PaymentProvider>,
    #[serde(default)]
    pub tx_ref: Option<TxRef>,
    pub amount: Money,
    pub status: PaymentStatus,
    /// Raw provider payload, opaque to the client.
    #[serde(default)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Body returned by the payment webhook endpoint.
///
/// `ok: false` comes back with a 404 when the reference matches no payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Counts by status plus total value over a set of payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentSummary {
    pub pending: usize,
    pub success: usize,
    pub failed: usize,
    pub total_value: Money,
}

impl PaymentSummary {
    /// Summarize `payments`.
    #[must_use]
    pub fn from_payments<'a>(payments: impl IntoIterator<Item = &'a Payment>) -> Self {
        payments.into_iter().fold(Self::default(), |mut summary, payment| {
            match payment.status {
                PaymentStatus::Pending => summary.pending += 1,
                PaymentStatus::Success => summary.success += 1,
                PaymentStatus::Failed => summary.failed += 1,
            }
            summary.total_value = summary.total_value + payment.amount;
            summary
        })
    }

    /// Number of payments summarized.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.pending + self.success + self.failed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn payment(status: &str, amount: &str) -> Payment {
        serde_json::from_value(serde_json::json!({
            "id": PaymentId::random().to_string(),
            "order": "cc4a7778-a48b-4e0a-a7ba-33e398ad6bb9",
            "method": "mobile_money",
            "provider": "mpesa",
            "tx_ref": "TX-cc4a7778-1700000000123",
            "amount": amount,
            "status": status,
            "created_at": "2025-03-01T08:30:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_payment_decodes_without_payload() {
        let p = payment("pending", "37000.00");
        assert_eq!(p.provider, Some(PaymentProvider::Mpesa));
        assert_eq!(p.tx_ref.as_ref().map(TxRef::as_str), Some("TX-cc4a7778-1700000000123"));
        assert!(p.payload.is_null());
    }

    #[test]
    fn test_webhook_rejection_decodes() {
        let body: WebhookResponse =
            serde_json::from_str(r#"{"ok": false, "error": "Payment not found"}"#).unwrap();
        assert!(!body.ok);
        assert_eq!(body.error.as_deref(), Some("Payment not found"));

        let body: WebhookResponse = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(body.ok);
        assert!(body.error.is_none());
    }

    #[test]
    fn test_summary_counts_and_totals() {
        let payments = vec![
            payment("pending", "1000"),
            payment("success", "2500.50"),
            payment("success", "500"),
            payment("failed", "42"),
        ];
        let summary = PaymentSummary::from_payments(&payments);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.count(), 4);
        assert_eq!(summary.total_value.amount(), Decimal::new(404_250, 2));
    }
}
