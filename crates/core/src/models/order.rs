//! Orders and their line items.
//!
//! Orders are server-owned aggregates: the client creates them empty and
//! appends items one at a time, and the backend recomputes every money field
//! after each append. Nothing here computes totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    DeliveryMethod, Money, OrderId, OrderItemId, OrderStatus, ProductId, SellerId, UserId,
};

/// A buyer-seller transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer: UserId,
    pub seller: SellerId,
    pub status: OrderStatus,
    pub subtotal: Option<Money>,
    pub tax: Option<Money>,
    pub shipping_fee: Option<Money>,
    /// `None` until at least one item has been attached.
    pub total: Option<Money>,
    pub delivery_method: DeliveryMethod,
    #[serde(default)]
    pub delivery_address: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// The amount a payment can be raised for: a present, non-zero total.
    #[must_use]
    pub fn payable_total(&self) -> Option<Money> {
        self.total.filter(|total| !total.is_zero())
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Short human-facing code, e.g. `ORD-2025-0301-CC4A`.
    #[must_use]
    pub fn display_code(&self) -> String {
        let short: String = self
            .id
            .as_uuid()
            .simple()
            .to_string()
            .chars()
            .take(4)
            .collect::<String>()
            .to_uppercase();
        format!("ORD-{}-{short}", self.created_at.format("%Y-%m%d"))
    }
}

/// A line on an order, priced by the backend at the time it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order: OrderId,
    /// `None` once the product has been deleted.
    pub product: Option<ProductId>,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use rust_decimal::Decimal;

    use super::*;

    pub(crate) const EMPTY_ORDER_JSON: &str = r#"{
        "id": "cc4a7778-a48b-4e0a-a7ba-33e398ad6bb9",
        "buyer": "6f1c2d4e-0c8b-4f43-8d7e-2a9b5e7c1d00",
        "seller": "3d5e3a1c-6a9b-4c2f-9b7e-1f0a2b3c4d5e",
        "status": "pending",
        "subtotal": null,
        "tax": null,
        "shipping_fee": null,
        "total": null,
        "delivery_method": "pickup",
        "delivery_address": {"instructions": "Auto generated via cart checkout"},
        "created_at": "2025-03-01T08:30:00Z",
        "updated_at": "2025-03-01T08:30:00Z",
        "items": []
    }"#;

    #[test]
    fn test_empty_order_has_no_payable_total() {
        let order: Order = serde_json::from_str(EMPTY_ORDER_JSON).unwrap();
        assert!(order.total.is_none());
        assert!(order.payable_total().is_none());
        assert_eq!(order.unit_count(), 0);
    }

    #[test]
    fn test_zero_total_is_not_payable() {
        let mut order: Order = serde_json::from_str(EMPTY_ORDER_JSON).unwrap();
        order.total = Some(Money::ZERO);
        assert!(order.payable_total().is_none());

        order.total = Some(Money::new(Decimal::new(37_000, 0)));
        assert_eq!(order.payable_total(), Some(Money::new(Decimal::new(37_000, 0))));
    }

    #[test]
    fn test_display_code() {
        let order: Order = serde_json::from_str(EMPTY_ORDER_JSON).unwrap();
        assert_eq!(order.display_code(), "ORD-2025-0301-CC4A");
    }
}
