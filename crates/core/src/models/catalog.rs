//! Sellers, their teams and their product catalogue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auth::User;
use crate::types::{
    InvitationId, InvitationStatus, MemberRole, Money, ProductId, SellerId, UserId,
};

/// A product listed by a seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit of sale (`bag`, `tonne`, `piece`, ...).
    pub unit: String,
    /// Unit price.
    pub price: Money,
    pub stock: u32,
    #[serde(default)]
    pub images: Vec<String>,
    pub seller: SellerId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `quantity` units can be ordered from current stock.
    #[must_use]
    pub const fn has_stock_for(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }
}

/// A business selling on the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    pub business_name: String,
    /// Tax identification number.
    #[serde(default)]
    pub tin: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub verified: bool,
    #[serde(default)]
    pub pickup_location: Option<serde_json::Value>,
    #[serde(default)]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owning account.
    pub user: UserId,
    #[serde(default)]
    pub members: Vec<SellerMember>,
}

/// A user on a seller's team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerMember {
    pub id: i64,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
    pub user: User,
}

/// An invitation for someone to join a seller's team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerInvitation {
    pub id: InvitationId,
    pub email: String,
    pub phone: String,
    pub role: MemberRole,
    pub status: InvitationStatus,
    /// Acceptance token carried in the invitation link.
    pub token: String,
    pub seller: SellerId,
    pub seller_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
}

impl SellerInvitation {
    /// Whether the invitation can still be accepted or cancelled.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == InvitationStatus::Pending
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_product_decodes_backend_shape() {
        let json = r#"{
            "id": "0b8f6f7e-51a4-4d35-9a8f-3c3c3b0c9d11",
            "name": "Portland Cement 42.5N",
            "category": "cement",
            "brand": null,
            "description": "50kg bag",
            "unit": "bag",
            "price": "18500.00",
            "stock": 240,
            "images": [],
            "seller": "3d5e3a1c-6a9b-4c2f-9b7e-1f0a2b3c4d5e",
            "created_at": "2025-03-01T08:30:00.123456Z",
            "updated_at": "2025-03-01T08:30:00+03:00"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price.amount(), Decimal::new(18_500, 0));
        assert_eq!(product.unit, "bag");
        assert!(product.has_stock_for(240));
        assert!(!product.has_stock_for(241));
    }

    #[test]
    fn test_invitation_is_open() {
        let json = r#"{
            "id": 7,
            "email": "staff@example.com",
            "phone": "+255700000001",
            "role": "staff",
            "status": "pending",
            "token": "abc123",
            "seller": "3d5e3a1c-6a9b-4c2f-9b7e-1f0a2b3c4d5e",
            "seller_name": "Mbezi Hardware",
            "created_at": "2025-03-01T08:30:00Z",
            "accepted_at": null
        }"#;
        let mut invitation: SellerInvitation = serde_json::from_str(json).unwrap();
        assert!(invitation.is_open());
        invitation.status = InvitationStatus::Cancelled;
        assert!(!invitation.is_open());
    }
}
