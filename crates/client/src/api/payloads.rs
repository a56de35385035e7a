//! Request bodies sent to the marketplace API.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use tz_materials_core::{
    DeliveryMethod, MemberRole, Money, OrderId, PaymentMethod, PaymentProvider, PaymentStatus,
    ProductId, SellerId, TxRef, UserRole,
};

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// `POST /api/auth/login/`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub phone: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

/// `POST /api/auth/register/`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub phone: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

/// `POST /api/seller-invitations/accept/`
#[derive(Debug, Clone, Serialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
    pub full_name: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

/// `POST /api/auth/refresh/`
#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// `POST /api/orders/`
///
/// Orders are created empty; items are attached afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOrderRequest {
    pub seller: SellerId,
    pub delivery_method: DeliveryMethod,
    pub delivery_address: serde_json::Map<String, serde_json::Value>,
}

impl CreateOrderRequest {
    /// An order for `seller` whose address carries only delivery instructions.
    #[must_use]
    pub fn with_instructions(
        seller: SellerId,
        delivery_method: DeliveryMethod,
        instructions: &str,
    ) -> Self {
        let mut delivery_address = serde_json::Map::new();
        delivery_address.insert(
            "instructions".to_string(),
            serde_json::Value::String(instructions.to_string()),
        );
        Self {
            seller,
            delivery_method,
            delivery_address,
        }
    }
}

/// `POST /api/orders/:id/add_item/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddOrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// `POST /api/payments/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatePaymentRequest {
    pub order: OrderId,
    pub method: PaymentMethod,
    pub provider: PaymentProvider,
    pub tx_ref: TxRef,
    pub amount: Money,
}

/// `POST /api/webhooks/payments/`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookRequest {
    pub tx_ref: TxRef,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<PaymentProvider>,
    /// Additional provider fields, sent as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// `POST /api/products/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub unit: String,
    pub price: Money,
    pub stock: u32,
}

/// `PATCH /api/products/:id/`; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

/// `POST /api/sellers/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerInput {
    pub business_name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// `PATCH /api/sellers/:id/`; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SellerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// `POST /api/seller-invitations/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitationInput {
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
}

/// A list endpoint body: DRF pagination or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListResponse<T> {
    Bare(Vec<T>),
    Paginated {
        #[serde(default = "Vec::new")]
        results: Vec<T>,
    },
}

impl<T> ListResponse<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Paginated { results: items } => items,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_login_request_exposes_password_only_on_wire() {
        let request = LoginRequest {
            phone: "+255712345678".to_string(),
            password: SecretString::from("hunter22"),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({"phone": "+255712345678", "password": "hunter22"}));
        assert!(!format!("{request:?}").contains("hunter22"));
    }

    #[test]
    fn test_register_request_omits_missing_role() {
        let request = RegisterRequest {
            full_name: "Asha".to_string(),
            phone: "0712345678".to_string(),
            password: SecretString::from("pw"),
            role: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("role").is_none());
    }

    #[test]
    fn test_create_order_request_shape() {
        let seller: SellerId = "3d5e3a1c-6a9b-4c2f-9b7e-1f0a2b3c4d5e".parse().unwrap();
        let request =
            CreateOrderRequest::with_instructions(seller, DeliveryMethod::Pickup, "Gate B");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "seller": "3d5e3a1c-6a9b-4c2f-9b7e-1f0a2b3c4d5e",
                "delivery_method": "pickup",
                "delivery_address": {"instructions": "Gate B"}
            })
        );
    }

    #[test]
    fn test_webhook_request_flattens_extra_fields() {
        let mut extra = serde_json::Map::new();
        extra.insert("msisdn".to_string(), json!("255712345678"));
        let request = WebhookRequest {
            tx_ref: TxRef::new("TX-1"),
            status: PaymentStatus::Success,
            amount: Some(Money::new(Decimal::new(1500, 0))),
            provider: Some(PaymentProvider::Mpesa),
            extra,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "tx_ref": "TX-1",
                "status": "success",
                "amount": "1500",
                "provider": "mpesa",
                "msisdn": "255712345678"
            })
        );
    }

    #[test]
    fn test_list_response_accepts_both_shapes() {
        let bare: ListResponse<u32> = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(bare.into_vec(), vec![1, 2]);

        let paged: ListResponse<u32> =
            serde_json::from_str(r#"{"count": 2, "next": null, "results": [3, 4]}"#).unwrap();
        assert_eq!(paged.into_vec(), vec![3, 4]);

        let empty: ListResponse<u32> = serde_json::from_str("{}").unwrap();
        assert!(empty.into_vec().is_empty());
    }
}
