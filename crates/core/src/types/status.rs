//! Status and classification enums for marketplace entities.
//!
//! Every enum here has a snake_case wire form shared by serde, `Display` and
//! `FromStr`, so values read from the API, typed on the command line and
//! written back in request bodies all agree.

use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display` and `FromStr` from a variant/wire-name table.
macro_rules! wire_names {
    ($ty:ident, $what:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $ty {
            /// The wire representation of this value.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", $what, ": {}"), s)),
                }
            }
        }
    };
}

/// Order lifecycle status, owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Dispatched,
    Delivered,
    Cancelled,
}

wire_names!(OrderStatus, "order status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Dispatched => "dispatched",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

/// Payment status. Moves from `pending` to `success` or `failed` when the
/// provider webhook arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

wire_names!(PaymentStatus, "payment status", {
    Pending => "pending",
    Success => "success",
    Failed => "failed",
});

/// How the buyer settles an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    MobileMoney,
    Cash,
    BankTransfer,
}

wire_names!(PaymentMethod, "payment method", {
    MobileMoney => "mobile_money",
    Cash => "cash",
    BankTransfer => "bank_transfer",
});

/// Mobile money provider behind a payment.
///
/// Providers the backend does not know yet are carried through unchanged as
/// [`PaymentProvider::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum PaymentProvider {
    #[default]
    Mpesa,
    Tigopesa,
    Airtelmoney,
    Other(String),
}

impl PaymentProvider {
    /// The wire representation of this value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mpesa => "mpesa",
            Self::Tigopesa => "tigopesa",
            Self::Airtelmoney => "airtelmoney",
            Self::Other(name) => name,
        }
    }

    /// Whether this is one of the built-in providers.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for PaymentProvider {
    fn from(name: String) -> Self {
        match name.as_str() {
            "mpesa" => Self::Mpesa,
            "tigopesa" => Self::Tigopesa,
            "airtelmoney" => Self::Airtelmoney,
            _ => Self::Other(name),
        }
    }
}

impl From<PaymentProvider> for String {
    fn from(provider: PaymentProvider) -> Self {
        match provider {
            PaymentProvider::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("invalid payment provider: empty".to_string());
        }
        Ok(Self::from(s.to_string()))
    }
}

/// How goods reach the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Buyer collects from the seller's yard.
    #[default]
    Pickup,
    /// Seller ships to the site.
    Delivery,
}

wire_names!(DeliveryMethod, "delivery method", {
    Pickup => "pickup",
    Delivery => "delivery",
});

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Buyer,
    SellerAdmin,
    SellerStaff,
    OpsAdmin,
}

wire_names!(UserRole, "user role", {
    Buyer => "buyer",
    SellerAdmin => "seller_admin",
    SellerStaff => "seller_staff",
    OpsAdmin => "ops_admin",
});

impl UserRole {
    /// Whether the account manages a seller's catalogue.
    #[must_use]
    pub const fn is_seller(&self) -> bool {
        matches!(self, Self::SellerAdmin | Self::SellerStaff)
    }
}

/// Role of a user within a seller's team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Admin,
    #[default]
    Staff,
}

wire_names!(MemberRole, "member role", {
    Admin => "admin",
    Staff => "staff",
});

/// Seller invitation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
    Cancelled,
}

wire_names!(InvitationStatus, "invitation status", {
    Pending => "pending",
    Accepted => "accepted",
    Cancelled => "cancelled",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_string(&PaymentMethod::MobileMoney).unwrap();
        assert_eq!(json, format!("\"{}\"", PaymentMethod::MobileMoney));

        let json = serde_json::to_string(&UserRole::SellerAdmin).unwrap();
        assert_eq!(json, "\"seller_admin\"");

        let json = serde_json::to_string(&PaymentProvider::Airtelmoney).unwrap();
        assert_eq!(json, "\"airtelmoney\"");
    }

    #[test]
    fn test_from_str_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Dispatched,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "teleport".parse::<DeliveryMethod>().unwrap_err();
        assert_eq!(err, "invalid delivery method: teleport");
    }

    #[test]
    fn test_unknown_provider_is_carried_through() {
        let provider: PaymentProvider = serde_json::from_str("\"halopesa\"").unwrap();
        assert_eq!(provider, PaymentProvider::Other("halopesa".to_string()));
        assert!(!provider.is_known());
        assert_eq!(serde_json::to_string(&provider).unwrap(), "\"halopesa\"");

        let known: PaymentProvider = "tigopesa".parse().unwrap();
        assert_eq!(known, PaymentProvider::Tigopesa);
        assert!("".parse::<PaymentProvider>().is_err());
    }

    #[test]
    fn test_seller_roles() {
        assert!(UserRole::SellerAdmin.is_seller());
        assert!(UserRole::SellerStaff.is_seller());
        assert!(!UserRole::Buyer.is_seller());
        assert!(!UserRole::OpsAdmin.is_seller());
    }
}
