//! API records exchanged with the marketplace backend.
//!
//! Field names follow the backend's JSON exactly; timestamps are RFC 3339 and
//! money fields are decimal strings.

pub mod auth;
pub mod catalog;
pub mod order;
pub mod payment;

pub use auth::{AuthResponse, RefreshResponse, Session, Tokens, User};
pub use catalog::{Product, Seller, SellerInvitation, SellerMember};
pub use order::{Order, OrderItem};
pub use payment::{Payment, PaymentSummary, WebhookResponse};
