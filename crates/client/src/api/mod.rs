//! Marketplace REST API.
//!
//! The token manager and checkout controller depend on the narrow
//! [`AuthApi`] and [`CheckoutApi`] traits; [`MarketplaceClient`] implements
//! both over HTTP and adds the catalogue, seller and listing calls.

pub mod client;
pub mod payloads;

use async_trait::async_trait;
use tz_materials_core::{AuthResponse, Order, OrderId, Payment, RefreshResponse, WebhookResponse};

pub use client::MarketplaceClient;
pub use payloads::*;

use crate::error::ApiError;

/// Calls that mint or renew credentials. None of them take a bearer token.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Create an account and log it in.
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError>;

    /// Exchange phone and password for a token pair.
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError>;

    /// Accept a seller-team invitation, creating and logging in the account.
    async fn accept_invitation(
        &self,
        request: &AcceptInvitationRequest,
    ) -> Result<AuthResponse, ApiError>;
}

/// Calls made by the order/payment workflow.
#[async_trait]
pub trait CheckoutApi: Send + Sync {
    /// Create an empty order for one seller.
    async fn create_order(
        &self,
        access_token: &str,
        request: &CreateOrderRequest,
    ) -> Result<Order, ApiError>;

    /// Attach one line to an order. Returns the whole recomputed order.
    async fn add_order_item(
        &self,
        access_token: &str,
        order: OrderId,
        request: &AddOrderItemRequest,
    ) -> Result<Order, ApiError>;

    /// Raise a payment intent against an order.
    async fn create_payment(
        &self,
        access_token: &str,
        request: &CreatePaymentRequest,
    ) -> Result<Payment, ApiError>;

    /// Deliver a simulated provider webhook.
    ///
    /// A business rejection (`ok: false`) is returned as `Ok`.
    async fn trigger_payment_webhook(
        &self,
        request: &WebhookRequest,
    ) -> Result<WebhookResponse, ApiError>;
}
