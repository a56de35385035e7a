//! HTTP implementation of the marketplace API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use tz_materials_core::{
    AuthResponse, InvitationId, Order, OrderId, Payment, Product, ProductId, RefreshResponse,
    Seller, SellerId, SellerInvitation, WebhookResponse,
};
use url::Url;

use super::payloads::{
    AcceptInvitationRequest, AddOrderItemRequest, CreateOrderRequest, CreatePaymentRequest,
    InvitationInput, ListResponse, LoginRequest, ProductInput, ProductUpdate, RefreshRequest,
    RegisterRequest, SellerInput, SellerUpdate, WebhookRequest,
};
use super::{AuthApi, CheckoutApi};
use crate::config::ClientConfig;
use crate::error::ApiError;

/// Marketplace REST API client.
///
/// Cheap to clone; clones share one connection pool. Every request carries
/// `Content-Type: application/json` and the configured timeout.
#[derive(Clone)]
pub struct MarketplaceClient {
    inner: Arc<MarketplaceClientInner>,
}

struct MarketplaceClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl MarketplaceClient {
    /// Create a client for the configured API root.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(MarketplaceClientInner {
                client,
                base_url: config.api_base_url.clone(),
            }),
        })
    }

    /// The API root requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // =========================================================================
    // Catalogue
    // =========================================================================

    /// List products, optionally restricted to one seller.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, access_token))]
    pub async fn list_products(
        &self,
        access_token: Option<&str>,
        seller: Option<SellerId>,
    ) -> Result<Vec<Product>, ApiError> {
        let mut url = self.url("api/products/")?;
        if let Some(seller) = seller {
            url.query_pairs_mut()
                .append_pair("seller", &seller.to_string());
        }
        let list: ListResponse<Product> =
            execute(self.request_url(Method::GET, url, access_token)).await?;
        Ok(list.into_vec())
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        execute(self.request(Method::GET, &format!("api/products/{id}/"), None)?)
            .await
    }

    /// Create a product for the caller's seller.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, access_token, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        access_token: &str,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        execute(
            self.request(Method::POST, "api/products/", Some(access_token))?
                .json(input),
        )
        .await
    }

    /// Patch a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, access_token, update), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        access_token: &str,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, ApiError> {
        execute(
            self.request(Method::PATCH, &format!("api/products/{id}/"), Some(access_token))?
                .json(update),
        )
        .await
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, access_token), fields(product_id = %id))]
    pub async fn delete_product(&self, access_token: &str, id: ProductId) -> Result<(), ApiError> {
        execute_empty(self.request(
            Method::DELETE,
            &format!("api/products/{id}/"),
            Some(access_token),
        )?)
        .await
    }

    // =========================================================================
    // Orders & payments
    // =========================================================================

    /// List the caller's orders.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, access_token))]
    pub async fn list_orders(&self, access_token: &str) -> Result<Vec<Order>, ApiError> {
        let list: ListResponse<Order> =
            execute(self.request(Method::GET, "api/orders/", Some(access_token))?).await?;
        Ok(list.into_vec())
    }

    /// List the caller's payments.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, access_token))]
    pub async fn list_payments(&self, access_token: &str) -> Result<Vec<Payment>, ApiError> {
        let list: ListResponse<Payment> =
            execute(self.request(Method::GET, "api/payments/", Some(access_token))?).await?;
        Ok(list.into_vec())
    }

    // =========================================================================
    // Sellers & invitations
    // =========================================================================

    /// The seller profiles visible to the caller (normally zero or one).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, access_token))]
    pub async fn list_sellers(&self, access_token: &str) -> Result<Vec<Seller>, ApiError> {
        let list: ListResponse<Seller> =
            execute(self.request(Method::GET, "api/sellers/", Some(access_token))?).await?;
        Ok(list.into_vec())
    }

    /// Register the caller as a seller.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, access_token, input), fields(business_name = %input.business_name))]
    pub async fn create_seller(
        &self,
        access_token: &str,
        input: &SellerInput,
    ) -> Result<Seller, ApiError> {
        execute(
            self.request(Method::POST, "api/sellers/", Some(access_token))?
                .json(input),
        )
        .await
    }

    /// Patch a seller profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, access_token, update), fields(seller = %id))]
    pub async fn update_seller(
        &self,
        access_token: &str,
        id: SellerId,
        update: &SellerUpdate,
    ) -> Result<Seller, ApiError> {
        execute(
            self.request(Method::PATCH, &format!("api/sellers/{id}/"), Some(access_token))?
                .json(update),
        )
        .await
    }

    /// List invitations issued by the caller's seller.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, access_token))]
    pub async fn list_invitations(
        &self,
        access_token: &str,
    ) -> Result<Vec<SellerInvitation>, ApiError> {
        let list: ListResponse<SellerInvitation> =
            execute(self.request(Method::GET, "api/seller-invitations/", Some(access_token))?).await?;
        Ok(list.into_vec())
    }

    /// Invite someone onto the caller's seller team.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, access_token, input), fields(email = %input.email))]
    pub async fn create_invitation(
        &self,
        access_token: &str,
        input: &InvitationInput,
    ) -> Result<SellerInvitation, ApiError> {
        execute(
            self.request(Method::POST, "api/seller-invitations/", Some(access_token))?
                .json(input),
        )
        .await
    }

    /// Cancel a pending invitation.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, access_token), fields(invitation = %id))]
    pub async fn cancel_invitation(
        &self,
        access_token: &str,
        id: InvitationId,
    ) -> Result<(), ApiError> {
        execute_empty(self.request(
            Method::POST,
            &format!("api/seller-invitations/{id}/cancel/"),
            Some(access_token),
        )?)
        .await
    }

    /// Look up an invitation by its link token. No authentication.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the token is unknown.
    #[instrument(skip(self, token))]
    pub async fn lookup_invitation(&self, token: &str) -> Result<SellerInvitation, ApiError> {
        let mut url = self.url("api/seller-invitations/lookup/")?;
        url.query_pairs_mut().append_pair("token", token);
        execute(self.request_url(Method::GET, url, None)).await
    }

    // =========================================================================
    // Transport
    // =========================================================================

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        access_token: Option<&str>,
    ) -> Result<RequestBuilder, ApiError> {
        Ok(self.request_url(method, self.url(path)?, access_token))
    }

    fn request_url(&self, method: Method, url: Url, access_token: Option<&str>) -> RequestBuilder {
        tracing::debug!(%method, %url, "API request");
        let builder = self
            .inner
            .client
            .request(method, url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        execute(self.request(Method::POST, path, None)?.json(body))
            .await
    }
}

/// Send and decode a JSON body, mapping non-2xx to `ApiError::Status`.
async fn execute<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
    let body = send(builder).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Send and discard the body.
async fn execute_empty(builder: RequestBuilder) -> Result<(), ApiError> {
    send(builder).await.map(drop)
}

async fn send(builder: RequestBuilder) -> Result<String, ApiError> {
    let response = builder.send().await?;
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status.is_success() {
        Ok(body)
    } else {
        tracing::debug!(%status, "API request failed");
        Err(ApiError::from_status(status, &body))
    }
}

impl std::fmt::Debug for MarketplaceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthApi for MarketplaceClient {
    #[instrument(skip(self, request), fields(phone = %request.phone))]
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.post_json("api/auth/register/", request).await
    }

    #[instrument(skip(self, request), fields(phone = %request.phone))]
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.post_json("api/auth/login/", request).await
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        self.post_json(
            "api/auth/refresh/",
            &RefreshRequest {
                refresh: refresh_token,
            },
        )
        .await
    }

    #[instrument(skip(self, request))]
    async fn accept_invitation(
        &self,
        request: &AcceptInvitationRequest,
    ) -> Result<AuthResponse, ApiError> {
        self.post_json("api/seller-invitations/accept/", request)
            .await
    }
}

#[async_trait]
impl CheckoutApi for MarketplaceClient {
    #[instrument(skip(self, access_token, request), fields(seller = %request.seller))]
    async fn create_order(
        &self,
        access_token: &str,
        request: &CreateOrderRequest,
    ) -> Result<Order, ApiError> {
        execute(
            self.request(Method::POST, "api/orders/", Some(access_token))?
                .json(request),
        )
        .await
    }

    #[instrument(skip(self, access_token, request), fields(order_id = %order, product_id = %request.product_id))]
    async fn add_order_item(
        &self,
        access_token: &str,
        order: OrderId,
        request: &AddOrderItemRequest,
    ) -> Result<Order, ApiError> {
        execute(
            self.request(
                Method::POST,
                &format!("api/orders/{order}/add_item/"),
                Some(access_token),
            )?
            .json(request),
        )
        .await
    }

    #[instrument(skip(self, access_token, request), fields(order_id = %request.order, tx_ref = %request.tx_ref))]
    async fn create_payment(
        &self,
        access_token: &str,
        request: &CreatePaymentRequest,
    ) -> Result<Payment, ApiError> {
        execute(
            self.request(Method::POST, "api/payments/", Some(access_token))?
                .json(request),
        )
        .await
    }

    #[instrument(skip(self, request), fields(tx_ref = %request.tx_ref))]
    async fn trigger_payment_webhook(
        &self,
        request: &WebhookRequest,
    ) -> Result<WebhookResponse, ApiError> {
        execute(
            self.request(Method::POST, "api/webhooks/payments/", None)?
                .json(request),
        )
        .await
    }
}
