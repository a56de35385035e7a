//! Integration test support for the TZ Materials client.
//!
//! [`StubBackend`] serves the marketplace REST endpoints the client uses from
//! an in-process `axum` router bound to an ephemeral port. It keeps its
//! records in memory, recomputes order totals the way the real backend does,
//! issues real JWT access tokens with a configurable lifetime, and records
//! every request line so tests can assert on headers.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tz-materials-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `api_client` - Transport, error messages, list shapes
//! - `checkout_flow` - Cart and single-product checkout end to end
//! - `token_refresh` - Refresh scheduling against real tokens

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path as UrlPath, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tz_materials_client::ClientConfig;
use tz_materials_core::{Product, SellerId};
use url::Url;
use uuid::Uuid;

/// Phone accepted by the stub's login endpoint.
pub const BUYER_PHONE: &str = "+255712345678";
/// Password the stub's login endpoint rejects.
pub const WRONG_PASSWORD: &str = "wrong-password";
/// Refresh token issued with every login.
pub const REFRESH_TOKEN: &str = "stub-refresh-token";

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

/// Mutable backend state and knobs.
#[derive(Debug)]
pub struct StubData {
    /// Lifetime of issued access tokens, in seconds.
    pub access_ttl_secs: i64,
    /// Answer refresh calls with 401.
    pub refresh_fails: bool,
    /// Return lists as `{count, results}` instead of bare arrays.
    pub paginate: bool,
    /// 1-based `add_item` call that fails with a plain-text 500.
    pub fail_add_item_call: Option<usize>,
    /// Answer known payment webhooks with `200 {ok: false, error}`.
    pub decline_webhook: Option<String>,
    pub login_calls: usize,
    pub refresh_calls: usize,
    pub requests: Vec<RecordedRequest>,
    pub products: Vec<Value>,
    pub orders: Vec<Value>,
    pub payments: Vec<Value>,
    pub invitations: Vec<Value>,
    /// Webhook bodies in arrival order.
    pub webhooks: Vec<Value>,
    add_item_calls: usize,
    tokens_minted: u64,
}

impl Default for StubData {
    fn default() -> Self {
        Self {
            access_ttl_secs: 3600,
            refresh_fails: false,
            paginate: false,
            fail_add_item_call: None,
            decline_webhook: None,
            login_calls: 0,
            refresh_calls: 0,
            requests: Vec::new(),
            products: Vec::new(),
            orders: Vec::new(),
            payments: Vec::new(),
            invitations: Vec::new(),
            webhooks: Vec::new(),
            add_item_calls: 0,
            tokens_minted: 0,
        }
    }
}

impl StubData {
    /// Issue an access token expiring `ttl_secs` from now.
    pub fn mint_access(&mut self, ttl_secs: i64) -> String {
        self.tokens_minted += 1;
        let claims = json!({
            "exp": Utc::now().timestamp() + ttl_secs,
            "jti": self.tokens_minted,
            "user_id": BUYER_ID,
        });
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"stub-signing-key"),
        )
        .expect("Failed to sign stub token")
    }

    /// Requests made to `path`.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }
}

const BUYER_ID: &str = "6f1c2d4e-0c8b-4f43-8d7e-2a9b5e7c1d00";

type Shared = Arc<Mutex<StubData>>;

/// A running stub backend. The server stops when this is dropped.
pub struct StubBackend {
    pub url: Url,
    state: Shared,
    server: JoinHandle<()>,
}

impl StubBackend {
    /// Bind to an ephemeral local port and start serving.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(StubData::default()));
        let app = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub backend");
        let addr = listener.local_addr().expect("Stub backend has no address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let url = Url::parse(&format!("http://{addr}/")).expect("Invalid stub URL");
        Self { url, state, server }
    }

    /// Read or change the backend state.
    pub fn with<R>(&self, f: impl FnOnce(&mut StubData) -> R) -> R {
        f(&mut lock(&self.state))
    }

    /// Client configuration pointing at this backend, storing state in
    /// `state_dir`.
    #[must_use]
    pub fn config(&self, state_dir: &Path) -> ClientConfig {
        let mut config = ClientConfig::for_base_url(self.url.clone());
        config.state_dir = state_dir.to_path_buf();
        config
    }

    /// List a product and return it as the client would decode it.
    pub fn add_product(&self, name: &str, seller: SellerId, price: i64, stock: u32) -> Product {
        let now = Utc::now().to_rfc3339();
        let product = json!({
            "id": Uuid::new_v4(),
            "name": name,
            "category": "cement",
            "brand": null,
            "description": null,
            "unit": "bag",
            "price": format!("{price}.00"),
            "stock": stock,
            "images": [],
            "seller": seller,
            "created_at": now,
            "updated_at": now,
        });
        self.with(|data| data.products.push(product.clone()));
        serde_json::from_value(product).expect("Stub product does not decode")
    }

    /// Store a pending seller invitation and return its token.
    pub fn add_invitation(&self, email: &str, seller_name: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.with(|data| {
            let id = data.invitations.len() + 1;
            data.invitations.push(json!({
                "id": id,
                "email": email,
                "phone": "+255754000111",
                "role": "staff",
                "status": "pending",
                "token": token,
                "seller": Uuid::new_v4(),
                "seller_name": seller_name,
                "created_at": Utc::now().to_rfc3339(),
                "accepted_at": null,
            }));
        });
        token
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A fresh directory under the system temp dir for one test's client state.
#[must_use]
pub fn temp_state_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("tzm-it-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("Failed to create temp state dir");
    dir
}

fn lock(state: &Shared) -> MutexGuard<'_, StubData> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/auth/login/", post(login))
        .route("/api/auth/refresh/", post(refresh))
        .route("/api/products/", get(list_products))
        .route("/api/products/{id}/", get(get_product))
        .route("/api/orders/", get(list_orders).post(create_order))
        .route("/api/orders/{id}/add_item/", post(add_item))
        .route("/api/payments/", get(list_payments).post(create_payment))
        .route("/api/webhooks/payments/", post(webhook))
        .route("/api/seller-invitations/lookup/", get(lookup_invitation))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), record))
        .with_state(state)
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let recorded = {
        let header_value = |name: header::HeaderName| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        RecordedRequest {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
            authorization: header_value(header::AUTHORIZATION),
            content_type: header_value(header::CONTENT_TYPE),
        }
    };
    lock(&state).requests.push(recorded);
    next.run(request).await
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn require_bearer(headers: &HeaderMap) -> Result<(), Response> {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "));
    if authorized {
        Ok(())
    } else {
        Err(detail(
            StatusCode::UNAUTHORIZED,
            "Authentication credentials were not provided.",
        ))
    }
}

fn list(data: &StubData, items: Vec<Value>) -> Json<Value> {
    if data.paginate {
        Json(json!({ "count": items.len(), "next": null, "previous": null, "results": items }))
    } else {
        Json(Value::Array(items))
    }
}

fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    if body["password"] == WRONG_PASSWORD {
        return detail(StatusCode::UNAUTHORIZED, "Invalid phone or password.");
    }
    let mut data = lock(&state);
    data.login_calls += 1;
    let ttl = data.access_ttl_secs;
    let access = data.mint_access(ttl);
    Json(json!({
        "user": {
            "id": BUYER_ID,
            "full_name": "Rehema Kimaro",
            "phone": body["phone"],
            "email": null,
            "role": "buyer",
            "kyc_status": "pending",
        },
        "tokens": { "access": access, "refresh": REFRESH_TOKEN },
    }))
    .into_response()
}

async fn refresh(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut data = lock(&state);
    data.refresh_calls += 1;
    if data.refresh_fails || body["refresh"] != REFRESH_TOKEN {
        return detail(StatusCode::UNAUTHORIZED, "Token is invalid or expired");
    }
    let ttl = data.access_ttl_secs;
    Json(json!({ "access": data.mint_access(ttl) })).into_response()
}

async fn list_products(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let data = lock(&state);
    let items = data
        .products
        .iter()
        .filter(|p| {
            params
                .get("seller")
                .is_none_or(|seller| p["seller"] == seller.as_str())
        })
        .cloned()
        .collect();
    list(&data, items)
}

async fn get_product(State(state): State<Shared>, UrlPath(id): UrlPath<String>) -> Response {
    let data = lock(&state);
    data.products
        .iter()
        .find(|p| p["id"] == id.as_str())
        .map_or_else(
            || detail(StatusCode::NOT_FOUND, "Not found."),
            |p| Json(p.clone()).into_response(),
        )
}

async fn list_orders(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(denied) = require_bearer(&headers) {
        return denied;
    }
    let data = lock(&state);
    list(&data, data.orders.clone()).into_response()
}

async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = require_bearer(&headers) {
        return denied;
    }
    let now = Utc::now().to_rfc3339();
    let order = json!({
        "id": Uuid::new_v4(),
        "buyer": BUYER_ID,
        "seller": body["seller"],
        "status": "pending",
        "subtotal": null,
        "tax": null,
        "shipping_fee": null,
        "total": null,
        "delivery_method": body["delivery_method"],
        "delivery_address": body["delivery_address"],
        "created_at": now,
        "updated_at": now,
        "items": [],
    });
    lock(&state).orders.push(order.clone());
    (StatusCode::CREATED, Json(order)).into_response()
}

async fn add_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = require_bearer(&headers) {
        return denied;
    }
    let mut data = lock(&state);
    data.add_item_calls += 1;
    if data.fail_add_item_call == Some(data.add_item_calls) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    let Some(product) = data
        .products
        .iter()
        .find(|p| p["id"] == body["product_id"])
        .cloned()
    else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Unknown product" })))
            .into_response();
    };
    let Some(order) = data.orders.iter_mut().find(|o| o["id"] == id.as_str()) else {
        return detail(StatusCode::NOT_FOUND, "Not found.");
    };

    let quantity = body["quantity"].as_u64().unwrap_or(1);
    let unit_price = decimal(&product["price"]);
    let line_total = unit_price * Decimal::from(quantity);
    if let Some(items) = order["items"].as_array_mut() {
        items.push(json!({
            "id": Uuid::new_v4(),
            "order": id,
            "product": product["id"],
            "quantity": quantity,
            "unit_price": unit_price.to_string(),
            "line_total": line_total.to_string(),
        }));
    }
    let subtotal: Decimal = order["items"]
        .as_array()
        .map(|items| items.iter().map(|i| decimal(&i["line_total"])).sum())
        .unwrap_or_default();
    order["subtotal"] = json!(subtotal.to_string());
    order["tax"] = json!("0.00");
    order["shipping_fee"] = json!("0.00");
    order["total"] = json!(subtotal.to_string());
    order["updated_at"] = json!(Utc::now().to_rfc3339());
    Json(order.clone()).into_response()
}

async fn list_payments(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(denied) = require_bearer(&headers) {
        return denied;
    }
    let data = lock(&state);
    list(&data, data.payments.clone()).into_response()
}

async fn create_payment(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = require_bearer(&headers) {
        return denied;
    }
    let payment = json!({
        "id": Uuid::new_v4(),
        "order": body["order"],
        "method": body["method"],
        "provider": body["provider"],
        "tx_ref": body["tx_ref"],
        "amount": body["amount"],
        "status": "pending",
        "payload": {},
        "created_at": Utc::now().to_rfc3339(),
    });
    lock(&state).payments.push(payment.clone());
    (StatusCode::CREATED, Json(payment)).into_response()
}

async fn webhook(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut data = lock(&state);
    data.webhooks.push(body.clone());
    let declined = data.decline_webhook.clone();

    let Some(payment) = data
        .payments
        .iter_mut()
        .find(|p| p["tx_ref"] == body["tx_ref"])
    else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "ok": false, "error": "Payment not found" })),
        )
            .into_response();
    };
    if let Some(reason) = declined {
        return Json(json!({ "ok": false, "error": reason })).into_response();
    }
    payment["status"] = body["status"].clone();
    let order_id = payment["order"].clone();

    if body["status"] == "success"
        && let Some(order) = data.orders.iter_mut().find(|o| o["id"] == order_id)
    {
        order["status"] = json!("confirmed");
    }
    Json(json!({ "ok": true })).into_response()
}

async fn lookup_invitation(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let data = lock(&state);
    let token = params.get("token").map(String::as_str).unwrap_or_default();
    data.invitations
        .iter()
        .find(|i| i["token"] == token)
        .map_or_else(
            || detail(StatusCode::NOT_FOUND, "Invitation not found."),
            |i| Json(i.clone()).into_response(),
        )
}
