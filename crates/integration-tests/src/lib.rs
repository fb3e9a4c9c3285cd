//! Integration tests for the Corner Shop storefront client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shop-integration-tests
//! ```
//!
//! Each test starts a [`FakeShopServer`] on a random local port and points
//! a real [`ShopClient`] at it, so requests go over HTTP with real headers,
//! cookies and status codes. The fake answers the way the shop does,
//! including its non-2xx business rejections, and enforces the CSRF check
//! on every POST.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use shop_core::Price;
use shop_storefront::api::ShopClient;
use shop_storefront::config::ShopApiConfig;

/// CSRF token the fake expects in both the cookie and the header.
pub const CSRF_TOKEN: &str = "test-csrf-token";

/// Cookie header of a signed-in browser session.
pub const SESSION_COOKIES: &str = "sessionid=test-session; csrftoken=test-csrf-token";

/// Largest request body the fake accepts.
const MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// Server state
// =============================================================================

/// One request as the fake saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub csrf_header: Option<String>,
    pub body: Option<Value>,
}

/// A stored address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAddress {
    pub id: i32,
    pub country: String,
    pub city: String,
    pub address: String,
    pub zipcode: String,
    pub is_active: bool,
}

/// Everything the fake shop knows.
#[derive(Debug, Default)]
pub struct ShopState {
    pub requests: Vec<RecordedRequest>,
    pub products: BTreeMap<i32, (String, Price)>,
    pub cart: BTreeMap<i32, u32>,
    pub active_order: Option<Value>,
    pub coupons: BTreeMap<String, Price>,
    pub addresses: Vec<StoredAddress>,
    pub orders: Vec<Value>,
    pub confirmed: Vec<Option<String>>,
}

impl ShopState {
    #[must_use]
    pub fn with_product(mut self, id: i32, name: &str, price: &str) -> Self {
        let price = price.parse().unwrap_or(Price::ZERO);
        self.products.insert(id, (name.to_string(), price));
        self
    }

    #[must_use]
    pub fn with_cart_line(mut self, id: i32, quantity: u32) -> Self {
        self.cart.insert(id, quantity);
        self
    }

    #[must_use]
    pub fn with_coupon(mut self, code: &str, discount: &str) -> Self {
        let discount = discount.parse().unwrap_or(Price::ZERO);
        self.coupons.insert(code.to_string(), discount);
        self
    }

    #[must_use]
    pub fn with_address(mut self, id: i32, city: &str, is_active: bool) -> Self {
        self.addresses.push(StoredAddress {
            id,
            country: "NL".to_string(),
            city: city.to_string(),
            address: format!("Main street {id}"),
            zipcode: "1000".to_string(),
            is_active,
        });
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: Value) -> Self {
        self.orders.push(order);
        self
    }

    fn cart_lines(&self) -> Vec<(i32, String, Price, u32)> {
        self.cart
            .iter()
            .filter_map(|(id, quantity)| {
                let (name, price) = self.products.get(id)?;
                Some((*id, name.clone(), *price, *quantity))
            })
            .collect()
    }
}

type Shared = Arc<Mutex<ShopState>>;

fn lock(state: &Shared) -> MutexGuard<'_, ShopState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// FakeShopServer
// =============================================================================

/// A fake shop API listening on `127.0.0.1`.
///
/// The server stops when this value is dropped.
pub struct FakeShopServer {
    base_url: Url,
    state: Shared,
    handle: JoinHandle<()>,
}

impl FakeShopServer {
    /// Start serving `state` on a random port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound; tests cannot run without one.
    #[allow(clippy::expect_used, clippy::print_stderr)]
    pub async fn start(state: ShopState) -> Self {
        let state: Shared = Arc::new(Mutex::new(state));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake shop listener");
        let addr = listener.local_addr().expect("fake shop local address");
        let base_url = Url::parse(&format!("http://{addr}/")).expect("fake shop base URL");

        let app = router(state.clone());
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("fake shop server stopped: {e}");
            }
        });

        Self {
            base_url,
            state,
            handle,
        }
    }

    /// Base URL of the running server.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Client settings for a signed-in session.
    #[must_use]
    pub fn config(&self) -> ShopApiConfig {
        ShopApiConfig::new(self.base_url.clone()).with_cookies(SESSION_COOKIES)
    }

    /// A client for a signed-in session.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn client(&self) -> ShopClient {
        ShopClient::new(&self.config()).expect("build shop client")
    }

    /// A client with an arbitrary cookie header.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn client_with_cookies(&self, cookies: &str) -> ShopClient {
        let config = ShopApiConfig::new(self.base_url.clone()).with_cookies(cookies);
        ShopClient::new(&config).expect("build shop client")
    }

    /// Direct access to the server state.
    pub fn state(&self) -> MutexGuard<'_, ShopState> {
        lock(&self.state)
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    /// `METHOD path` of every request received so far.
    #[must_use]
    pub fn request_lines(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    /// Forget the requests received so far.
    pub fn clear_requests(&self) {
        self.state().requests.clear();
    }
}

impl Drop for FakeShopServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/cart/", get(cart))
        .route("/api/get-cart-count/", get(cart_count))
        .route("/api/add-to-cart/", post(add_to_cart))
        .route("/api/update-cart/", post(update_cart))
        .route("/api/remove-from-cart/", post(remove_from_cart))
        .route("/api/checkout/", post(checkout))
        .route("/api/active-order/", get(active_order))
        .route("/api/confirm-order/", post(confirm_order))
        .route("/api/check-coupon/", post(check_coupon))
        .route("/api/addresses/", get(addresses))
        .route("/api/create-address/", post(create_address))
        .route("/api/addresses/{id}/{action}/", post(address_action))
        .route("/api/orders/", get(orders))
        .layer(middleware::from_fn_with_state(state.clone(), record_and_check_csrf))
        .with_state(state)
}

/// Record every request and reject POSTs whose CSRF header does not match
/// the `csrftoken` cookie.
async fn record_and_check_csrf(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .unwrap_or_default();

    let csrf_header = header_str(&parts.headers, "x-csrftoken");
    let csrf_cookie = header_str(&parts.headers, header::COOKIE.as_str()).and_then(|cookies| {
        cookies
            .split(';')
            .map(str::trim)
            .find_map(|c| c.strip_prefix("csrftoken=").map(str::to_owned))
    });

    lock(&state).requests.push(RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        csrf_header: csrf_header.clone(),
        body: serde_json::from_slice(&bytes).ok(),
    });

    if parts.method == Method::POST && (csrf_header.is_none() || csrf_header != csrf_cookie) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"detail": "CSRF Failed: CSRF token missing or incorrect."})),
        )
            .into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Deserialize)]
struct ProductBody {
    product_id: i32,
}

#[derive(Deserialize)]
struct UpdateBody {
    product_id: i32,
    quantity: i64,
}

#[derive(Deserialize)]
struct CouponBody {
    coupon: String,
}

#[derive(Deserialize)]
struct ConfirmBody {
    #[serde(default)]
    coupon_code: Option<String>,
}

#[derive(Deserialize)]
struct AddressBody {
    country: String,
    city: String,
    address: String,
    zipcode: String,
}

async fn cart(State(state): State<Shared>) -> Json<Value> {
    let state = lock(&state);
    let lines = state.cart_lines();
    let total: Price = lines.iter().map(|(_, _, price, qty)| price.times(*qty)).sum();
    let items: Vec<Value> = lines
        .into_iter()
        .map(|(id, name, price, quantity)| {
            json!({
                "id": id,
                "name": name,
                "description": format!("{name} description"),
                "price": price.amount().to_string(),
                "quantity": quantity,
            })
        })
        .collect();
    Json(json!({"cart_items": items, "total_price": total.amount().to_string()}))
}

async fn cart_count(State(state): State<Shared>) -> Json<Value> {
    let count: u32 = lock(&state).cart.values().sum();
    Json(json!({"cart_count": count}))
}

async fn add_to_cart(State(state): State<Shared>, Json(body): Json<ProductBody>) -> Response {
    let mut state = lock(&state);
    if !state.products.contains_key(&body.product_id) {
        return not_found();
    }
    *state.cart.entry(body.product_id).or_insert(0) += 1;
    Json(json!({"message": "Product added to cart"})).into_response()
}

async fn update_cart(State(state): State<Shared>, Json(body): Json<UpdateBody>) -> Response {
    let mut state = lock(&state);
    if !state.products.contains_key(&body.product_id) {
        return not_found();
    }
    match u32::try_from(body.quantity) {
        Ok(quantity) if quantity >= 1 => {
            state.cart.insert(body.product_id, quantity);
        }
        _ => {
            state.cart.remove(&body.product_id);
        }
    }
    Json(json!({"message": "Cart updated successfully"})).into_response()
}

async fn remove_from_cart(State(state): State<Shared>, Json(body): Json<ProductBody>) -> Response {
    let mut state = lock(&state);
    if !state.products.contains_key(&body.product_id) {
        return not_found();
    }
    state.cart.remove(&body.product_id);
    Json(json!({"message": "Item removed from cart successfully"})).into_response()
}

async fn checkout(State(state): State<Shared>) -> Response {
    let mut state = lock(&state);
    let lines = state.cart_lines();
    if lines.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Your cart is empty"})),
        )
            .into_response();
    }

    let total: Price = lines.iter().map(|(_, _, price, qty)| price.times(*qty)).sum();
    let checkout_items: Vec<Value> = lines
        .iter()
        .map(|(_, name, price, qty)| {
            json!({"name": name, "quantity": qty, "price": price.times(*qty).amount().to_string()})
        })
        .collect();
    let order_items: Vec<Value> = lines
        .iter()
        .map(|(id, name, price, qty)| {
            json!({
                "id": id,
                "product": {"id": id, "name": name},
                "quantity": qty,
                "price": price.times(*qty).amount().to_string(),
            })
        })
        .collect();

    state.cart.clear();
    state.active_order = Some(json!({
        "id": 1,
        "order_items": order_items,
        "total_price": total.amount().to_string(),
    }));

    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Order created successfully",
            "order_id": 1,
            "order_items": checkout_items,
            "total_price": total.amount().to_string(),
        })),
    )
        .into_response()
}

async fn active_order(State(state): State<Shared>) -> Response {
    match lock(&state).active_order.clone() {
        Some(order) => Json(order).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "No active order found"})),
        )
            .into_response(),
    }
}

async fn confirm_order(State(state): State<Shared>, Json(body): Json<ConfirmBody>) -> Response {
    let mut state = lock(&state);
    let rejection = if state.active_order.is_none() {
        Some("No active order found")
    } else if !state.addresses.iter().any(|a| a.is_active) {
        Some("You must have an active address to confirm the order.")
    } else {
        None
    };
    if let Some(message) = rejection {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": message}))).into_response();
    }

    state.active_order = None;
    state.confirmed.push(body.coupon_code);
    let cart_id = state.confirmed.len();
    Json(json!({"message": "Order confirmed successfully", "cart_id": cart_id})).into_response()
}

async fn check_coupon(State(state): State<Shared>, Json(body): Json<CouponBody>) -> Response {
    // Unknown codes raise a 404 before the `valid: false` branch is reached
    match lock(&state).coupons.get(&body.coupon) {
        Some(discount) => {
            Json(json!({"valid": true, "discount": discount.amount().to_string()})).into_response()
        }
        None => not_found(),
    }
}

async fn addresses(State(state): State<Shared>) -> Json<Value> {
    let state = lock(&state);
    let list: Vec<Value> = state
        .addresses
        .iter()
        .map(|a| {
            json!({
                "id": a.id,
                "country": a.country,
                "city": a.city,
                "address": a.address,
                "zipcode": a.zipcode,
                "is_active": a.is_active,
            })
        })
        .collect();
    Json(Value::Array(list))
}

async fn create_address(State(state): State<Shared>, Json(body): Json<AddressBody>) -> Response {
    if body.country.trim().is_empty() || body.city.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"country": ["This field may not be blank."]})),
        )
            .into_response();
    }

    let mut state = lock(&state);
    let id = state.addresses.iter().map(|a| a.id).max().unwrap_or(0) + 1;
    state.addresses.push(StoredAddress {
        id,
        country: body.country,
        city: body.city,
        address: body.address,
        zipcode: body.zipcode,
        is_active: false,
    });
    (StatusCode::CREATED, Json(json!({"id": id}))).into_response()
}

async fn address_action(
    State(state): State<Shared>,
    Path((id, action)): Path<(i32, String)>,
) -> Response {
    let mut state = lock(&state);
    if !state.addresses.iter().any(|a| a.id == id) {
        return not_found();
    }

    match action.as_str() {
        "activate_address" => {
            for address in &mut state.addresses {
                address.is_active = address.id == id;
            }
        }
        "deactivate_address" => {
            for address in state.addresses.iter_mut().filter(|a| a.id == id) {
                address.is_active = false;
            }
        }
        "delete_address" => state.addresses.retain(|a| a.id != id),
        _ => return not_found(),
    }
    Json(json!({"status": "ok"})).into_response()
}

async fn orders(State(state): State<Shared>) -> Json<Value> {
    Json(Value::Array(lock(&state).orders.clone()))
}
