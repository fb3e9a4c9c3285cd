//! Request and response bodies of the shop API.
//!
//! Only the fields the pages consume are modelled; everything else the
//! server sends is ignored.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use shop_core::{CartId, OrderId, Price, ProductId};

/// Success message returned by checkout.
pub const CHECKOUT_SUCCESS: &str = "Order created successfully";

/// Success message returned by order confirmation.
pub const CONFIRM_SUCCESS: &str = "Order confirmed successfully";

// =============================================================================
// Cart
// =============================================================================

/// A row of the authenticated server cart. The server assigns `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    pub quantity: u32,
}

/// `GET /api/cart/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartContents {
    pub cart_items: Vec<CartItem>,
    pub total_price: Price,
}

impl CartContents {
    /// Quantity currently held for `product_id`, zero if absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.cart_items
            .iter()
            .find(|item| item.id == product_id)
            .map_or(0, |item| item.quantity)
    }
}

/// `GET /api/get-cart-count/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCount {
    pub cart_count: u32,
}

/// Body of add-to-cart and remove-from-cart requests.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProductRequest {
    pub product_id: ProductId,
}

/// Body of the update-cart request.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UpdateCartRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Generic acknowledgement carrying an optional message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Orders
// =============================================================================

/// One line of an order, normalized across the three shapes the server
/// uses: `name` (checkout), `product.name` (active order) and
/// `product_name` (order history).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OrderLineWire")]
pub struct OrderLine {
    pub name: String,
    pub quantity: u32,
    pub price: Price,
}

#[derive(Deserialize)]
struct OrderLineWire {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    product: Option<ProductName>,
    #[serde(default)]
    product_name: Option<String>,
    quantity: u32,
    price: Price,
}

#[derive(Deserialize)]
struct ProductName {
    name: String,
}

impl From<OrderLineWire> for OrderLine {
    fn from(wire: OrderLineWire) -> Self {
        let name = wire
            .name
            .or_else(|| wire.product.map(|product| product.name))
            .or(wire.product_name)
            .unwrap_or_default();
        Self {
            name,
            quantity: wire.quantity,
            price: wire.price,
        }
    }
}

/// `POST /api/checkout/`
///
/// On failure the server sends only `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub order_items: Vec<OrderLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Price>,
}

impl CheckoutResponse {
    /// Whether the server created the order.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.message == CHECKOUT_SUCCESS
    }
}

/// Lines and total shown on the order summary page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_items: Vec<OrderLine>,
    pub total_price: Price,
}

/// `GET /api/active-order/`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ActiveOrder {
    /// The user's open order.
    Found(OrderSummary),
    /// No open order; `error` is shown to the user.
    Missing { error: String },
}

/// Body of the confirm-order request.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmOrderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

/// `POST /api/confirm-order/`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfirmOrderResponse {
    pub message: String,
    #[serde(default)]
    pub cart_id: Option<CartId>,
}

impl ConfirmOrderResponse {
    /// Whether the server confirmed the order.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.message == CONFIRM_SUCCESS
    }
}

/// One past order from `GET /api/orders/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderHistoryEntry {
    pub order_date: String,
    pub total_price: Price,
    pub status: String,
    #[serde(default)]
    pub order_items: Vec<OrderLine>,
}

impl OrderHistoryEntry {
    /// Calendar date of the order, falling back to the raw value when the
    /// server sends something that is neither RFC 3339 nor `YYYY-MM-DD`.
    #[must_use]
    pub fn display_date(&self) -> String {
        DateTime::parse_from_rfc3339(&self.order_date)
            .map(|dt| dt.date_naive())
            .or_else(|_| NaiveDate::parse_from_str(&self.order_date, "%Y-%m-%d"))
            .map_or_else(|_| self.order_date.clone(), |date| date.format("%Y-%m-%d").to_string())
    }
}

// =============================================================================
// Coupons
// =============================================================================

/// Body of the check-coupon request.
#[derive(Debug, Clone, Serialize)]
pub struct CouponRequest {
    pub coupon: String,
}

/// `POST /api/check-coupon/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponCheck {
    pub valid: bool,
    #[serde(default)]
    pub discount: Option<Price>,
}

impl CouponCheck {
    /// An unknown or inactive code.
    pub const INVALID: Self = Self {
        valid: false,
        discount: None,
    };
}
