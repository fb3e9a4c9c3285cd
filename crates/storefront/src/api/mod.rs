//! Shop server API.
//!
//! # Architecture
//!
//! - [`ShopApi`] is the seam every page service talks to; tests swap in a
//!   recording fake
//! - [`ShopClient`] is the real implementation over `reqwest`
//! - The server is the source of truth - NO local caching of server state,
//!   every read goes to the server
//!
//! # Response handling
//!
//! Several endpoints answer business rejections with a non-2xx status and
//! a JSON body the page still needs (`{"message": ...}` from checkout,
//! `{"error": ...}` from the active order). The client therefore tries the
//! body first and only reports the HTTP status when the body does not have
//! the expected shape. Cart and address mutations are the exception: any
//! non-success status is an error, whatever the body says.

mod client;
pub mod types;

pub use client::ShopClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use shop_core::{Address, AddressAction, AddressId, CouponCode, NewAddress, ProductId};

/// API paths, relative to the shop base URL.
pub mod paths {
    pub const CART: &str = "/api/cart/";
    pub const UPDATE_CART: &str = "/api/update-cart/";
    pub const REMOVE_FROM_CART: &str = "/api/remove-from-cart/";
    pub const ADD_TO_CART: &str = "/api/add-to-cart/";
    pub const CART_COUNT: &str = "/api/get-cart-count/";
    pub const CHECKOUT: &str = "/api/checkout/";
    pub const ACTIVE_ORDER: &str = "/api/active-order/";
    pub const CONFIRM_ORDER: &str = "/api/confirm-order/";
    pub const ADDRESSES: &str = "/api/addresses/";
    pub const CREATE_ADDRESS: &str = "/api/create-address/";
    pub const CHECK_COUPON: &str = "/api/check-coupon/";
    pub const ORDERS: &str = "/api/orders/";

    /// `/api/addresses/{id}/{action}_address/`
    #[must_use]
    pub fn address_action(id: shop_core::AddressId, action: shop_core::AddressAction) -> String {
        format!("/api/addresses/{id}/{}_address/", action.as_str())
    }
}

/// Errors that can occur when talking to the shop API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status and no usable body.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Joining a path onto the base URL failed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A mutating request was attempted without a `csrftoken` cookie.
    #[error("missing csrftoken cookie; sign in through the site first")]
    MissingCsrfToken,
}

impl ApiError {
    /// HTTP status code, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// The shop API as seen by the page client.
#[async_trait]
pub trait ShopApi: Send + Sync {
    /// `GET /api/cart/`
    async fn cart(&self) -> Result<CartContents, ApiError>;

    /// `GET /api/get-cart-count/`
    async fn cart_count(&self) -> Result<u32, ApiError>;

    /// `POST /api/add-to-cart/`
    async fn add_to_cart(&self, product_id: ProductId) -> Result<Ack, ApiError>;

    /// `POST /api/update-cart/`
    async fn update_cart(&self, product_id: ProductId, quantity: u32) -> Result<Ack, ApiError>;

    /// `POST /api/remove-from-cart/`
    async fn remove_from_cart(&self, product_id: ProductId) -> Result<Ack, ApiError>;

    /// `POST /api/checkout/`
    async fn checkout(&self) -> Result<CheckoutResponse, ApiError>;

    /// `GET /api/active-order/`
    async fn active_order(&self) -> Result<ActiveOrder, ApiError>;

    /// `POST /api/confirm-order/`
    async fn confirm_order(
        &self,
        coupon: Option<&CouponCode>,
    ) -> Result<ConfirmOrderResponse, ApiError>;

    /// `POST /api/check-coupon/`
    async fn check_coupon(&self, code: &CouponCode) -> Result<CouponCheck, ApiError>;

    /// `GET /api/addresses/`
    async fn addresses(&self) -> Result<Vec<Address>, ApiError>;

    /// `POST /api/create-address/`
    async fn create_address(&self, address: &NewAddress) -> Result<(), ApiError>;

    /// `POST /api/addresses/{id}/{action}_address/`
    async fn address_action(&self, id: AddressId, action: AddressAction) -> Result<(), ApiError>;

    /// `GET /api/orders/`
    async fn orders(&self) -> Result<Vec<OrderHistoryEntry>, ApiError>;
}
