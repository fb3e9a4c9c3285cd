//! `reqwest` implementation of [`ShopApi`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, REFERER};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use shop_core::{Address, AddressAction, AddressId, CouponCode, NewAddress, ProductId};

use super::types::{
    Ack, ActiveOrder, CartContents, CartCount, CheckoutResponse, ConfirmOrderRequest,
    ConfirmOrderResponse, CouponCheck, CouponRequest, OrderHistoryEntry, ProductRequest,
    UpdateCartRequest,
};
use super::{ApiError, ShopApi, paths};
use crate::config::ShopApiConfig;
use crate::cookies::CookieReader;

/// Header carrying the CSRF token on every POST.
const CSRF_HEADER: &str = "X-CSRFToken";

/// How much of an unexpected body to keep in errors and logs.
const BODY_EXCERPT_CHARS: usize = 200;

// =============================================================================
// ShopClient
// =============================================================================

/// HTTP client for the shop API.
///
/// Cheap to clone; clones share the connection pool. Forwards the
/// configured cookies on every request and adds the CSRF header on POSTs.
#[derive(Clone)]
pub struct ShopClient {
    inner: Arc<ShopClientInner>,
}

struct ShopClientInner {
    client: reqwest::Client,
    base_url: Url,
    cookies: CookieReader,
}

impl std::fmt::Debug for ShopClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("cookies", &self.inner.cookies)
            .finish_non_exhaustive()
    }
}

impl ShopClient {
    /// Create a new shop API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ShopApiConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        // Paths are joined relative to the base, which needs a trailing slash
        // to keep a prefix such as `/shop/`
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(ShopClientInner {
                client: builder.build()?,
                base_url,
                cookies: CookieReader::from_secret(config.cookies.clone()),
            }),
        })
    }

    /// The cookie reader used for the CSRF token.
    #[must_use]
    pub fn cookies(&self) -> &CookieReader {
        &self.inner.cookies
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    fn with_cookies(&self, request: RequestBuilder) -> RequestBuilder {
        match self.inner.cookies.header_value() {
            Some(cookies) => request.header(COOKIE, cookies),
            None => request,
        }
    }

    fn get(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        let request = self
            .inner
            .client
            .get(self.url(path)?)
            .header(ACCEPT, "application/json");
        Ok(self.with_cookies(request))
    }

    fn post(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        let token = self
            .inner
            .cookies
            .csrf_token()
            .ok_or(ApiError::MissingCsrfToken)?;

        // The server rejects secure POSTs whose Referer is not same-origin
        let request = self
            .inner
            .client
            .post(self.url(path)?)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(REFERER, self.inner.base_url.as_str())
            .header(CSRF_HEADER, token);
        Ok(self.with_cookies(request))
    }

    fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RequestBuilder, ApiError> {
        Ok(self.post(path)?.json(body))
    }

    /// Send a request and decode its body, whatever the status.
    ///
    /// A body of the expected shape wins over the status code; otherwise a
    /// non-success status is reported as [`ApiError::Status`].
    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        match serde_json::from_str::<T>(&text) {
            Ok(value) => {
                if !status.is_success() {
                    debug!(status = %status, "Shop API returned a body with a non-success status");
                }
                Ok(value)
            }
            Err(e) if status.is_success() => {
                tracing::error!(
                    error = %e,
                    body = %excerpt(&text),
                    "Failed to parse shop API response"
                );
                Err(ApiError::Parse(e))
            }
            Err(_) => Err(ApiError::Status {
                status: status.as_u16(),
                body: excerpt(&text),
            }),
        }
    }

    /// Send a request whose body only counts on a success status.
    async fn send_success<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: excerpt(&text),
            });
        }
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, body = %excerpt(&text), "Failed to parse shop API response");
            ApiError::Parse(e)
        })
    }

    /// Send a request that only needs a success status.
    async fn send_ack(request: RequestBuilder) -> Result<(), ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body: excerpt(&text),
        })
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(BODY_EXCERPT_CHARS).collect()
}

#[async_trait]
impl ShopApi for ShopClient {
    #[instrument(skip(self))]
    async fn cart(&self) -> Result<CartContents, ApiError> {
        Self::send(self.get(paths::CART)?).await
    }

    #[instrument(skip(self))]
    async fn cart_count(&self) -> Result<u32, ApiError> {
        let count: CartCount = Self::send(self.get(paths::CART_COUNT)?).await?;
        Ok(count.cart_count)
    }

    #[instrument(skip(self))]
    async fn add_to_cart(&self, product_id: ProductId) -> Result<Ack, ApiError> {
        Self::send_success(self.post_json(paths::ADD_TO_CART, &ProductRequest { product_id })?).await
    }

    #[instrument(skip(self))]
    async fn update_cart(&self, product_id: ProductId, quantity: u32) -> Result<Ack, ApiError> {
        let body = UpdateCartRequest {
            product_id,
            quantity,
        };
        Self::send_success(self.post_json(paths::UPDATE_CART, &body)?).await
    }

    #[instrument(skip(self))]
    async fn remove_from_cart(&self, product_id: ProductId) -> Result<Ack, ApiError> {
        Self::send_success(self.post_json(paths::REMOVE_FROM_CART, &ProductRequest { product_id })?).await
    }

    #[instrument(skip(self))]
    async fn checkout(&self) -> Result<CheckoutResponse, ApiError> {
        Self::send(self.post(paths::CHECKOUT)?).await
    }

    #[instrument(skip(self))]
    async fn active_order(&self) -> Result<ActiveOrder, ApiError> {
        Self::send(self.get(paths::ACTIVE_ORDER)?).await
    }

    #[instrument(skip(self))]
    async fn confirm_order(
        &self,
        coupon: Option<&CouponCode>,
    ) -> Result<ConfirmOrderResponse, ApiError> {
        let body = ConfirmOrderRequest {
            coupon_code: coupon.map(|code| code.as_str().to_owned()),
        };
        Self::send(self.post_json(paths::CONFIRM_ORDER, &body)?).await
    }

    #[instrument(skip(self))]
    async fn check_coupon(&self, code: &CouponCode) -> Result<CouponCheck, ApiError> {
        let body = CouponRequest {
            coupon: code.as_str().to_owned(),
        };
        match Self::send(self.post_json(paths::CHECK_COUPON, &body)?).await {
            // Unknown codes come back as a plain 404 rather than `valid: false`
            Err(ApiError::Status { status: 404, .. }) => Ok(CouponCheck::INVALID),
            other => other,
        }
    }

    #[instrument(skip(self))]
    async fn addresses(&self) -> Result<Vec<Address>, ApiError> {
        Self::send(self.get(paths::ADDRESSES)?).await
    }

    #[instrument(skip(self, address))]
    async fn create_address(&self, address: &NewAddress) -> Result<(), ApiError> {
        Self::send_ack(self.post_json(paths::CREATE_ADDRESS, address)?).await
    }

    #[instrument(skip(self))]
    async fn address_action(&self, id: AddressId, action: AddressAction) -> Result<(), ApiError> {
        Self::send_ack(self.post(&paths::address_action(id, action))?).await
    }

    #[instrument(skip(self))]
    async fn orders(&self) -> Result<Vec<OrderHistoryEntry>, ApiError> {
        Self::send(self.get(paths::ORDERS)?).await
    }
}
