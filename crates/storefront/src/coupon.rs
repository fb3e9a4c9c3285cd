//! Coupon overlay on the order summary page.
//!
//! A coupon the server accepted once is remembered in client storage and
//! taken off every later rendering of the order total. The discount is not
//! re-validated and never expires; it stays until the order is confirmed
//! or the coupon is cleared.
//!
//! The final price is always [`compute_final_price`] of the subtotal the
//! server just reported, so redrawing the page any number of times takes
//! the discount off exactly once.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use shop_core::{Coupon, CouponCode, Price};

use crate::api::{ConfirmOrderResponse, ShopApi};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::storage::{LocalStorage, keys};
use crate::views::{Page, Region, routes};

/// Alert shown when the server does not know the code.
pub const INVALID_COUPON_MESSAGE: &str = "Invalid coupon code";

/// Order total after a flat discount, never below zero.
///
/// ```
/// use shop_core::Price;
/// use shop_storefront::coupon::compute_final_price;
///
/// let subtotal: Price = "$50.00".parse().unwrap();
/// let final_price = compute_final_price(subtotal, Price::from_cents(500));
/// assert_eq!(final_price.display(), "$45.00");
/// ```
#[must_use]
pub fn compute_final_price(subtotal: Price, discount: Price) -> Price {
    subtotal.saturating_sub(discount)
}

/// Result of applying a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponOutcome {
    pub valid: bool,
    pub discount: Option<Price>,
}

/// Applies, remembers and re-applies the single active coupon.
#[derive(Clone)]
pub struct CouponOverlay {
    api: Arc<dyn ShopApi>,
    storage: Arc<dyn LocalStorage>,
    page: Arc<dyn Page>,
}

impl CouponOverlay {
    #[must_use]
    pub fn new(api: Arc<dyn ShopApi>, storage: Arc<dyn LocalStorage>, page: Arc<dyn Page>) -> Self {
        Self { api, storage, page }
    }

    /// Check `code` with the server and, if it is valid, remember it and
    /// show the discounted total for `subtotal`.
    ///
    /// An unknown code is reported to the shopper and nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is malformed, the request fails or the
    /// coupon cannot be stored.
    #[instrument(skip(self))]
    pub async fn apply(&self, code: &str, subtotal: Price) -> Result<CouponOutcome> {
        let code = CouponCode::parse(code).map_err(|e| AppError::InvalidInput(e.to_string()))?;
        add_breadcrumb("coupon", "Apply coupon", Some(&[("code", code.as_str())]));

        let check = self.api.check_coupon(&code).await?;
        let discount = match (check.valid, check.discount) {
            (true, Some(discount)) => discount,
            _ => {
                info!(code = %code, "Coupon rejected");
                self.page.alert(INVALID_COUPON_MESSAGE);
                return Ok(CouponOutcome {
                    valid: false,
                    discount: None,
                });
            }
        };

        let coupon = Coupon { code, discount };
        self.storage
            .set_item(keys::COUPON, &serde_json::to_string(&coupon)?)?;
        info!(code = %coupon.code, discount = %discount, "Coupon applied");

        self.render(&coupon, subtotal);
        Ok(CouponOutcome {
            valid: true,
            discount: Some(discount),
        })
    }

    /// Render the final price for a freshly fetched `subtotal`.
    ///
    /// Call on every order summary render. With a stored coupon the input
    /// is locked and the discount taken off; without one the final price
    /// equals the subtotal. No request is made.
    pub fn reapply(&self, subtotal: Price) -> Price {
        match self.stored() {
            Some(coupon) => self.render(&coupon, subtotal),
            None => {
                self.page.set_text(Region::FinalPrice, subtotal.display());
                subtotal
            }
        }
    }

    /// The remembered coupon, if any.
    ///
    /// Unreadable or corrupt data counts as no coupon.
    #[must_use]
    pub fn stored(&self) -> Option<Coupon> {
        let raw = match self.storage.get_item(keys::COUPON) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read stored coupon");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| warn!(error = %e, "Stored coupon is corrupt, ignoring it"))
            .ok()
    }

    /// Forget the remembered coupon.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be removed.
    pub fn clear(&self) -> Result<()> {
        self.storage.remove_item(keys::COUPON)?;
        Ok(())
    }

    /// Confirm the active order with the remembered coupon, if any.
    ///
    /// On success the coupon is forgotten and the page goes home; any other
    /// answer is shown to the shopper as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the coupon cannot be
    /// cleared.
    #[instrument(skip(self))]
    pub async fn confirm_order(&self) -> Result<ConfirmOrderResponse> {
        let coupon = self.stored();
        add_breadcrumb("order", "Confirm order", None);

        let response = self
            .api
            .confirm_order(coupon.as_ref().map(|c| &c.code))
            .await?;

        if response.is_success() {
            self.clear()?;
            info!(cart_id = ?response.cart_id, "Order confirmed");
            self.page.navigate(routes::HOME);
        } else {
            warn!(reason = %response.message, "Order confirmation rejected");
            self.page.alert(&response.message);
        }
        Ok(response)
    }

    fn render(&self, coupon: &Coupon, subtotal: Price) -> Price {
        let final_price = compute_final_price(subtotal, coupon.discount);
        self.page.set_text(Region::FinalPrice, final_price.display());
        self.page
            .set_text(Region::CouponInput, coupon.code.to_string());
        self.page.set_enabled(Region::CouponInput, false);
        final_price
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::OrderSummary;
    use crate::storage::MemoryStorage;
    use crate::testing::{Call, FakeShop};
    use crate::views::MemoryPage;

    fn overlay(api: FakeShop) -> (CouponOverlay, Arc<FakeShop>, Arc<MemoryStorage>, Arc<MemoryPage>) {
        let api = Arc::new(api);
        let storage = Arc::new(MemoryStorage::new());
        let page = Arc::new(MemoryPage::new());
        let overlay = CouponOverlay::new(api.clone(), storage.clone(), page.clone());
        (overlay, api, storage, page)
    }

    fn open_order() -> OrderSummary {
        OrderSummary {
            order_items: vec![],
            total_price: Price::from_cents(5000),
        }
    }

    #[test]
    fn test_compute_final_price() {
        assert_eq!(
            compute_final_price(Price::from_cents(5000), Price::from_cents(500)),
            Price::from_cents(4500)
        );
        assert_eq!(
            compute_final_price(Price::from_cents(300), Price::from_cents(500)),
            Price::ZERO
        );
        assert_eq!(
            compute_final_price(Price::from_cents(300), Price::ZERO),
            Price::from_cents(300)
        );
    }

    #[tokio::test]
    async fn test_save10_against_fifty_dollars() {
        let (overlay, _, storage, page) = overlay(FakeShop::new().with_coupon("SAVE10", "5".parse().unwrap()));
        let subtotal: Price = "$50.00".parse().unwrap();

        let outcome = overlay.apply("SAVE10", subtotal).await.unwrap();

        assert_eq!(
            outcome,
            CouponOutcome {
                valid: true,
                discount: Some(Price::from_cents(500)),
            }
        );
        assert_eq!(page.text(Region::FinalPrice).as_deref(), Some("$45.00"));
        assert_eq!(page.is_enabled(Region::CouponInput), Some(false));

        let stored: serde_json::Value =
            serde_json::from_str(&storage.get_item(keys::COUPON).unwrap().unwrap()).unwrap();
        assert_eq!(stored["code"], "SAVE10");
    }

    #[tokio::test]
    async fn test_reapply_never_double_subtracts() {
        let (overlay, api, _, page) = overlay(FakeShop::new().with_coupon("SAVE10", Price::from_cents(500)));
        let subtotal = Price::from_cents(5000);
        overlay.apply("SAVE10", subtotal).await.unwrap();
        api.clear_calls();

        for _ in 0..5 {
            assert_eq!(overlay.reapply(subtotal), Price::from_cents(4500));
            assert_eq!(page.text(Region::FinalPrice).as_deref(), Some("$45.00"));
        }
        // Reapply trusts the stored discount
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reapply_follows_new_subtotal() {
        let (overlay, _, _, page) = overlay(FakeShop::new().with_coupon("SAVE10", Price::from_cents(500)));
        overlay.apply("SAVE10", Price::from_cents(5000)).await.unwrap();

        overlay.reapply(Price::from_cents(2000));
        assert_eq!(page.text(Region::FinalPrice).as_deref(), Some("$15.00"));

        overlay.reapply(Price::from_cents(300));
        assert_eq!(page.text(Region::FinalPrice).as_deref(), Some("$0.00"));
    }

    #[test]
    fn test_reapply_without_coupon_shows_subtotal() {
        let (overlay, _, _, page) = overlay(FakeShop::new());

        assert_eq!(overlay.reapply(Price::from_cents(1234)), Price::from_cents(1234));
        assert_eq!(page.text(Region::FinalPrice).as_deref(), Some("$12.34"));
        assert_eq!(page.is_enabled(Region::CouponInput), None);
    }

    #[tokio::test]
    async fn test_unknown_code_alerts_and_stores_nothing() {
        let (overlay, _, storage, page) = overlay(FakeShop::new());

        let outcome = overlay.apply("NOPE", Price::from_cents(5000)).await.unwrap();

        assert!(!outcome.valid);
        assert_eq!(page.alerts(), vec![INVALID_COUPON_MESSAGE.to_string()]);
        assert!(storage.get_item(keys::COUPON).unwrap().is_none());
        assert_eq!(page.text(Region::FinalPrice), None);
    }

    #[tokio::test]
    async fn test_blank_code_makes_no_request() {
        let (overlay, api, _, _) = overlay(FakeShop::new());

        assert!(matches!(
            overlay.apply("   ", Price::from_cents(5000)).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_corrupt_coupon_is_ignored() {
        let (overlay, _, storage, _) = overlay(FakeShop::new());
        storage.set_item(keys::COUPON, "not json").unwrap();

        assert!(overlay.stored().is_none());
        assert_eq!(overlay.reapply(Price::from_cents(100)), Price::from_cents(100));
    }

    #[tokio::test]
    async fn test_confirm_sends_stored_code_and_clears_it() {
        let (overlay, api, _, page) = overlay(
            FakeShop::new()
                .with_coupon("SAVE10", Price::from_cents(500))
                .with_active_order(open_order())
                .with_address(1, true),
        );
        overlay.apply("SAVE10", Price::from_cents(5000)).await.unwrap();

        let response = overlay.confirm_order().await.unwrap();

        assert!(response.is_success());
        assert_eq!(
            api.calls().last(),
            Some(&Call::ConfirmOrder(Some("SAVE10".to_string())))
        );
        assert!(overlay.stored().is_none());
        assert_eq!(page.last_navigation().as_deref(), Some(routes::HOME));
    }

    #[tokio::test]
    async fn test_confirm_rejection_alerts_and_keeps_coupon() {
        let (overlay, api, _, page) = overlay(
            FakeShop::new()
                .with_coupon("SAVE10", Price::from_cents(500))
                .with_active_order(open_order()),
        );
        overlay.apply("SAVE10", Price::from_cents(5000)).await.unwrap();

        let response = overlay.confirm_order().await.unwrap();

        assert!(!response.is_success());
        assert_eq!(
            page.alerts(),
            vec!["You must have an active address to confirm the order.".to_string()]
        );
        assert!(page.navigations().is_empty());
        assert!(overlay.stored().is_some());
        assert!(matches!(api.calls().last(), Some(Call::ConfirmOrder(Some(_)))));
    }

    #[tokio::test]
    async fn test_confirm_without_coupon() {
        let (overlay, api, _, _) = overlay(
            FakeShop::new()
                .with_active_order(open_order())
                .with_address(1, true),
        );

        overlay.confirm_order().await.unwrap();
        assert_eq!(api.calls(), vec![Call::ConfirmOrder(None)]);
    }
}
