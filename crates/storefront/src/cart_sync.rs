//! Cart synchronization between the page and the shop server.
//!
//! Signed-out shoppers keep their cart in client storage through
//! [`GuestCartStore`]. Signed-in shoppers talk to the server, and every
//! server mutation is followed by a re-fetch through
//! [`mutate_then_reconcile`] before anything is rendered.
//!
//! # Sign-in reconciliation
//!
//! The guest cart travels with the sign-in form ([`CartSyncService::sign_in_handoff`])
//! and the server folds it into the account cart. When the page lands with
//! the success marker, [`CartSyncService::finish_sign_in`] drops the local copy.
//! [`CartSyncService::merge_guest_cart`] does the same merge through the API
//! for sessions that signed in some other way.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use shop_core::{Price, ProductId};

use crate::api::{CartContents, CheckoutResponse, ShopApi};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::guest_cart::GuestCartStore;
use crate::reconcile::{Session, mutate_then_reconcile};
use crate::storage::{LocalStorage, keys};
use crate::views::{Page, Region, render_cart_items, routes};

/// What an add-to-cart button carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
}

/// How a checkout attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Order created; the summary was stored and the page moved on.
    Created,
    /// The server refused; its message was shown to the shopper.
    Rejected(String),
}

/// Keeps the cart badge, cart list and checkout button in step with the
/// cart's source of truth.
#[derive(Clone)]
pub struct CartSyncService {
    session: Session,
    api: Arc<dyn ShopApi>,
    guest: GuestCartStore,
    storage: Arc<dyn LocalStorage>,
    page: Arc<dyn Page>,
}

impl CartSyncService {
    /// Create a service acting for `session`.
    #[must_use]
    pub fn new(
        session: Session,
        api: Arc<dyn ShopApi>,
        storage: Arc<dyn LocalStorage>,
        page: Arc<dyn Page>,
    ) -> Self {
        Self {
            session,
            api,
            guest: GuestCartStore::new(storage.clone()),
            storage,
            page,
        }
    }

    /// The guest cart store this service writes to.
    #[must_use]
    pub const fn guest_cart(&self) -> &GuestCartStore {
        &self.guest
    }

    /// Add one unit of `product` and refresh the badge.
    ///
    /// Returns the new badge count. On failure the badge is left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the guest cart cannot be written or an API call
    /// fails.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_item(&self, product: &ProductCard) -> Result<u32> {
        add_breadcrumb(
            "cart",
            "Add to cart",
            Some(&[("product_id", &product.id.to_string())]),
        );

        let count = if self.session.is_authenticated() {
            let ack = self.api.add_to_cart(product.id).await?;
            info!(ack = ?ack.message, "Added to server cart");
            self.api.cart_count().await?
        } else {
            self.guest
                .add(product.id, &product.name, product.price)?
                .count()
        };

        self.render_badge(count);
        Ok(count)
    }

    /// Set the quantity of a cart line, then re-render from the server.
    ///
    /// A quantity below one removes the line through
    /// [`remove_item`](Self::remove_item), with the same server calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity is out of range or an API call or
    /// render fails.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, product_id: ProductId, quantity: i64) -> Result<CartContents> {
        if quantity < 1 {
            return self.remove_item(product_id).await;
        }
        let quantity = u32::try_from(quantity)
            .map_err(|_| AppError::InvalidInput(format!("quantity {quantity} is too large")))?;

        add_breadcrumb(
            "cart",
            "Update quantity",
            Some(&[
                ("product_id", &product_id.to_string()),
                ("quantity", &quantity.to_string()),
            ]),
        );

        mutate_then_reconcile(
            self.api.update_cart(product_id, quantity),
            || self.api.cart(),
            |cart| self.render_cart(cart),
        )
        .await
    }

    /// Remove a cart line, then re-render from the server.
    ///
    /// # Errors
    ///
    /// Returns an error if an API call or render fails.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, product_id: ProductId) -> Result<CartContents> {
        add_breadcrumb(
            "cart",
            "Remove from cart",
            Some(&[("product_id", &product_id.to_string())]),
        );

        mutate_then_reconcile(
            self.api.remove_from_cart(product_id),
            || self.api.cart(),
            |cart| self.render_cart(cart),
        )
        .await
    }

    /// Turn the server cart into an order.
    ///
    /// On success the whole response is stored under `orderSummary` for the
    /// summary page and the page navigates there. Any other message is
    /// shown as-is and the page stays put.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the summary cannot be
    /// stored.
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> Result<CheckoutOutcome> {
        add_breadcrumb("cart", "Checkout", None);

        let response: CheckoutResponse = self.api.checkout().await?;
        if !response.is_success() {
            warn!(reason = %response.message, "Checkout rejected");
            self.page.alert(&response.message);
            return Ok(CheckoutOutcome::Rejected(response.message));
        }

        let json = serde_json::to_string(&response)?;
        self.storage.set_item(keys::ORDER_SUMMARY, &json)?;
        info!(order_id = ?response.order_id, "Order created");
        self.page.navigate(routes::ORDER_SUMMARY);
        Ok(CheckoutOutcome::Created)
    }

    /// Fetch the server cart and render it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or render fails.
    #[instrument(skip(self))]
    pub async fn load_cart(&self) -> Result<CartContents> {
        let cart = self.api.cart().await?;
        self.render_cart(&cart)?;
        Ok(cart)
    }

    /// Re-sync the badge with the cart's source of truth.
    ///
    /// # Errors
    ///
    /// Returns an error if the server count cannot be fetched.
    #[instrument(skip(self))]
    pub async fn refresh_badge(&self) -> Result<u32> {
        let count = if self.session.is_authenticated() {
            self.api.cart_count().await?
        } else {
            self.guest.count()
        };
        self.render_badge(count);
        Ok(count)
    }

    /// The guest cart as submitted in the sign-in form's `local_cart` field.
    #[must_use]
    pub fn sign_in_handoff(&self) -> String {
        self.guest.handoff_payload()
    }

    /// Finish a sign-in round trip.
    ///
    /// `success` is whether the page came back with the success marker;
    /// the server has merged the guest cart by then, so the local copy goes.
    ///
    /// # Errors
    ///
    /// Returns an error if the guest cart cannot be cleared.
    pub fn finish_sign_in(&self, success: bool) -> Result<()> {
        if success {
            self.guest.clear()?;
            info!("Guest cart handed off at sign-in");
        }
        Ok(())
    }

    /// Fold the guest cart into the signed-in server cart.
    ///
    /// Each guest line ends up at server quantity plus guest quantity. The
    /// guest cart is cleared afterwards and the badge re-fetched, so from
    /// here on the server cart is the only cart. Returns the new badge
    /// count.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not signed in or an API call
    /// fails. Lines already pushed are dropped from the guest cart, the
    /// rest stay for a retry.
    #[instrument(skip(self))]
    pub async fn merge_guest_cart(&self) -> Result<u32> {
        if !self.session.is_authenticated() {
            return Err(AppError::InvalidInput(
                "sign in before merging the guest cart".to_string(),
            ));
        }

        let guest = self.guest.get();
        if !guest.is_empty() {
            add_breadcrumb(
                "cart",
                "Merge guest cart",
                Some(&[("lines", &guest.len().to_string())]),
            );

            let server = self.api.cart().await?;
            let mut kept = 0_usize;
            for (key, entry) in guest.iter() {
                let Some(product_id) = key.product_id() else {
                    warn!(key = %key, "Guest cart line has no product ID, keeping it");
                    kept += 1;
                    continue;
                };
                let merged = server.quantity_of(product_id).saturating_add(entry.quantity);
                self.api.update_cart(product_id, merged).await?;
                self.guest.remove(key.clone())?;
            }
            if kept == 0 {
                self.guest.clear()?;
            }
            info!(lines = guest.len() - kept, kept, "Guest cart merged into server cart");
        }

        self.refresh_badge().await
    }

    fn render_cart(&self, cart: &CartContents) -> Result<()> {
        self.page
            .render(Region::CartItems, render_cart_items(&cart.cart_items)?);
        self.page
            .set_text(Region::TotalPrice, cart.total_price.display());
        self.page
            .set_visible(Region::CheckoutButton, !cart.cart_items.is_empty());
        Ok(())
    }

    fn render_badge(&self, count: u32) {
        self.page.set_text(Region::CartCount, count.to_string());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::{ApiError, OrderSummary};
    use crate::storage::MemoryStorage;
    use crate::testing::{Call, FakeShop};
    use crate::views::{MemoryPage, RenderTarget};

    struct Harness {
        api: Arc<FakeShop>,
        storage: Arc<MemoryStorage>,
        page: Arc<MemoryPage>,
        service: CartSyncService,
    }

    fn harness(session: Session, api: FakeShop) -> Harness {
        let api = Arc::new(api);
        let storage = Arc::new(MemoryStorage::new());
        let page = Arc::new(MemoryPage::new());
        let service = CartSyncService::new(session, api.clone(), storage.clone(), page.clone());
        Harness {
            api,
            storage,
            page,
            service,
        }
    }

    fn shop() -> FakeShop {
        FakeShop::new()
            .with_product(42, "Widget", Price::from_cents(999))
            .with_product(7, "Mug", Price::from_cents(1000))
    }

    fn widget() -> ProductCard {
        ProductCard {
            id: ProductId::new(42),
            name: "Widget".to_string(),
            price: "9.99".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_guest_add_updates_local_badge_without_server() {
        let h = harness(Session::guest(), shop());

        h.service.add_item(&widget()).await.unwrap();
        let count = h.service.add_item(&widget()).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(h.page.text(Region::CartCount).as_deref(), Some("2"));
        assert!(h.api.calls().is_empty());
        assert_eq!(h.service.guest_cart().get().get(ProductId::new(42)).unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_signed_in_add_posts_then_reads_count() {
        let h = harness(Session::signed_in(), shop().with_cart_line(7, 2));

        let count = h.service.add_item(&widget()).await.unwrap();

        assert_eq!(count, 3);
        assert_eq!(
            h.api.calls(),
            vec![Call::AddToCart(ProductId::new(42)), Call::CartCount]
        );
        assert_eq!(h.page.text(Region::CartCount).as_deref(), Some("3"));
        assert!(h.service.guest_cart().get().is_empty());
    }

    #[tokio::test]
    async fn test_failed_add_leaves_badge_untouched() {
        let h = harness(Session::signed_in(), shop());
        h.page.set_text(Region::CartCount, "5".to_string());
        h.api.failing("add_to_cart");

        let result = h.service.add_item(&widget()).await;

        assert!(matches!(
            result,
            Err(AppError::Api(ApiError::Status { status: 503, .. }))
        ));
        assert_eq!(h.page.text(Region::CartCount).as_deref(), Some("5"));
        assert_eq!(h.api.calls(), vec![Call::AddToCart(ProductId::new(42))]);
    }

    #[tokio::test]
    async fn test_update_quantity_renders_refetched_cart() {
        let h = harness(Session::signed_in(), shop().with_cart_line(42, 1));

        let cart = h.service.update_quantity(ProductId::new(42), 3).await.unwrap();

        assert_eq!(cart.quantity_of(ProductId::new(42)), 3);
        assert_eq!(
            h.api.calls(),
            vec![Call::UpdateCart(ProductId::new(42), 3), Call::Cart]
        );
        assert_eq!(h.page.text(Region::TotalPrice).as_deref(), Some("$29.97"));
        assert!(h.page.html(Region::CartItems).unwrap().contains(r#"value="3""#));
        assert_eq!(h.page.is_visible(Region::CheckoutButton), Some(true));
    }

    #[tokio::test]
    async fn test_quantity_below_one_is_exactly_a_removal() {
        let removed = harness(Session::signed_in(), shop().with_cart_line(42, 2));
        removed.service.remove_item(ProductId::new(42)).await.unwrap();

        for quantity in [0, -1, -40] {
            let updated = harness(Session::signed_in(), shop().with_cart_line(42, 2));
            updated
                .service
                .update_quantity(ProductId::new(42), quantity)
                .await
                .unwrap();

            assert_eq!(updated.api.calls(), removed.api.calls());
            assert_eq!(
                updated.page.regions(),
                removed.page.regions(),
                "quantity {quantity}"
            );
        }
        assert_eq!(
            removed.api.calls(),
            vec![Call::RemoveFromCart(ProductId::new(42)), Call::Cart]
        );
    }

    #[tokio::test]
    async fn test_removing_last_line_hides_checkout_button() {
        let h = harness(Session::signed_in(), shop().with_cart_line(42, 1));

        h.service.remove_item(ProductId::new(42)).await.unwrap();

        assert_eq!(h.page.is_visible(Region::CheckoutButton), Some(false));
        assert_eq!(h.page.text(Region::TotalPrice).as_deref(), Some("$0.00"));
    }

    #[tokio::test]
    async fn test_rejected_update_still_renders_server_cart() {
        let h = harness(Session::signed_in(), shop().with_cart_line(42, 1));
        h.api.failing("update_cart");

        let cart = h.service.update_quantity(ProductId::new(42), 2).await.unwrap();

        assert_eq!(cart.quantity_of(ProductId::new(42)), 1);
        assert_eq!(
            h.api.calls(),
            vec![Call::UpdateCart(ProductId::new(42), 2), Call::Cart]
        );
        assert_eq!(h.page.text(Region::TotalPrice).as_deref(), Some("$9.99"));
    }

    #[tokio::test]
    async fn test_rejected_remove_still_renders_server_cart() {
        let h = harness(Session::signed_in(), shop().with_cart_line(42, 1));
        h.api.failing("remove_from_cart");

        h.service.remove_item(ProductId::new(42)).await.unwrap();

        assert_eq!(
            h.api.calls(),
            vec![Call::RemoveFromCart(ProductId::new(42)), Call::Cart]
        );
        assert_eq!(h.page.is_visible(Region::CheckoutButton), Some(true));
    }

    #[tokio::test]
    async fn test_unsent_update_skips_refetch() {
        let h = harness(Session::signed_in(), shop().with_cart_line(42, 1));
        h.api.unreachable("update_cart");

        assert!(h.service.update_quantity(ProductId::new(42), 2).await.is_err());
        assert_eq!(h.api.calls(), vec![Call::UpdateCart(ProductId::new(42), 2)]);
        assert!(h.page.regions().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_success_stores_summary_and_navigates() {
        let h = harness(Session::signed_in(), shop().with_cart_line(42, 2).with_cart_line(7, 1));

        let outcome = h.service.checkout().await.unwrap();

        assert_eq!(outcome, CheckoutOutcome::Created);
        assert_eq!(h.page.last_navigation().as_deref(), Some(routes::ORDER_SUMMARY));
        assert!(h.page.alerts().is_empty());

        let stored = h.storage.get_item(keys::ORDER_SUMMARY).unwrap().unwrap();
        let payload: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(payload["message"], "Order created successfully");
        let summary: OrderSummary = serde_json::from_str(&stored).unwrap();
        assert_eq!(summary.order_items.len(), 2);
        assert_eq!(summary.total_price, Price::from_cents(2998));
    }

    #[tokio::test]
    async fn test_checkout_rejection_alerts_literal_message() {
        let h = harness(
            Session::signed_in(),
            shop().with_cart_line(42, 1).rejecting_checkout("Product Widget is out of stock"),
        );

        let outcome = h.service.checkout().await.unwrap();

        assert_eq!(
            outcome,
            CheckoutOutcome::Rejected("Product Widget is out of stock".to_string())
        );
        assert_eq!(h.page.alerts(), vec!["Product Widget is out of stock".to_string()]);
        assert!(h.page.navigations().is_empty());
        assert!(h.storage.get_item(keys::ORDER_SUMMARY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_checkout_transport_failure_has_no_side_effects() {
        let h = harness(Session::signed_in(), shop().with_cart_line(42, 1));
        h.api.unreachable("checkout");

        assert!(h.service.checkout().await.is_err());
        assert!(h.page.alerts().is_empty());
        assert!(h.page.navigations().is_empty());
    }

    #[tokio::test]
    async fn test_load_cart_renders_all_regions() {
        let h = harness(Session::signed_in(), shop());

        h.service.load_cart().await.unwrap();

        assert_eq!(h.page.is_visible(Region::CheckoutButton), Some(false));
        assert_eq!(h.page.text(Region::TotalPrice).as_deref(), Some("$0.00"));
        assert!(h.page.html(Region::CartItems).is_some());
    }

    #[tokio::test]
    async fn test_refresh_badge_per_session() {
        let guest = harness(Session::guest(), shop());
        guest.service.guest_cart().add(ProductId::new(1), "A", Price::from_cents(100)).unwrap();
        assert_eq!(guest.service.refresh_badge().await.unwrap(), 1);
        assert!(guest.api.calls().is_empty());

        let signed_in = harness(Session::signed_in(), shop().with_cart_line(42, 4));
        assert_eq!(signed_in.service.refresh_badge().await.unwrap(), 4);
        assert_eq!(signed_in.page.text(Region::CartCount).as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn test_sign_in_handoff_and_finish() {
        let h = harness(Session::guest(), shop());
        h.service.add_item(&widget()).await.unwrap();

        let payload: serde_json::Value =
            serde_json::from_str(&h.service.sign_in_handoff()).unwrap();
        assert_eq!(payload["42"]["name"], "Widget");

        h.service.finish_sign_in(false).unwrap();
        assert_eq!(h.service.guest_cart().count(), 1);

        h.service.finish_sign_in(true).unwrap();
        assert_eq!(h.service.guest_cart().count(), 0);
        assert_eq!(h.service.sign_in_handoff(), "{}");
    }

    #[tokio::test]
    async fn test_merge_sums_guest_and_server_quantities() {
        let h = harness(Session::signed_in(), shop().with_cart_line(42, 2));
        let guest = h.service.guest_cart();
        guest.add(ProductId::new(42), "Widget", Price::from_cents(999)).unwrap();
        guest.add(ProductId::new(7), "Mug", Price::from_cents(1000)).unwrap();
        guest.add(ProductId::new(7), "Mug", Price::from_cents(1000)).unwrap();

        let count = h.service.merge_guest_cart().await.unwrap();

        assert_eq!(h.api.server_quantity(42), Some(3));
        assert_eq!(h.api.server_quantity(7), Some(2));
        assert_eq!(count, 5);
        assert!(h.service.guest_cart().get().is_empty());
        assert_eq!(h.page.text(Region::CartCount).as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn test_merge_failure_keeps_guest_cart() {
        let h = harness(Session::signed_in(), shop());
        h.service
            .guest_cart()
            .add(ProductId::new(42), "Widget", Price::from_cents(999))
            .unwrap();
        h.api.failing("update_cart");

        assert!(h.service.merge_guest_cart().await.is_err());
        assert_eq!(h.service.guest_cart().count(), 1);
    }

    #[tokio::test]
    async fn test_merge_keeps_lines_without_product_id() {
        let h = harness(Session::signed_in(), shop());
        let guest = h.service.guest_cart();
        guest.add("sku-abc", "Tea", Price::from_cents(400)).unwrap();
        guest.add(ProductId::new(42), "Widget", Price::from_cents(999)).unwrap();

        h.service.merge_guest_cart().await.unwrap();

        assert_eq!(h.api.server_quantity(42), Some(1));
        let left = h.service.guest_cart().get();
        assert_eq!(left.len(), 1);
        assert_eq!(left.get("sku-abc").map(|e| e.quantity), Some(1));
    }

    #[tokio::test]
    async fn test_merge_requires_sign_in() {
        let h = harness(Session::guest(), shop());
        assert!(matches!(
            h.service.merge_guest_cart().await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
