//! Page controllers.
//!
//! One controller per storefront page, wiring user events to the services.
//! Every handler is one user action and runs behind [`report`]: a failure
//! is logged and captured, and the handler returns `None`.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, instrument, warn};

use shop_core::{AddressAction, AddressId, NewAddress, Price, ProductId};

use crate::address::{AddressActivationFlow, AddressLayout};
use crate::api::{ActiveOrder, CartContents, OrderHistoryEntry, OrderSummary, ShopApi};
use crate::cart_sync::{CartSyncService, CheckoutOutcome, ProductCard};
use crate::coupon::{CouponOutcome, CouponOverlay};
use crate::error::{AppError, Result, report};
use crate::reconcile::Session;
use crate::storage::{LocalStorage, keys};
use crate::views::{Page, Region, render_order_history, render_order_items, routes};

/// Query parameter the sign-in page comes back with after a successful
/// sign-in.
pub const SIGN_IN_SUCCESS_PARAM: &str = "success_message";

/// Everything a page controller is built from.
#[derive(Clone)]
pub struct PageContext {
    pub session: Session,
    pub api: Arc<dyn ShopApi>,
    pub storage: Arc<dyn LocalStorage>,
    pub page: Arc<dyn Page>,
}

impl PageContext {
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
            storage,
            page,
        }
    }

    fn cart_sync(&self) -> CartSyncService {
        CartSyncService::new(
            self.session,
            self.api.clone(),
            self.storage.clone(),
            self.page.clone(),
        )
    }
}

// =============================================================================
// Home and header
// =============================================================================

/// Product listing with add-to-cart buttons.
pub struct HomePage {
    cart: CartSyncService,
}

impl HomePage {
    #[must_use]
    pub fn new(ctx: &PageContext) -> Self {
        Self {
            cart: ctx.cart_sync(),
        }
    }

    /// Draw the badge for the current session.
    pub async fn on_load(&self) -> Option<u32> {
        report("home.load", self.cart.refresh_badge().await)
    }

    /// An add-to-cart button was clicked.
    pub async fn on_add_to_cart(&self, product: &ProductCard) -> Option<u32> {
        report("cart.add", self.cart.add_item(product).await)
    }

    /// The tab was shown or hidden; the badge is re-synced when shown, as
    /// another tab may have changed the cart.
    pub async fn on_visibility_change(&self, visible: bool) -> Option<u32> {
        if !visible {
            return None;
        }
        report("home.visibility", self.cart.refresh_badge().await)
    }
}

/// Site header.
pub struct HeaderBar {
    session: Session,
    page: Arc<dyn Page>,
}

impl HeaderBar {
    #[must_use]
    pub fn new(ctx: &PageContext) -> Self {
        Self {
            session: ctx.session,
            page: ctx.page.clone(),
        }
    }

    /// The cart icon was clicked. Signed-out shoppers are sent to sign in.
    pub fn on_cart_icon_click(&self) -> &'static str {
        let target = if self.session.is_authenticated() {
            routes::CART
        } else {
            routes::SIGN_IN
        };
        self.page.navigate(target);
        target
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The signed-in cart page.
pub struct CartPage {
    cart: CartSyncService,
}

impl CartPage {
    #[must_use]
    pub fn new(ctx: &PageContext) -> Self {
        Self {
            cart: ctx.cart_sync(),
        }
    }

    pub async fn on_load(&self) -> Option<CartContents> {
        report("cart.load", self.cart.load_cart().await)
    }

    /// "+" or "-" on a line; `quantity` is the requested new quantity.
    pub async fn on_quantity_change(&self, product_id: ProductId, quantity: i64) -> Option<CartContents> {
        report(
            "cart.update",
            self.cart.update_quantity(product_id, quantity).await,
        )
    }

    pub async fn on_remove(&self, product_id: ProductId) -> Option<CartContents> {
        report("cart.remove", self.cart.remove_item(product_id).await)
    }

    pub async fn on_checkout(&self) -> Option<CheckoutOutcome> {
        report("cart.checkout", self.cart.checkout().await)
    }
}

// =============================================================================
// Order summary
// =============================================================================

/// The order summary page: order lines, coupon and delivery address.
pub struct OrderSummaryPage {
    api: Arc<dyn ShopApi>,
    storage: Arc<dyn LocalStorage>,
    page: Arc<dyn Page>,
    coupon: CouponOverlay,
    addresses: AddressActivationFlow,
    subtotal: Mutex<Option<Price>>,
}

impl OrderSummaryPage {
    #[must_use]
    pub fn new(ctx: &PageContext) -> Self {
        Self {
            api: ctx.api.clone(),
            storage: ctx.storage.clone(),
            page: ctx.page.clone(),
            coupon: CouponOverlay::new(ctx.api.clone(), ctx.storage.clone(), ctx.page.clone()),
            addresses: AddressActivationFlow::new(
                ctx.api.clone(),
                ctx.page.clone(),
                AddressLayout::Checkout,
            ),
            subtotal: Mutex::new(None),
        }
    }

    /// Draw the order and the address list.
    ///
    /// The two halves fail independently. Returns the order shown, if any.
    pub async fn on_load(&self) -> Option<OrderSummary> {
        let summary = report("summary.load", self.load_summary().await).flatten();
        report("summary.addresses", self.addresses.load().await);
        summary
    }

    /// The subtotal of the order currently shown.
    #[must_use]
    pub fn subtotal(&self) -> Option<Price> {
        *self.subtotal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn on_apply_coupon(&self, code: &str) -> Option<CouponOutcome> {
        let result = match self.subtotal() {
            Some(subtotal) => self.coupon.apply(code, subtotal).await,
            None => Err(AppError::InvalidInput(
                "no order is shown to apply a coupon to".to_string(),
            )),
        };
        report("coupon.apply", result)
    }

    pub async fn on_confirm(&self) -> Option<bool> {
        report("order.confirm", self.coupon.confirm_order().await).map(|r| r.is_success())
    }

    pub async fn on_toggle_address(&self, id: AddressId, action: AddressAction) -> Option<usize> {
        report("address.toggle", self.addresses.toggle(id, action).await).map(|a| a.len())
    }

    pub async fn on_create_address(&self, address: &NewAddress) -> Option<usize> {
        report("address.create", self.addresses.create(address).await).map(|a| a.len())
    }

    /// The "Create Address" button was clicked.
    pub fn on_toggle_form(&self) -> bool {
        self.addresses.toggle_form()
    }

    /// The overlay behind this page.
    #[must_use]
    pub const fn coupon(&self) -> &CouponOverlay {
        &self.coupon
    }

    #[instrument(skip(self))]
    async fn load_summary(&self) -> Result<Option<OrderSummary>> {
        let summary = match self.take_handoff()? {
            Some(summary) => summary,
            None => match self.api.active_order().await? {
                ActiveOrder::Found(summary) => summary,
                ActiveOrder::Missing { error } => {
                    warn!(error = %error, "No active order");
                    self.page.alert(&error);
                    self.page.navigate(routes::CART);
                    return Ok(None);
                }
            },
        };

        self.page
            .render(Region::OrderItems, render_order_items(&summary.order_items)?);
        self.page
            .set_text(Region::TotalPrice, summary.total_price.display());
        *self.subtotal.lock().unwrap_or_else(PoisonError::into_inner) = Some(summary.total_price);
        self.coupon.reapply(summary.total_price);
        Ok(Some(summary))
    }

    /// Read and drop the summary stored by checkout. It is used at most
    /// once; an unreadable one is dropped too.
    fn take_handoff(&self) -> Result<Option<OrderSummary>> {
        let Some(raw) = self.storage.get_item(keys::ORDER_SUMMARY)? else {
            return Ok(None);
        };
        self.storage.remove_item(keys::ORDER_SUMMARY)?;

        match serde_json::from_str(&raw) {
            Ok(summary) => {
                debug!("Using order summary handed off by checkout");
                Ok(Some(summary))
            }
            Err(e) => {
                warn!(error = %e, "Handed-off order summary is corrupt, fetching instead");
                Ok(None)
            }
        }
    }
}

// =============================================================================
// Profile
// =============================================================================

/// The profile page: address book and order history.
pub struct ProfilePage {
    api: Arc<dyn ShopApi>,
    page: Arc<dyn Page>,
    addresses: AddressActivationFlow,
}

impl ProfilePage {
    #[must_use]
    pub fn new(ctx: &PageContext) -> Self {
        Self {
            api: ctx.api.clone(),
            page: ctx.page.clone(),
            addresses: AddressActivationFlow::new(
                ctx.api.clone(),
                ctx.page.clone(),
                AddressLayout::Profile,
            ),
        }
    }

    /// Draw the address book and the order history.
    pub async fn on_load(&self) -> Option<Vec<OrderHistoryEntry>> {
        report("profile.addresses", self.addresses.load().await);
        report("profile.orders", self.load_orders().await)
    }

    pub async fn on_toggle_address(&self, id: AddressId, action: AddressAction) -> Option<usize> {
        report("address.toggle", self.addresses.toggle(id, action).await).map(|a| a.len())
    }

    pub async fn on_delete_address(&self, id: AddressId) -> Option<usize> {
        report("address.delete", self.addresses.delete(id).await).map(|a| a.len())
    }

    async fn load_orders(&self) -> Result<Vec<OrderHistoryEntry>> {
        let orders = self.api.orders().await?;
        self.page
            .render(Region::OrderHistory, render_order_history(&orders)?);
        Ok(orders)
    }
}

// =============================================================================
// Sign-in
// =============================================================================

/// The sign-in page, where the guest cart is handed to the server.
pub struct SignInPage {
    cart: CartSyncService,
}

impl SignInPage {
    #[must_use]
    pub fn new(ctx: &PageContext) -> Self {
        Self {
            cart: ctx.cart_sync(),
        }
    }

    /// Value of the form's `local_cart` field on submit.
    #[must_use]
    pub fn on_submit(&self) -> String {
        self.cart.sign_in_handoff()
    }

    /// The page loaded with `query` (without the leading `?`). The guest
    /// cart is dropped when the success marker is present.
    pub fn on_load(&self, query: &str) -> Option<bool> {
        let success = url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .any(|(key, _)| key == SIGN_IN_SUCCESS_PARAM);
        report("sign_in.load", self.cart.finish_sign_in(success)).map(|()| success)
    }
}
