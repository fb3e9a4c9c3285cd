//! Render targets and page views.
//!
//! Views are pure: they turn fetched JSON into HTML fragments and hand them
//! to a [`RenderTarget`], which owns the actual document. Every data change
//! re-renders the affected region wholesale; nothing is patched in place.
//!
//! Blocking alerts and navigation go through [`Navigator`], so a page can
//! be driven headless in tests and from the CLI.

mod fragments;
mod memory;

pub use fragments::*;
pub use memory::{MemoryPage, RegionState};

/// Regions of the document a page writes into.
///
/// Each maps to the element ID the page shell provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    /// Cart badge in the header.
    CartCount,
    /// Cart line list.
    CartItems,
    /// Cart or order subtotal.
    TotalPrice,
    /// Order total after the coupon.
    FinalPrice,
    /// Checkout button on the cart page.
    CheckoutButton,
    /// Order summary line list.
    OrderItems,
    /// Coupon code input.
    CouponInput,
    /// Address list on the order summary page.
    CheckoutAddresses,
    /// Address creation form on the order summary page.
    AddressForm,
    /// Address list on the profile page.
    ProfileAddresses,
    /// Past orders on the profile page.
    OrderHistory,
}

impl Region {
    /// Element ID in the page shell.
    #[must_use]
    pub const fn element_id(&self) -> &'static str {
        match self {
            Self::CartCount => "cart-count",
            Self::CartItems => "cart-items",
            Self::TotalPrice => "total-price",
            Self::FinalPrice => "final-price",
            Self::CheckoutButton => "checkout-button",
            Self::OrderItems => "order-items",
            Self::CouponInput => "coupon-code",
            Self::CheckoutAddresses => "create-address-div",
            Self::AddressForm => "create-address-form",
            Self::ProfileAddresses => "addresses",
            Self::OrderHistory => "order-history",
        }
    }
}

/// The document a page renders into.
pub trait RenderTarget: Send + Sync {
    /// Replace the contents of `region` with an HTML fragment.
    fn render(&self, region: Region, html: String);

    /// Replace the text of `region`.
    fn set_text(&self, region: Region, text: String);

    /// Show or hide `region`.
    fn set_visible(&self, region: Region, visible: bool);

    /// Enable or disable the control in `region`.
    fn set_enabled(&self, region: Region, enabled: bool);
}

/// Window-level side effects.
pub trait Navigator: Send + Sync {
    /// Show a blocking message to the user.
    fn alert(&self, message: &str);

    /// Leave the current page for `path`.
    fn navigate(&self, path: &str);
}

/// A page: a document plus its window.
pub trait Page: RenderTarget + Navigator {}

impl<T: RenderTarget + Navigator> Page for T {}

/// Site routes the page client navigates to.
pub mod routes {
    pub const HOME: &str = "/";
    pub const CART: &str = "/cart/";
    pub const ORDER_SUMMARY: &str = "/order-summary/";
    pub const SIGN_IN: &str = "/sign-in/";
}
