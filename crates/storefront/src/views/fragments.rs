//! HTML fragments built from fetched data.
//!
//! Templates auto-escape, so server-provided names and descriptions are
//! never interpreted as markup.

use askama::Template;

use shop_core::{Address, AddressId, ProductId};

use crate::api::{CartItem, OrderHistoryEntry, OrderLine};

/// Fallback shown on the profile page when the address list fails to load.
pub const PROFILE_ADDRESSES_ERROR: &str = "<p>Error loading addresses.</p>";

// =============================================================================
// Cart
// =============================================================================

/// Cart line display data.
#[derive(Debug, Clone)]
pub struct CartItemView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: String,
    pub quantity: u32,
    /// Quantity requested by the "+" button.
    pub increment_to: u32,
    /// Quantity requested by the "-" button; zero means removal.
    pub decrement_to: u32,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            price: item.price.display(),
            quantity: item.quantity,
            increment_to: item.quantity.saturating_add(1),
            decrement_to: item.quantity.saturating_sub(1),
        }
    }
}

/// Cart line list fragment.
#[derive(Template)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub items: Vec<CartItemView>,
}

/// Render the cart line list.
///
/// # Errors
///
/// Returns an error if the template fails to render.
pub fn render_cart_items(items: &[CartItem]) -> askama::Result<String> {
    CartItemsTemplate {
        items: items.iter().map(CartItemView::from).collect(),
    }
    .render()
}

// =============================================================================
// Orders
// =============================================================================

/// Order line display data.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub quantity: u32,
    pub price: String,
}

impl From<&OrderLine> for OrderLineView {
    fn from(line: &OrderLine) -> Self {
        Self {
            name: line.name.clone(),
            quantity: line.quantity,
            price: line.price.display(),
        }
    }
}

/// Order summary line list fragment.
#[derive(Template)]
#[template(path = "partials/order_items.html")]
pub struct OrderItemsTemplate {
    pub lines: Vec<OrderLineView>,
}

/// Render the order summary line list.
///
/// # Errors
///
/// Returns an error if the template fails to render.
pub fn render_order_items(lines: &[OrderLine]) -> askama::Result<String> {
    OrderItemsTemplate {
        lines: lines.iter().map(OrderLineView::from).collect(),
    }
    .render()
}

/// Past order display data.
#[derive(Debug, Clone)]
pub struct OrderHistoryView {
    pub date: String,
    pub status: String,
    pub total: String,
    pub lines: Vec<OrderLineView>,
}

/// Order history fragment.
#[derive(Template)]
#[template(path = "partials/order_history.html")]
pub struct OrderHistoryTemplate {
    pub orders: Vec<OrderHistoryView>,
}

/// Render the order history list.
///
/// # Errors
///
/// Returns an error if the template fails to render.
pub fn render_order_history(orders: &[OrderHistoryEntry]) -> askama::Result<String> {
    OrderHistoryTemplate {
        orders: orders
            .iter()
            .map(|order| OrderHistoryView {
                date: order.display_date(),
                status: order.status.clone(),
                total: order.total_price.display(),
                lines: order.order_items.iter().map(OrderLineView::from).collect(),
            })
            .collect(),
    }
    .render()
}

// =============================================================================
// Addresses
// =============================================================================

/// Address display data.
#[derive(Debug, Clone)]
pub struct AddressView {
    pub id: AddressId,
    pub line: String,
    pub zipcode: String,
    pub action: &'static str,
    pub action_label: &'static str,
    pub button_class: &'static str,
}

impl From<&Address> for AddressView {
    fn from(address: &Address) -> Self {
        let action = address.toggle_action();
        Self {
            id: address.id,
            line: address.one_line(),
            zipcode: address.zipcode.clone(),
            action: action.as_str(),
            action_label: action.label(),
            button_class: if address.is_active {
                "bg-gray-500 text-red-500"
            } else {
                "bg-green-500 text-white"
            },
        }
    }
}

/// Address list on the order summary page.
///
/// Three layouts: no addresses at all (message plus creation form), none
/// active (warning plus every address with "Activate"), or only the active
/// addresses with "Deactivate".
#[derive(Template)]
#[template(path = "partials/checkout_addresses.html")]
pub struct CheckoutAddressesTemplate {
    pub has_addresses: bool,
    pub any_active: bool,
    pub addresses: Vec<AddressView>,
}

impl CheckoutAddressesTemplate {
    /// Pick the layout for `addresses`.
    #[must_use]
    pub fn new(addresses: &[Address]) -> Self {
        let any_active = addresses.iter().any(|address| address.is_active);
        let shown = addresses
            .iter()
            .filter(|address| !any_active || address.is_active)
            .map(AddressView::from)
            .collect();

        Self {
            has_addresses: !addresses.is_empty(),
            any_active,
            addresses: shown,
        }
    }
}

/// Render the order summary address list.
///
/// # Errors
///
/// Returns an error if the template fails to render.
pub fn render_checkout_addresses(addresses: &[Address]) -> askama::Result<String> {
    CheckoutAddressesTemplate::new(addresses).render()
}

/// Address list on the profile page.
#[derive(Template)]
#[template(path = "partials/profile_addresses.html")]
pub struct ProfileAddressesTemplate {
    pub addresses: Vec<AddressView>,
}

/// Render the profile address list.
///
/// # Errors
///
/// Returns an error if the template fails to render.
pub fn render_profile_addresses(addresses: &[Address]) -> askama::Result<String> {
    ProfileAddressesTemplate {
        addresses: addresses.iter().map(AddressView::from).collect(),
    }
    .render()
}
