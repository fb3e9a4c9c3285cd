//! Cart page commands.

use shop_core::{Price, ProductId};
use shop_storefront::cart_sync::{CartSyncService, ProductCard};
use shop_storefront::error::report;
use shop_storefront::pages::{CartPage, HomePage};

use super::{CliError, Shell, require};

/// `shop cart show`
pub async fn show(shell: &Shell) -> Result<(), CliError> {
    let cart = require("cart.load", CartPage::new(&shell.ctx).on_load().await)?;
    tracing::info!(lines = cart.cart_items.len(), "Cart loaded");
    Ok(())
}

/// `shop cart add`
///
/// Goes through the home page's add-to-cart button, so a signed-out
/// session fills the guest cart and a signed-in one the server cart.
pub async fn add(shell: &Shell, id: ProductId, name: String, price: Price) -> Result<(), CliError> {
    let home = HomePage::new(&shell.ctx);
    let count = require("cart.add", home.on_add_to_cart(&ProductCard { id, name, price }).await)?;
    tracing::info!(count, "Added to cart");
    Ok(())
}

/// `shop cart update`
pub async fn update(shell: &Shell, id: ProductId, quantity: i64) -> Result<(), CliError> {
    let page = CartPage::new(&shell.ctx);
    require("cart.update", page.on_quantity_change(id, quantity).await).map(drop)
}

/// `shop cart remove`
pub async fn remove(shell: &Shell, id: ProductId) -> Result<(), CliError> {
    require("cart.remove", CartPage::new(&shell.ctx).on_remove(id).await).map(drop)
}

/// `shop cart checkout`
pub async fn checkout(shell: &Shell) -> Result<(), CliError> {
    let outcome = require("cart.checkout", CartPage::new(&shell.ctx).on_checkout().await)?;
    tracing::info!(outcome = ?outcome, "Checkout finished");
    Ok(())
}

/// `shop cart badge`
pub async fn badge(shell: &Shell) -> Result<(), CliError> {
    require("home.load", HomePage::new(&shell.ctx).on_load().await).map(drop)
}

/// `shop merge`
pub async fn merge(shell: &Shell) -> Result<(), CliError> {
    let ctx = &shell.ctx;
    let cart = CartSyncService::new(ctx.session, ctx.api.clone(), ctx.storage.clone(), ctx.page.clone());
    let count = require("cart.merge", report("cart.merge", cart.merge_guest_cart().await))?;
    tracing::info!(count, "Guest cart merged");
    Ok(())
}
