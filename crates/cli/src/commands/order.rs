//! Order summary commands.

use shop_storefront::pages::OrderSummaryPage;

use super::{CliError, Shell, require};

/// `shop summary`
pub async fn summary(shell: &Shell) -> Result<(), CliError> {
    require("summary.load", OrderSummaryPage::new(&shell.ctx).on_load().await).map(drop)
}

/// `shop coupon apply`
///
/// Loads the summary first; the coupon applies to the subtotal shown.
pub async fn apply_coupon(shell: &Shell, code: &str) -> Result<(), CliError> {
    let page = OrderSummaryPage::new(&shell.ctx);
    require("summary.load", page.on_load().await)?;

    let outcome = require("coupon.apply", page.on_apply_coupon(code).await)?;
    if !outcome.valid {
        return Err(CliError::ActionFailed("coupon.apply"));
    }
    Ok(())
}

/// `shop coupon confirm`
pub async fn confirm(shell: &Shell) -> Result<(), CliError> {
    let confirmed = require("order.confirm", OrderSummaryPage::new(&shell.ctx).on_confirm().await)?;
    if confirmed {
        Ok(())
    } else {
        Err(CliError::ActionFailed("order.confirm"))
    }
}
