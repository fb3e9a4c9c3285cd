//! Profile and sign-in commands.

use shop_storefront::pages::{ProfilePage, SignInPage};

use super::{CliError, Shell, require};

/// `shop profile`
pub async fn profile(shell: &Shell) -> Result<(), CliError> {
    let orders = require("profile.orders", ProfilePage::new(&shell.ctx).on_load().await)?;
    tracing::info!(orders = orders.len(), "Profile loaded");
    Ok(())
}

/// `shop sign-in-payload`
#[allow(clippy::print_stdout)]
pub fn sign_in_payload(shell: &Shell) -> Result<(), CliError> {
    println!("{}", SignInPage::new(&shell.ctx).on_submit());
    Ok(())
}

/// `shop sign-in-finish`
pub fn sign_in_finish(shell: &Shell, query: &str) -> Result<(), CliError> {
    let cleared = require("sign_in.load", SignInPage::new(&shell.ctx).on_load(query))?;
    tracing::info!(cleared, "Sign-in finished");
    Ok(())
}
