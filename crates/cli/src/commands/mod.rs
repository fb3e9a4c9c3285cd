//! Command implementations.
//!
//! Each command builds the page controller it needs from a [`Shell`], runs
//! one action and leaves the result in the shell's [`MemoryPage`].

pub mod account;
pub mod address;
pub mod cart;
pub mod order;

use std::sync::Arc;

use thiserror::Error;

use shop_storefront::api::{ApiError, ShopClient};
use shop_storefront::config::{ConfigError, StorefrontConfig};
use shop_storefront::pages::PageContext;
use shop_storefront::reconcile::Session;
use shop_storefront::storage::FileStorage;
use shop_storefront::views::MemoryPage;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The API client could not be built.
    #[error("Client error: {0}")]
    Client(#[from] ApiError),

    /// The page action failed; details were logged.
    #[error("{0} failed")]
    ActionFailed(&'static str),
}

/// Turn a page handler's `None` into a command failure.
pub fn require<T>(action: &'static str, value: Option<T>) -> Result<T, CliError> {
    value.ok_or(CliError::ActionFailed(action))
}

/// A headless page wired to the configured shop.
pub struct Shell {
    pub ctx: PageContext,
    pub page: Arc<MemoryPage>,
}

impl Shell {
    /// Connect to the shop named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, CliError> {
        let api = Arc::new(ShopClient::new(&config.api)?);
        let storage = Arc::new(FileStorage::new(config.storage_path.clone()));
        let page = Arc::new(MemoryPage::new());

        tracing::debug!(
            base_url = %config.api.base_url,
            storage = %config.storage_path.display(),
            authenticated = config.authenticated,
            "Shell ready"
        );

        Ok(Self {
            ctx: PageContext::new(
                Session::from_flag(config.authenticated),
                api,
                storage,
                page.clone(),
            ),
            page,
        })
    }

    /// Print what the page shows now.
    #[allow(clippy::print_stdout)]
    pub fn print(&self) {
        for (region, state) in self.page.regions() {
            println!("#{}", region.element_id());
            if let Some(text) = state.text {
                println!("  text: {text}");
            }
            if let Some(visible) = state.visible {
                println!("  visible: {visible}");
            }
            if let Some(enabled) = state.enabled {
                println!("  enabled: {enabled}");
            }
            if let Some(html) = state.html {
                for line in html.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    println!("  | {line}");
                }
            }
        }
        for alert in self.page.alerts() {
            println!("alert: {alert}");
        }
        for path in self.page.navigations() {
            println!("navigate: {path}");
        }
    }
}
