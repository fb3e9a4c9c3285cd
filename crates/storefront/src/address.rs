//! Address book flows on the order summary and profile pages.
//!
//! The server alone enforces that at most one address is active. After
//! every activate, deactivate, create or delete the whole list is fetched
//! again and redrawn; no other address's controls are patched locally.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, instrument, warn};

use shop_core::{Address, AddressAction, AddressId, NewAddress};

use crate::api::ShopApi;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::reconcile::mutate_then_reconcile;
use crate::views::{
    PROFILE_ADDRESSES_ERROR, Page, Region, render_checkout_addresses, render_profile_addresses,
};

/// Which page's address list the flow draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressLayout {
    /// Order summary: only the active address, or everything with
    /// "Activate" when none is active.
    Checkout,
    /// Profile: every address.
    Profile,
}

impl AddressLayout {
    const fn region(self) -> Region {
        match self {
            Self::Checkout => Region::CheckoutAddresses,
            Self::Profile => Region::ProfileAddresses,
        }
    }
}

/// Activate, deactivate, create and delete addresses, redrawing the list
/// from the server after each change.
pub struct AddressActivationFlow {
    api: Arc<dyn ShopApi>,
    page: Arc<dyn Page>,
    layout: AddressLayout,
    form_visible: AtomicBool,
}

impl AddressActivationFlow {
    #[must_use]
    pub fn new(api: Arc<dyn ShopApi>, page: Arc<dyn Page>, layout: AddressLayout) -> Self {
        Self {
            api,
            page,
            layout,
            form_visible: AtomicBool::new(false),
        }
    }

    /// Fetch and draw the address list.
    ///
    /// On the profile page a failed fetch draws the error fallback.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or render fails.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<Address>> {
        match self.api.addresses().await {
            Ok(addresses) => {
                self.render(&addresses)?;
                Ok(addresses)
            }
            Err(e) => {
                if self.layout == AddressLayout::Profile {
                    self.page
                        .render(Region::ProfileAddresses, PROFILE_ADDRESSES_ERROR.to_string());
                }
                Err(e.into())
            }
        }
    }

    /// Activate or deactivate one address, then redraw from the server.
    ///
    /// # Errors
    ///
    /// Returns an error for [`AddressAction::Delete`] (use
    /// [`delete`](Self::delete)) or if an API call or render fails.
    #[instrument(skip(self))]
    pub async fn toggle(&self, id: AddressId, action: AddressAction) -> Result<Vec<Address>> {
        if action.next_state().is_none() {
            return Err(AppError::InvalidInput(format!(
                "{action} is not an activation toggle"
            )));
        }
        self.mutate(id, action).await
    }

    /// Delete one address, then redraw from the server.
    ///
    /// # Errors
    ///
    /// Returns an error if an API call or render fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: AddressId) -> Result<Vec<Address>> {
        self.mutate(id, AddressAction::Delete).await
    }

    /// Create an address, then redraw from the server and hide the form.
    ///
    /// A rejected address is not reconciled: the list is not redrawn, so
    /// the form stays open with its input.
    ///
    /// # Errors
    ///
    /// Returns an error if an API call or render fails.
    #[instrument(skip(self, address))]
    pub async fn create(&self, address: &NewAddress) -> Result<Vec<Address>> {
        add_breadcrumb("address", "Create address", Some(&[("city", &address.city)]));

        self.api
            .create_address(address)
            .await
            .inspect_err(|e| warn!(error = %e, "Address creation failed, keeping form open"))?;
        let addresses = self.api.addresses().await?;
        self.render(&addresses)?;

        self.set_form_visible(false);
        info!(count = addresses.len(), "Address created");
        Ok(addresses)
    }

    /// Show the creation form if hidden, hide it if shown.
    ///
    /// Returns the new visibility.
    pub fn toggle_form(&self) -> bool {
        let visible = !self.form_visible.fetch_xor(true, Ordering::SeqCst);
        self.page.set_visible(Region::AddressForm, visible);
        visible
    }

    /// Whether the creation form is currently shown.
    #[must_use]
    pub fn is_form_visible(&self) -> bool {
        self.form_visible.load(Ordering::SeqCst)
    }

    async fn mutate(&self, id: AddressId, action: AddressAction) -> Result<Vec<Address>> {
        add_breadcrumb(
            "address",
            action.label(),
            Some(&[("address_id", &id.to_string())]),
        );

        mutate_then_reconcile(
            self.api.address_action(id, action),
            || self.api.addresses(),
            |addresses| self.render(addresses),
        )
        .await
    }

    fn render(&self, addresses: &[Address]) -> Result<()> {
        let html = match self.layout {
            AddressLayout::Checkout => render_checkout_addresses(addresses)?,
            AddressLayout::Profile => render_profile_addresses(addresses)?,
        };
        self.page.render(self.layout.region(), html);

        // The empty-list layout carries a fresh, hidden creation form
        if self.layout == AddressLayout::Checkout && addresses.is_empty() {
            self.form_visible.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    fn set_form_visible(&self, visible: bool) {
        self.form_visible.store(visible, Ordering::SeqCst);
        self.page.set_visible(Region::AddressForm, visible);
    }
}
