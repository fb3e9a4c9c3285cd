//! Address book commands.

use shop_core::{AddressAction, AddressId, NewAddress};
use shop_storefront::address::{AddressActivationFlow, AddressLayout};
use shop_storefront::error::report;

use super::{CliError, Shell, require};

/// Address flow drawn with the profile or the order summary layout.
pub struct Addresses {
    flow: AddressActivationFlow,
}

impl Addresses {
    pub fn new(shell: &Shell, checkout: bool) -> Self {
        let layout = if checkout {
            AddressLayout::Checkout
        } else {
            AddressLayout::Profile
        };
        Self {
            flow: AddressActivationFlow::new(shell.ctx.api.clone(), shell.ctx.page.clone(), layout),
        }
    }

    /// `shop address list`
    pub async fn list(&self) -> Result<(), CliError> {
        require("address.load", report("address.load", self.flow.load().await)).map(drop)
    }

    /// `shop address create`
    pub async fn create(&self, address: NewAddress) -> Result<(), CliError> {
        require("address.create", report("address.create", self.flow.create(&address).await)).map(drop)
    }

    /// `shop address activate|deactivate`
    pub async fn toggle(&self, id: AddressId, action: AddressAction) -> Result<(), CliError> {
        require("address.toggle", report("address.toggle", self.flow.toggle(id, action).await)).map(drop)
    }

    /// `shop address delete`
    pub async fn delete(&self, id: AddressId) -> Result<(), CliError> {
        require("address.delete", report("address.delete", self.flow.delete(id).await)).map(drop)
    }
}
