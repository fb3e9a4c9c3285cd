//! Guest cart persisted in client storage.
//!
//! Used while the shopper is signed out. Every operation is a full
//! read-modify-write of the `cart` key; two pages writing at once race and
//! the last write wins.

use std::sync::Arc;

use tracing::warn;

use shop_core::{GuestCart, Price, ProductKey};

use crate::error::Result;
use crate::storage::{LocalStorage, keys};

/// CRUD over the persisted guest cart.
#[derive(Clone)]
pub struct GuestCartStore {
    storage: Arc<dyn LocalStorage>,
}

impl GuestCartStore {
    /// Create a store over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Current guest cart.
    ///
    /// Missing, unreadable or corrupt data yields an empty cart; this never
    /// fails.
    #[must_use]
    pub fn get(&self) -> GuestCart {
        let raw = match self.storage.get_item(keys::CART) {
            Ok(Some(raw)) => raw,
            Ok(None) => return GuestCart::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read guest cart, treating as empty");
                return GuestCart::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Guest cart is corrupt, treating as empty");
            GuestCart::new()
        })
    }

    /// Add one unit of a product and persist the whole cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be written back.
    pub fn add(&self, key: impl Into<ProductKey>, name: &str, price: Price) -> Result<GuestCart> {
        let mut cart = self.get();
        cart.add(key, name, price);
        self.save(&cart)?;
        Ok(cart)
    }

    /// Remove a product line and persist the whole cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be written back.
    pub fn remove(&self, key: impl Into<ProductKey>) -> Result<GuestCart> {
        let mut cart = self.get();
        if cart.remove(key).is_some() {
            self.save(&cart)?;
        }
        Ok(cart)
    }

    /// Sum of all quantities, for the cart badge.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.get().count()
    }

    /// Drop the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be removed.
    pub fn clear(&self) -> Result<()> {
        self.storage.remove_item(keys::CART)?;
        Ok(())
    }

    /// The persisted cart as submitted with the sign-in form.
    ///
    /// `"{}"` when nothing is stored.
    #[must_use]
    pub fn handoff_payload(&self) -> String {
        match self.storage.get_item(keys::CART) {
            Ok(Some(raw)) if !raw.trim().is_empty() => raw,
            _ => "{}".to_string(),
        }
    }

    fn save(&self, cart: &GuestCart) -> Result<()> {
        let json = serde_json::to_string(cart)?;
        self.storage.set_item(keys::CART, &json)?;
        Ok(())
    }
}
