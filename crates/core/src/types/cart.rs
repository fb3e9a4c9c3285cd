//! Guest cart held on the client before sign-in.
//!
//! The persisted shape is a JSON object keyed by product key:
//!
//! ```json
//! {"42": {"name": "Widget", "price": "9.99", "quantity": 2}}
//! ```
//!
//! Keys are kept as the strings they were stored under. Pages normally
//! store numeric product IDs, but a key that is not one still round-trips
//! instead of spoiling the whole cart.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// Product identifier as stored in the guest cart.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductKey(String);

impl ProductKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The server's product ID, if the key is one.
    #[must_use]
    pub fn product_id(&self) -> Option<ProductId> {
        self.0.parse().ok()
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ProductId> for ProductKey {
    fn from(id: ProductId) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ProductKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

/// One product line in the guest cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCartEntry {
    /// Product name as shown on the add-to-cart button.
    pub name: String,
    /// Unit price as shown on the add-to-cart button.
    pub price: Price,
    /// Always at least 1.
    pub quantity: u32,
}

/// Mapping of product key to guest cart entry.
///
/// Keys are unique; adding an existing product increments its quantity
/// instead of inserting a second line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestCart(BTreeMap<ProductKey, GuestCartEntry>);

impl GuestCart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of a product.
    ///
    /// An existing line keeps its original name and price and only gains
    /// quantity.
    pub fn add(&mut self, key: impl Into<ProductKey>, name: &str, price: Price) {
        self.0
            .entry(key.into())
            .and_modify(|entry| entry.quantity = entry.quantity.saturating_add(1))
            .or_insert_with(|| GuestCartEntry {
                name: name.to_owned(),
                price,
                quantity: 1,
            });
    }

    /// Remove a product line, returning it if present.
    pub fn remove(&mut self, key: impl Into<ProductKey>) -> Option<GuestCartEntry> {
        self.0.remove(&key.into())
    }

    /// Look up a product line.
    #[must_use]
    pub fn get(&self, key: impl Into<ProductKey>) -> Option<&GuestCartEntry> {
        self.0.get(&key.into())
    }

    /// Sum of all quantities, shown on the cart badge.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.0.values().map(|entry| entry.quantity).sum()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over lines in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ProductKey, &GuestCartEntry)> {
        self.0.iter()
    }
}
