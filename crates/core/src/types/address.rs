//! Shipping addresses from the user's address book.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::id::AddressId;

/// A saved address as returned by the address list endpoint.
///
/// At most one address per user should be active. Only the server enforces
/// that; the client never patches sibling state itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub country: String,
    pub city: String,
    pub address: String,
    pub zipcode: String,
    #[serde(default)]
    pub is_active: bool,
}

impl Address {
    /// The action offered by this address's toggle control.
    #[must_use]
    pub const fn toggle_action(&self) -> AddressAction {
        if self.is_active {
            AddressAction::Deactivate
        } else {
            AddressAction::Activate
        }
    }

    /// One-line rendering used by the address lists.
    #[must_use]
    pub fn one_line(&self) -> String {
        format!("{}, {}, {}", self.country, self.city, self.address)
    }
}

/// Body of the create-address request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    pub country: String,
    pub city: String,
    pub address: String,
    pub zipcode: String,
}

/// Errors that can occur when parsing an [`AddressAction`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown address action: {0} (expected activate, deactivate or delete)")]
pub struct AddressActionError(String);

/// A state transition requested for one address.
///
/// ```text
/// Inactive --activate--> Active --deactivate--> Inactive
/// Inactive --delete--> (removed)
/// Active   --delete--> (removed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressAction {
    Activate,
    Deactivate,
    Delete,
}

impl AddressAction {
    /// The verb used in the endpoint path and in the toggle label source.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Delete => "delete",
        }
    }

    /// Capitalized button label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Activate => "Activate",
            Self::Deactivate => "Deactivate",
            Self::Delete => "Delete",
        }
    }

    /// Resulting `is_active` flag after applying this action, or `None` if
    /// the address no longer exists.
    #[must_use]
    pub const fn next_state(&self) -> Option<bool> {
        match self {
            Self::Activate => Some(true),
            Self::Deactivate => Some(false),
            Self::Delete => None,
        }
    }
}

impl fmt::Display for AddressAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressAction {
    type Err = AddressActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "activate" => Ok(Self::Activate),
            "deactivate" => Ok(Self::Deactivate),
            "delete" => Ok(Self::Delete),
            _ => Err(AddressActionError(s.to_owned())),
        }
    }
}
