//! Core types for Corner Shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod cart;
pub mod coupon;
pub mod id;
pub mod price;

pub use address::{Address, AddressAction, AddressActionError, NewAddress};
pub use cart::{GuestCart, GuestCartEntry, ProductKey};
pub use coupon::{Coupon, CouponCode, CouponCodeError};
pub use id::*;
pub use price::{Price, PriceError};
