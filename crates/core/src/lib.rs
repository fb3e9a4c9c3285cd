//! Corner Shop Core - Shared types library.
//!
//! This crate provides common types used across the Corner Shop components:
//! - `storefront` - Page client for the cart, order summary, sign-in and profile pages
//! - `cli` - Terminal driver for the page client
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no local storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and prices, plus the
//!   guest cart, coupon and address records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
