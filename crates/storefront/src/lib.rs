//! Corner Shop storefront page client.
//!
//! The browser-side behavior of the storefront pages as a library: the
//! guest cart kept in client storage, cart sync with the shop server, the
//! coupon overlay on the order summary and the address book. Pages render
//! through [`views::RenderTarget`] and [`views::Navigator`], so the same
//! code drives a real document, the CLI and the tests.
//!
//! # Layers
//!
//! - [`api`]: the shop's JSON API behind the [`api::ShopApi`] trait
//! - [`storage`], [`guest_cart`]: client-persisted state
//! - [`cart_sync`], [`coupon`], [`address`]: one service per concern
//! - [`pages`]: per-page controllers, one error boundary per user action

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod api;
pub mod cart_sync;
pub mod config;
pub mod cookies;
pub mod coupon;
pub mod error;
pub mod guest_cart;
pub mod pages;
pub mod reconcile;
pub mod storage;
pub mod views;

#[cfg(test)]
mod testing;
