//! BlossomCart Core - Shared domain types.
//!
//! This crate provides the value types used across the BlossomCart workspace:
//! - `storefront` - JSON API server for browsing, cart, wishlist and account data
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP.
//! Database encoding for the newtypes is available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, quantities, prices and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
