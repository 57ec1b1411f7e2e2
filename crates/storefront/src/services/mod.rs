//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, password login and password reset
//! - `cart` - Persisted cart operations and guest cart reconciliation at login
//! - `address` - Shipping addresses with the one-default-per-user rule
//! - `profile` - Name and email changes
//! - `orders` - Order history
//! - `wishlist` - Saved products
//! - `email` - Transactional email delivery
//!
//! Services borrow a store for the duration of a request and are generic over
//! the store traits they need, so handlers pass the shared `dyn Persistence`
//! and tests pass a [`MemoryStore`](crate::db::MemoryStore) directly. The
//! acting user's ID is always an explicit argument.

pub mod address;
pub mod auth;
pub mod cart;
pub mod email;
pub mod orders;
pub mod profile;
pub mod wishlist;
