//! Persistence gateway for the storefront.
//!
//! # Database: `blossom_storefront`
//!
//! ## Tables (schema `storefront`)
//!
//! - `user` / `user_password` - Accounts and Argon2 password hashes
//! - `product` - Catalog
//! - `cart` / `cart_item` - One persisted cart per user, one line per product
//! - `wishlist` / `wishlist_item` - One wishlist per user
//! - `address` - Shipping addresses, at most one default per user
//! - `order` / `order_item` - Order history (read-only from the storefront)
//! - `tower_sessions.session` - Session storage
//!
//! # Store traits
//!
//! Services talk to the database through the store traits below, never to a
//! pool directly. [`PgStore`] is the production implementation; [`MemoryStore`]
//! keeps the same semantics in process for tests and local experiments. Every
//! method is a single atomic statement unless its docs say otherwise.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p blossom-cli -- migrate
//! ```

pub mod addresses;
pub mod carts;
pub mod memory;
pub mod orders;
pub mod products;
pub mod users;
pub mod wishlists;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use blossom_core::{AddressId, CartId, Email, OrderId, ProductId, Quantity, UserId, WishlistId};

use crate::models::address::{Address, AddressFields};
use crate::models::cart::Cart;
use crate::models::order::Order;
use crate::models::product::Product;
use crate::models::user::{NewUser, User};
use crate::models::wishlist::Wishlist;

pub use memory::{CartFault, MemoryStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a sqlx error, turning unique violations into [`RepositoryError::Conflict`].
    pub(crate) fn from_unique(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(what.to_owned());
        }
        Self::Database(err)
    }
}

/// Accounts, passwords and reset tokens.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by (normalized) email.
    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Get a user together with their password hash.
    ///
    /// Returns `None` if the user doesn't exist or has no password set.
    async fn user_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Create a user with their password, an empty cart and an empty wishlist.
    ///
    /// All four rows are written in one transaction: a duplicate email yields
    /// `RepositoryError::Conflict` and leaves nothing behind.
    async fn register_user(&self, new_user: &NewUser) -> Result<User, RepositoryError>;

    /// Update name and/or email. `None` leaves a field unchanged.
    ///
    /// Returns `RepositoryError::Conflict` if the email belongs to another user
    /// and `RepositoryError::NotFound` if the user is gone.
    async fn update_profile(
        &self,
        id: UserId,
        name: Option<&str>,
        email: Option<&Email>,
    ) -> Result<User, RepositoryError>;

    /// Store a password reset token digest, replacing any previous one.
    async fn store_reset_token(
        &self,
        id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Consume an unexpired reset token and replace the user's password.
    ///
    /// Runs in one transaction. Returns `None` if no live token matches.
    async fn reset_password(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<UserId>, RepositoryError>;
}

/// Read access to the catalog.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products, newest first.
    async fn products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// A single product.
    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
}

/// Persisted carts and their lines.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's cart with its lines, if one exists.
    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Create the user's (empty) cart. Returns the existing ID if one was created concurrently.
    async fn create_cart(&self, user_id: UserId) -> Result<CartId, RepositoryError>;

    /// Add `quantity` to the line for `product_id`, creating the line if absent.
    ///
    /// A single upsert: concurrent adds for the same product never create a
    /// second line. The total saturates at `i32::MAX`. Returns the line's new
    /// quantity.
    async fn add_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, RepositoryError>;

    /// Overwrite the quantity of an existing line. Returns `false` if there is no line.
    async fn set_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError>;

    /// Delete a line. Returns `false` if there was no line.
    async fn remove_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError>;
}

/// Persisted wishlists.
#[async_trait]
pub trait WishlistStore: Send + Sync {
    /// The user's wishlist with its entries, if one exists.
    async fn wishlist_for_user(&self, user_id: UserId)
    -> Result<Option<Wishlist>, RepositoryError>;

    /// Create the user's (empty) wishlist, or return the existing one's ID.
    async fn create_wishlist(&self, user_id: UserId) -> Result<WishlistId, RepositoryError>;

    /// Add a product. Adding a product twice is a no-op.
    async fn add_to_wishlist(
        &self,
        wishlist_id: WishlistId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError>;

    /// Remove a product. Returns `false` if it was not on the wishlist.
    async fn remove_from_wishlist(
        &self,
        wishlist_id: WishlistId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError>;
}

/// Shipping addresses. Every lookup is scoped to the owning user.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// The user's addresses, default first.
    async fn addresses_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError>;

    /// One of the user's addresses. Another user's address is `None`.
    async fn address(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError>;

    /// Unset `is_default` on all of the user's addresses. Returns the number changed.
    async fn clear_default(&self, user_id: UserId) -> Result<u64, RepositoryError>;

    /// Insert an address.
    ///
    /// Returns `RepositoryError::Conflict` if `is_default` is set while another
    /// default exists (a concurrent default change won the race).
    async fn insert_address(
        &self,
        user_id: UserId,
        fields: &AddressFields,
        is_default: bool,
    ) -> Result<Address, RepositoryError>;

    /// Replace the fields and default flag of one of the user's addresses.
    ///
    /// Returns `None` if the address does not exist or belongs to someone else.
    async fn update_address(
        &self,
        user_id: UserId,
        id: AddressId,
        fields: &AddressFields,
        is_default: bool,
    ) -> Result<Option<Address>, RepositoryError>;

    /// Set `is_default` on one of the user's addresses.
    async fn mark_default(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError>;

    /// Delete one of the user's addresses. Returns `false` if nothing was deleted.
    async fn delete_address(&self, user_id: UserId, id: AddressId)
    -> Result<bool, RepositoryError>;
}

/// Order history.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// The user's orders with their lines, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// One of the user's orders with lines and shipping address.
    async fn order_for_user(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// Everything the storefront persists.
#[async_trait]
pub trait Persistence:
    UserStore + ProductStore + CartStore + WishlistStore + AddressStore + OrderStore
{
    /// Check connectivity for the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// `PostgreSQL` implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (for the session store).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Persistence for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
