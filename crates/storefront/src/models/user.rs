//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use blossom_core::{Email, UserId};

/// A storefront customer account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Normalized email address, unique across users.
    pub email: Email,
    /// Avatar URL.
    pub image: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    /// Argon2 PHC string, never the plaintext password.
    pub password_hash: String,
}
