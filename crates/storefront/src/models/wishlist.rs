//! Wishlist types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use blossom_core::WishlistId;

use super::product::ProductSummary;

/// A user's saved products.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    pub id: WishlistId,
    /// Most recently added first.
    pub items: Vec<WishlistEntry>,
}

/// One saved product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub product: ProductSummary,
    pub added_at: DateTime<Utc>,
}
