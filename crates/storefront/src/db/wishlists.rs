//! Wishlist queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use blossom_core::{ProductId, UserId, WishlistId};

use super::products::{PRODUCT_SUMMARY_COLUMNS, ProductSummaryRow};
use super::{PgStore, RepositoryError, WishlistStore};
use crate::models::wishlist::{Wishlist, WishlistEntry};

#[derive(sqlx::FromRow)]
struct WishlistEntryRow {
    added_at: DateTime<Utc>,
    #[sqlx(flatten)]
    product: ProductSummaryRow,
}

#[async_trait]
impl WishlistStore for PgStore {
    async fn wishlist_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Wishlist>, RepositoryError> {
        let wishlist_id: Option<WishlistId> =
            sqlx::query_scalar("SELECT id FROM storefront.wishlist WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(wishlist_id) = wishlist_id else {
            return Ok(None);
        };

        let sql = format!(
            r"
            SELECT wi.added_at, {PRODUCT_SUMMARY_COLUMNS}
            FROM storefront.wishlist_item wi
            JOIN storefront.product p ON p.id = wi.product_id
            WHERE wi.wishlist_id = $1
            ORDER BY wi.added_at DESC
            "
        );
        let items = sqlx::query_as::<_, WishlistEntryRow>(&sql)
            .bind(wishlist_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| -> Result<WishlistEntry, RepositoryError> {
                Ok(WishlistEntry {
                    product: row.product.try_into()?,
                    added_at: row.added_at,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Wishlist {
            id: wishlist_id,
            items,
        }))
    }

    async fn create_wishlist(&self, user_id: UserId) -> Result<WishlistId, RepositoryError> {
        let id = sqlx::query_scalar(
            r"
            INSERT INTO storefront.wishlist (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id
            ",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn add_to_wishlist(
        &self,
        wishlist_id: WishlistId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.wishlist_item (wishlist_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(wishlist_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_from_wishlist(
        &self,
        wishlist_id: WishlistId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storefront.wishlist_item WHERE wishlist_id = $1 AND product_id = $2",
        )
        .bind(wishlist_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
