//! Persisted cart queries.

use async_trait::async_trait;

use blossom_core::{CartId, CartItemId, ProductId, Quantity, UserId};

use super::products::{PRODUCT_SUMMARY_COLUMNS, ProductSummaryRow};
use super::{CartStore, PgStore, RepositoryError};
use crate::models::cart::{Cart, CartLine};

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: CartItemId,
    quantity: Quantity,
    #[sqlx(flatten)]
    product: ProductSummaryRow,
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let cart_id: Option<CartId> =
            sqlx::query_scalar("SELECT id FROM storefront.cart WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(cart_id) = cart_id else {
            return Ok(None);
        };

        let sql = format!(
            r"
            SELECT ci.id, ci.quantity, {PRODUCT_SUMMARY_COLUMNS}
            FROM storefront.cart_item ci
            JOIN storefront.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            "
        );
        let items = sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(cart_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| -> Result<CartLine, RepositoryError> {
                Ok(CartLine {
                    id: row.id,
                    quantity: row.quantity,
                    product: row.product.try_into()?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Cart { id: cart_id, items }))
    }

    async fn create_cart(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let id = sqlx::query_scalar(
            r"
            INSERT INTO storefront.cart (user_id)
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

    async fn add_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, RepositoryError> {
        let total = sqlx::query_scalar(
            r"
            INSERT INTO storefront.cart_item (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = LEAST(
                storefront.cart_item.quantity::bigint + EXCLUDED.quantity,
                2147483647
            )::integer
            RETURNING quantity
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn set_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.cart_item SET quantity = $3 WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM storefront.cart_item WHERE cart_id = $1 AND product_id = $2")
                .bind(cart_id)
                .bind(product_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
