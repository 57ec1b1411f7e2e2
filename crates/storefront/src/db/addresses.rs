//! Address queries.
//!
//! Every statement filters on `user_id`, so a foreign address behaves exactly
//! like a missing one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use blossom_core::{AddressId, UserId};

use super::{AddressStore, PgStore, RepositoryError};
use crate::models::address::{Address, AddressFields};

pub(super) const ADDRESS_COLUMNS: &str =
    "id, user_id, street, city, state, postal_code, country, is_default, created_at, updated_at";

const DEFAULT_TAKEN: &str = "another default address was set concurrently";

#[derive(sqlx::FromRow)]
pub(super) struct AddressRow {
    id: AddressId,
    user_id: UserId,
    street: String,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            street: row.street,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            country: row.country,
            is_default: row.is_default,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl AddressStore for PgStore {
    async fn addresses_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ADDRESS_COLUMNS}
            FROM storefront.address
            WHERE user_id = $1
            ORDER BY is_default DESC, created_at DESC, id DESC
            "
        );
        let rows = sqlx::query_as::<_, AddressRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Address::from).collect())
    }

    async fn address(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM storefront.address WHERE id = $1 AND user_id = $2"
        );
        let row = sqlx::query_as::<_, AddressRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Address::from))
    }

    async fn clear_default(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.address
            SET is_default = FALSE, updated_at = NOW()
            WHERE user_id = $1 AND is_default
            ",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_address(
        &self,
        user_id: UserId,
        fields: &AddressFields,
        is_default: bool,
    ) -> Result<Address, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO storefront.address
                (user_id, street, city, state, postal_code, country, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ADDRESS_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, AddressRow>(&sql)
            .bind(user_id)
            .bind(fields.street())
            .bind(fields.city())
            .bind(fields.state())
            .bind(fields.postal_code())
            .bind(fields.country())
            .bind(is_default)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, DEFAULT_TAKEN))?;

        Ok(row.into())
    }

    async fn update_address(
        &self,
        user_id: UserId,
        id: AddressId,
        fields: &AddressFields,
        is_default: bool,
    ) -> Result<Option<Address>, RepositoryError> {
        let sql = format!(
            r"
            UPDATE storefront.address
            SET street = $3, city = $4, state = $5, postal_code = $6, country = $7,
                is_default = $8, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {ADDRESS_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, AddressRow>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(fields.street())
            .bind(fields.city())
            .bind(fields.state())
            .bind(fields.postal_code())
            .bind(fields.country())
            .bind(is_default)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, DEFAULT_TAKEN))?;

        Ok(row.map(Address::from))
    }

    async fn mark_default(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let sql = format!(
            r"
            UPDATE storefront.address
            SET is_default = TRUE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {ADDRESS_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, AddressRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, DEFAULT_TAKEN))?;

        Ok(row.map(Address::from))
    }

    async fn delete_address(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.address WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
