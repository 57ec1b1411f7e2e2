//! User repository for database operations.
//!
//! Accounts, Argon2 password hashes and password reset tokens. Queries are
//! checked at runtime with `sqlx::query_as` against the row structs below.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use blossom_core::{Email, UserId};

use super::{PgStore, RepositoryError, UserStore};
use crate::models::user::{NewUser, User};

const USER_COLUMNS: &str = "id, name, email, image, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[async_trait]
impl UserStore for PgStore {
    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM storefront.user WHERE email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn user_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPasswordRow>(
            r"
            SELECT u.id, u.name, u.email, u.image, u.created_at, u.updated_at,
                   p.password_hash
            FROM storefront.user u
            JOIN storefront.user_password p ON p.user_id = u.id
            WHERE u.email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| User::try_from(r.user).map(|user| (user, r.password_hash)))
            .transpose()
    }

    async fn register_user(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO storefront.user (name, email) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        );
        let user: User = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&new_user.name)
            .bind(new_user.email.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "email already exists"))?
            .try_into()?;

        sqlx::query(
            "INSERT INTO storefront.user_password (user_id, password_hash) VALUES ($1, $2)",
        )
        .bind(user.id)
        .bind(&new_user.password_hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO storefront.cart (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO storefront.wishlist (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(user)
    }

    async fn update_profile(
        &self,
        id: UserId,
        name: Option<&str>,
        email: Option<&Email>,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            r"
            UPDATE storefront.user
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(name)
            .bind(email.map(Email::as_str))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "email already exists"))?
            .ok_or(RepositoryError::NotFound)?
            .try_into()
    }

    async fn store_reset_token(
        &self,
        id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.user
            SET reset_token_hash = $2, reset_token_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn reset_password(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<UserId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Clearing the digest in the same statement makes the token single-use.
        let user_id: Option<UserId> = sqlx::query_scalar(
            r"
            UPDATE storefront.user
            SET reset_token_hash = NULL, reset_token_expires_at = NULL, updated_at = NOW()
            WHERE reset_token_hash = $1 AND reset_token_expires_at > $2
            RETURNING id
            ",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Ok(None);
        };

        sqlx::query(
            r"
            INSERT INTO storefront.user_password (user_id, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET password_hash = EXCLUDED.password_hash, updated_at = NOW()
            ",
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(user_id))
    }
}
