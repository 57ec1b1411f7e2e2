//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Storefront schema and the session table
//! blossom-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Storefront migrations live in `crates/storefront/migrations/`. The
//! `tower_sessions` schema is created by the session store itself.

use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

use blossom_storefront::db;

use super::{CommandError, database_url};

/// Run storefront migrations, then the session store migration.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails or
/// a migration fails.
pub async fn storefront() -> Result<(), CommandError> {
    let database_url = database_url()?;

    info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    info!("Running session store migration...");
    PostgresStore::new(pool).migrate().await?;

    info!("Storefront migrations complete");
    Ok(())
}
