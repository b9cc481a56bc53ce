//! `PostgreSQL` providers for subserv.
//!
//! This crate implements the capability traits from `subserv-core` on top of
//! sqlx:
//!
//! - [`PostgresSubscriptionStore`]: subscription records with optimistic
//!   concurrency (`UPDATE ... WHERE version = $n`)
//! - [`PostgresProductCatalog`]: product lookup and listing
//! - [`PostgresUserDirectory`]: user existence check
//! - [`seed_demo_data`]: idempotent insertion of demo products and users
//!
//! # Example
//!
//! ```no_run
//! use subserv_postgres::{PostgresSubscriptionStore, connect, migrate};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = connect("postgres://localhost/subserv", 10, Duration::from_secs(5)).await?;
//! migrate(&pool).await?;
//! let store = PostgresSubscriptionStore::new(pool);
//! # Ok(())
//! # }
//! ```

mod catalog;
mod rows;
mod seed;
mod store;
mod users;

pub use catalog::PostgresProductCatalog;
pub use seed::{SeedReport, seed_demo_data};
pub use store::PostgresSubscriptionStore;
pub use users::PostgresUserDirectory;

pub use sqlx::PgPool;

use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use subserv_core::providers::StoreError;

/// Open a connection pool.
///
/// # Errors
///
/// Returns `Database` if no connection could be established within
/// `connect_timeout`.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    connect_timeout: Duration,
) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(connect_timeout)
        .connect(database_url)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))
}

/// Run database migrations.
///
/// # Errors
///
/// Returns `Database` if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}
