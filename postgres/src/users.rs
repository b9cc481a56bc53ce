use crate::rows::{database_error, to_i64};
use sqlx::PgPool;
use subserv_core::providers::{BoxFuture, StoreError, UserDirectory};
use subserv_core::types::UserId;

/// `PostgreSQL` user directory.
#[derive(Clone, Debug)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Create a directory over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserDirectory for PostgresUserDirectory {
    fn exists(&self, id: UserId) -> BoxFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(to_i64(id.value(), "user id")?)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| database_error("Failed to check user", &e))
        })
    }
}
