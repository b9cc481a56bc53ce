use crate::rows::{PRODUCT_COLUMNS, ProductRow, database_error, to_i64};
use sqlx::PgPool;
use subserv_core::providers::{BoxFuture, ProductCatalog, StoreError};
use subserv_core::types::{Product, ProductId};

/// `PostgreSQL` product catalog.
#[derive(Clone, Debug)]
pub struct PostgresProductCatalog {
    pool: PgPool,
}

impl PostgresProductCatalog {
    /// Create a catalog over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ProductCatalog for PostgresProductCatalog {
    fn get(&self, id: ProductId) -> BoxFuture<'_, Result<Option<Product>, StoreError>> {
        Box::pin(async move {
            let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
            let row: Option<ProductRow> = sqlx::query_as(&sql)
                .bind(to_i64(id.value(), "product id")?)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| database_error("Failed to get product", &e))?;
            row.map(Product::try_from).transpose()
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<Product>, StoreError>> {
        Box::pin(async move {
            let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id");
            let rows: Vec<ProductRow> = sqlx::query_as(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| database_error("Failed to list products", &e))?;
            rows.into_iter().map(Product::try_from).collect()
        })
    }
}
