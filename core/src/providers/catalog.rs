use super::{BoxFuture, StoreError};
use crate::types::{Product, ProductId};

/// Read-only access to the product catalog.
pub trait ProductCatalog: Send + Sync {
    /// Look up a product by id. Returns `Ok(None)` for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns `Database` on storage failure.
    fn get(&self, id: ProductId) -> BoxFuture<'_, Result<Option<Product>, StoreError>>;

    /// All products, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `Database` on storage failure.
    fn list(&self) -> BoxFuture<'_, Result<Vec<Product>, StoreError>>;
}
