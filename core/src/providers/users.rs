use super::{BoxFuture, StoreError};
use crate::types::UserId;

/// User existence check.
pub trait UserDirectory: Send + Sync {
    /// Returns whether a user with this id exists.
    ///
    /// # Errors
    ///
    /// Returns `Database` on storage failure.
    fn exists(&self, id: UserId) -> BoxFuture<'_, Result<bool, StoreError>>;
}
