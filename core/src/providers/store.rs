use super::{BoxFuture, StoreError};
use crate::types::{NewSubscription, Subscription, SubscriptionId};

/// Persistence of subscription records.
///
/// The store exclusively owns persisted records. Callers hold a transient copy
/// for the duration of one operation and write it back with [`save`], which
/// enforces optimistic concurrency on [`Subscription::version`].
///
/// Records are never deleted.
///
/// [`save`]: SubscriptionStore::save
pub trait SubscriptionStore: Send + Sync {
    /// Load a subscription by id.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no record with this id
    /// - `Database`: storage failure
    fn get(&self, id: SubscriptionId) -> BoxFuture<'_, Result<Subscription, StoreError>>;

    /// Persist a new pending subscription, assigning its id and initial version.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the record could not be written.
    fn create(&self, draft: NewSubscription) -> BoxFuture<'_, Result<Subscription, StoreError>>;

    /// Write back a modified subscription.
    ///
    /// Succeeds only if the stored version equals `subscription.version`; the
    /// returned record carries the bumped version.
    ///
    /// # Errors
    ///
    /// - `Conflict`: the record was modified since it was read
    /// - `NotFound`: no record with this id
    /// - `Database`: storage failure
    fn save(&self, subscription: Subscription) -> BoxFuture<'_, Result<Subscription, StoreError>>;
}
