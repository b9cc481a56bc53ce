//! Capability traits consumed by the lifecycle service.
//!
//! Each dependency is one trait so it can be injected as `Arc<dyn _>`:
//!
//! - [`SubscriptionStore`]: persistence of subscription records
//! - [`ProductCatalog`]: read-only product lookup
//! - [`UserDirectory`]: user existence check
//! - [`PaymentProcessor`]: charge capture
//!
//! # Implementations
//!
//! - `PostgresSubscriptionStore` and friends (in `subserv-postgres`): production
//! - `InMemorySubscriptionStore` and friends (in `subserv-testing`): tests and development
//! - [`SimulatedPaymentProcessor`]: development payment processor
//!
//! # Dyn Compatibility
//!
//! The traits return `Pin<Box<dyn Future>>` instead of using `async fn` so that
//! they can be used as trait objects.

mod catalog;
mod payment;
mod store;
mod users;

pub use catalog::ProductCatalog;
pub use payment::{
    ChargeOutcome, ChargeRequest, PaymentError, PaymentProcessor, SimulatedPaymentProcessor,
};
pub use store::SubscriptionStore;
pub use users::UserDirectory;

use crate::types::Version;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by the capability traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur in storage-backed providers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("Record not found")]
    NotFound,

    /// Optimistic concurrency conflict: the stored version moved on since the
    /// record was read.
    #[error("Concurrency conflict: expected version {expected}, found {actual}")]
    Conflict {
        /// The version the caller read.
        expected: Version,
        /// The version currently stored.
        actual: Version,
    },

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(String),
}
