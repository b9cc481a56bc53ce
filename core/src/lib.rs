//! # Subserv Core
//!
//! Domain types, the subscription lifecycle state machine and the service that
//! orchestrates it with payment capture.
//!
//! ## Layout
//!
//! - [`types`]: identifiers, money, tax rates, versions and the subscription record
//! - [`lifecycle`]: pure guards and transitions (`validate`, `transition`, `apply`)
//! - [`error`]: the [`LifecycleError`] taxonomy returned to callers
//! - [`providers`]: capability traits for storage, catalog, users and payments
//! - [`service`]: [`SubscriptionService`], the read-validate-mutate-write shell
//! - [`environment`]: injected dependencies such as the [`Clock`](environment::Clock)
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Dependency Injection via Environment
//! - Optimistic concurrency at the store boundary
//!
//! ## Example
//!
//! ```ignore
//! use subserv_core::{SubscriptionEnvironment, SubscriptionService};
//!
//! let service = SubscriptionService::new(SubscriptionEnvironment {
//!     clock: Arc::new(SystemClock),
//!     store,
//!     catalog,
//!     users,
//!     payments,
//! });
//!
//! let pending = service.create(product_id, user_id).await?;
//! let receipt = service.purchase(pending.id).await?;
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Duration, Utc};

pub mod error;
pub mod lifecycle;
pub mod providers;
pub mod service;
pub mod types;

pub use error::LifecycleError;
pub use service::{PurchaseReceipt, SubscriptionEnvironment, SubscriptionService};

/// Environment module - Dependency injection traits
///
/// Dependencies are expressed as traits so production, development and test
/// implementations can be swapped without touching the service.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use subserv_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = chrono::Utc::now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
