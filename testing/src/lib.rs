//! # Subserv Testing
//!
//! Testing utilities for the subscription service.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - In-memory implementations of every provider trait
//! - A scripted payment processor that records requests
//! - Demo fixtures shared by tests, the in-memory server and the seeder
//! - proptest strategies for domain types
//!
//! The in-memory providers are also what the server runs on when no database
//! is configured.
//!
//! ## Example
//!
//! ```ignore
//! use subserv_testing::{fixtures, test_environment};
//!
//! #[tokio::test]
//! async fn test_purchase_flow() {
//!     let harness = test_environment();
//!     let service = harness.service();
//!
//!     let pending = service.create(fixtures::BASIC_PLAN, fixtures::ALICE).await.unwrap();
//!     let receipt = service.purchase(pending.id).await.unwrap();
//!     assert_eq!(receipt.amount.cents(), 1149);
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use subserv_core::environment::Clock;

pub mod fixtures;
pub mod in_memory;
pub mod payment;

pub use in_memory::{InMemoryProductCatalog, InMemorySubscriptionStore, InMemoryUserDirectory};
pub use payment::ScriptedPaymentProcessor;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Arc, Clock, DateTime, Duration, Mutex, PoisonError, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use subserv_testing::mocks::FixedClock;
    /// use subserv_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can keep a handle while the
    /// service owns another.
    ///
    /// ```
    /// use subserv_testing::mocks::ManualClock;
    /// use subserv_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let start = Utc::now();
    /// let clock = ManualClock::new(start);
    /// clock.advance(Duration::hours(2));
    /// assert_eq!(clock.now(), start + Duration::hours(2));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock stopped at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward by `by`
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities
pub mod helpers {
    use super::Arc;
    use crate::fixtures;
    use crate::in_memory::{InMemoryProductCatalog, InMemorySubscriptionStore, InMemoryUserDirectory};
    use crate::mocks::ManualClock;
    use crate::payment::ScriptedPaymentProcessor;
    use subserv_core::{SubscriptionEnvironment, SubscriptionService};

    /// Handles to every in-memory dependency of a service under test.
    #[derive(Clone)]
    pub struct TestHarness {
        /// Shared manual clock, starting at 2025-01-01 00:00:00 UTC
        pub clock: ManualClock,
        /// Subscription store
        pub store: InMemorySubscriptionStore,
        /// Demo product catalog
        pub catalog: InMemoryProductCatalog,
        /// Demo user directory
        pub users: InMemoryUserDirectory,
        /// Scripted payment processor
        pub payments: Arc<ScriptedPaymentProcessor>,
    }

    impl TestHarness {
        /// Dependencies wired as a [`SubscriptionEnvironment`].
        #[must_use]
        pub fn environment(&self) -> SubscriptionEnvironment {
            SubscriptionEnvironment {
                clock: Arc::new(self.clock.clone()),
                store: Arc::new(self.store.clone()),
                catalog: Arc::new(self.catalog.clone()),
                users: Arc::new(self.users.clone()),
                payments: self.payments.clone(),
            }
        }

        /// A service over this harness.
        #[must_use]
        pub fn service(&self) -> SubscriptionService {
            SubscriptionService::new(self.environment())
        }
    }

    /// Harness with the demo catalog and users and an approving processor.
    #[must_use]
    pub fn test_environment() -> TestHarness {
        test_environment_with(ScriptedPaymentProcessor::approving())
    }

    /// Harness with the demo catalog and users and the given processor.
    #[must_use]
    pub fn test_environment_with(payments: ScriptedPaymentProcessor) -> TestHarness {
        let start = super::mocks::test_clock();
        TestHarness {
            clock: ManualClock::new(subserv_core::environment::Clock::now(&start)),
            store: InMemorySubscriptionStore::new(),
            catalog: InMemoryProductCatalog::new(fixtures::demo_products()),
            users: InMemoryUserDirectory::from_users(&fixtures::demo_users()),
            payments: Arc::new(payments),
        }
    }

    /// Install a `tracing` subscriber that writes through the test harness.
    ///
    /// Safe to call from every test; only the first call installs.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties;

// Re-export commonly used items
pub use helpers::{TestHarness, init_test_tracing, test_environment, test_environment_with};
pub use mocks::{FixedClock, ManualClock, test_clock};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(test_clock().now());
        let handle = clock.clone();

        handle.advance(Duration::days(3));

        assert_eq!(clock.now(), test_clock().now() + Duration::days(3));
    }
}
