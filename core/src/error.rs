//! Error taxonomy of the lifecycle service.
//!
//! Domain outcomes stay distinct enum variants all the way to the transport
//! layer. Infrastructure failures are wrapped with a context message and keep
//! their source.

use crate::providers::{PaymentError, StoreError};
use crate::types::{ProductId, SubscriptionId, SubscriptionState, UserId, Version};
use thiserror::Error;

/// Errors returned by [`SubscriptionService`](crate::SubscriptionService) operations.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The user does not exist.
    #[error("User with id {0} not found")]
    UserNotFound(UserId),

    /// The product does not exist.
    #[error("Product with id {0} not found")]
    ProductNotFound(ProductId),

    /// The subscription does not exist.
    #[error("Subscription with id {0} not found")]
    SubscriptionNotFound(SubscriptionId),

    /// The operation is not allowed from the subscription's current state.
    #[error("forbidden action at this state: {0}")]
    InvalidState(SubscriptionState),

    /// Pause requested on a subscription that is already paused.
    #[error("forbidden action at this state: subscription already paused")]
    AlreadyPaused,

    /// Operation requested on a cancelled subscription.
    #[error("forbidden action at this state: subscription already cancelled")]
    AlreadyCancelled,

    /// Unpause requested on a subscription that is already active.
    #[error("forbidden action at this state: subscription already active")]
    AlreadyActive,

    /// The subscription's validity window has elapsed.
    #[error("forbidden action at this state: subscription already expired")]
    AlreadyExpired,

    /// Purchase requested on a subscription that is not pending.
    #[error("no pending payment for this subscription")]
    NoPendingPayment,

    /// The payment processor declined the charge.
    #[error("payment failed: {reason}")]
    FailedPayment {
        /// Decline reason reported by the processor
        reason: String,
    },

    /// A paused subscription has no pause timestamp.
    #[error("subscription {0} is paused without a pause timestamp")]
    MissingPauseTimestamp(SubscriptionId),

    /// The product's billing period does not fit in the supported time range.
    #[error("product {0} has a billing period outside the supported range")]
    InvalidProductDuration(ProductId),

    /// Moving the subscription's window would leave the supported time range.
    #[error("subscription {0} window would exceed the supported time range")]
    WindowOutOfRange(SubscriptionId),

    /// Another operation saved the subscription between our read and write.
    #[error("subscription {id} was modified concurrently: expected version {expected}, found {actual}")]
    ConcurrentModification {
        /// The contended subscription
        id: SubscriptionId,
        /// Version that was read
        expected: Version,
        /// Version found at write time
        actual: Version,
    },

    /// Storage failure.
    #[error("{context}")]
    Store {
        /// What the service was doing
        context: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Payment processor infrastructure failure.
    #[error("{context}")]
    Payment {
        /// What the service was doing
        context: String,
        /// Underlying processor error
        #[source]
        source: PaymentError,
    },
}

impl LifecycleError {
    /// Returns `true` for the invalid-state family: `InvalidState` and the
    /// `Already*` variants.
    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            Self::InvalidState(_)
                | Self::AlreadyPaused
                | Self::AlreadyCancelled
                | Self::AlreadyActive
                | Self::AlreadyExpired
        )
    }

    /// Returns `true` for the not-found family.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_) | Self::ProductNotFound(_) | Self::SubscriptionNotFound(_)
        )
    }

    pub(crate) fn store(context: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn payment(context: impl Into<String>, source: PaymentError) -> Self {
        Self::Payment {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_variants_belong_to_invalid_state_family() {
        let family = [
            LifecycleError::InvalidState(SubscriptionState::Expired),
            LifecycleError::AlreadyPaused,
            LifecycleError::AlreadyCancelled,
            LifecycleError::AlreadyActive,
            LifecycleError::AlreadyExpired,
        ];
        assert!(family.iter().all(LifecycleError::is_invalid_state));

        assert!(!LifecycleError::NoPendingPayment.is_invalid_state());
        assert!(!LifecycleError::SubscriptionNotFound(SubscriptionId::new(1)).is_invalid_state());
    }

    #[test]
    fn wrapped_failures_keep_their_source() {
        let err = LifecycleError::store("failed to load subscription 4", StoreError::Database("boom".into()));

        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(err.to_string(), "failed to load subscription 4");
        assert_eq!(source.as_deref(), Some("Database error: boom"));
    }
}
