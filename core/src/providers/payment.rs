//! Payment capture capability and a simulated processor for development.

use super::BoxFuture;
use crate::types::{Money, SubscriptionId, UserId};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

/// A request to charge a user for one subscription period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    /// User being charged
    pub user_id: UserId,
    /// Subscription the charge pays for
    pub subscription_id: SubscriptionId,
    /// Gross amount (price plus tax)
    pub amount: Money,
    /// Key identifying this charge attempt; processors that honour keys
    /// collapse duplicate requests into one charge.
    pub idempotency_key: String,
}

/// Result of a charge the processor was able to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// Money was captured.
    Approved {
        /// Processor transaction identifier
        transaction_id: String,
    },
    /// The processor refused the charge.
    Declined {
        /// Human-readable decline reason
        reason: String,
    },
}

/// Infrastructure fault while talking to a payment processor.
///
/// Never used for declines, which are a normal [`ChargeOutcome`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// The processor could not be reached.
    #[error("Payment processor unavailable: {0}")]
    Unavailable(String),

    /// The processor did not answer in time.
    #[error("Payment processor timed out")]
    Timeout,

    /// The processor answered with something unusable.
    #[error("Invalid processor response: {0}")]
    InvalidResponse(String),
}

/// Payment processor trait
///
/// Abstraction over payment processors. The core calls [`charge`] once per
/// purchase and never retries.
///
/// [`charge`]: PaymentProcessor::charge
pub trait PaymentProcessor: Send + Sync {
    /// Attempt to capture `request.amount`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] on infrastructure faults. A refused charge is
    /// `Ok(ChargeOutcome::Declined { .. })`.
    fn charge(&self, request: ChargeRequest) -> BoxFuture<'_, Result<ChargeOutcome, PaymentError>>;
}

/// Development payment processor that approves a configurable share of charges.
///
/// Transaction ids are `tx-1`, `tx-2`, ... in issue order.
#[derive(Debug)]
pub struct SimulatedPaymentProcessor {
    success_rate: f64,
    latency: Duration,
    next_tx: AtomicU64,
}

impl SimulatedPaymentProcessor {
    /// Share of charges approved when no rate is configured.
    pub const DEFAULT_SUCCESS_RATE: f64 = 0.95;

    /// Creates a processor approving `success_rate` of charges, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn new(success_rate: f64) -> Self {
        let success_rate = if success_rate.is_nan() {
            0.0
        } else {
            success_rate.clamp(0.0, 1.0)
        };
        Self {
            success_rate,
            latency: Duration::ZERO,
            next_tx: AtomicU64::new(1),
        }
    }

    /// Simulate network delay on every charge.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The effective approval probability.
    #[must_use]
    pub const fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

impl Default for SimulatedPaymentProcessor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SUCCESS_RATE)
    }
}

impl PaymentProcessor for SimulatedPaymentProcessor {
    fn charge(&self, request: ChargeRequest) -> BoxFuture<'_, Result<ChargeOutcome, PaymentError>> {
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }

            let approved = rand::thread_rng().gen_bool(self.success_rate);
            if !approved {
                tracing::info!(
                    subscription_id = %request.subscription_id,
                    amount = request.amount.cents(),
                    "Simulated payment declined"
                );
                return Ok(ChargeOutcome::Declined {
                    reason: "payment failed".to_string(),
                });
            }

            let transaction_id = format!("tx-{}", self.next_tx.fetch_add(1, Ordering::Relaxed));
            tracing::info!(
                subscription_id = %request.subscription_id,
                amount = request.amount.cents(),
                transaction_id = %transaction_id,
                "Simulated payment processed successfully"
            );
            Ok(ChargeOutcome::Approved { transaction_id })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> ChargeRequest {
        ChargeRequest {
            user_id: UserId::new(1),
            subscription_id: SubscriptionId::new(7),
            amount: Money::from_cents(1149),
            idempotency_key: "subscription-7-v0".to_string(),
        }
    }

    #[tokio::test]
    async fn always_approves_at_full_rate() {
        let processor = SimulatedPaymentProcessor::new(1.0);

        let first = processor.charge(request()).await.unwrap();
        let second = processor.charge(request()).await.unwrap();

        assert_eq!(
            first,
            ChargeOutcome::Approved {
                transaction_id: "tx-1".to_string()
            }
        );
        assert_eq!(
            second,
            ChargeOutcome::Approved {
                transaction_id: "tx-2".to_string()
            }
        );
    }

    #[tokio::test]
    async fn always_declines_at_zero_rate() {
        let processor = SimulatedPaymentProcessor::new(0.0);

        let outcome = processor.charge(request()).await.unwrap();

        assert!(matches!(outcome, ChargeOutcome::Declined { .. }));
    }

    #[test]
    fn out_of_range_rates_are_clamped() {
        assert!((SimulatedPaymentProcessor::new(3.0).success_rate() - 1.0).abs() < f64::EPSILON);
        assert!(SimulatedPaymentProcessor::new(-1.0).success_rate().abs() < f64::EPSILON);
        assert!(SimulatedPaymentProcessor::new(f64::NAN).success_rate().abs() < f64::EPSILON);
    }
}
