//! Scripted payment processor for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use subserv_core::providers::{
    BoxFuture, ChargeOutcome, ChargeRequest, PaymentError, PaymentProcessor,
};

type ScriptedResult = Result<ChargeOutcome, PaymentError>;

#[derive(Debug, Clone)]
enum Fallback {
    Approve,
    Decline(String),
    Fail(PaymentError),
}

/// Payment processor whose answers are set up by the test.
///
/// Queued results from [`then`](Self::then) are consumed first, in order;
/// afterwards every charge gets the fallback chosen at construction.
/// Approvals without a scripted transaction id get `tx-1`, `tx-2`, ...
///
/// Requests are recorded, and a repeated idempotency key is answered with the
/// first result for that key without producing a new charge.
#[derive(Debug)]
pub struct ScriptedPaymentProcessor {
    fallback: Fallback,
    script: Mutex<VecDeque<ScriptedResult>>,
    requests: Mutex<Vec<ChargeRequest>>,
    settled: Mutex<HashMap<String, ScriptedResult>>,
    latency: Duration,
    next_tx: AtomicU64,
}

impl ScriptedPaymentProcessor {
    fn with_fallback(fallback: Fallback) -> Self {
        Self {
            fallback,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            settled: Mutex::new(HashMap::new()),
            latency: Duration::ZERO,
            next_tx: AtomicU64::new(1),
        }
    }

    /// Approves every charge.
    #[must_use]
    pub fn approving() -> Self {
        Self::with_fallback(Fallback::Approve)
    }

    /// Declines every charge with `reason`.
    #[must_use]
    pub fn declining(reason: impl Into<String>) -> Self {
        Self::with_fallback(Fallback::Decline(reason.into()))
    }

    /// Fails every charge with an infrastructure error.
    #[must_use]
    pub fn failing(error: PaymentError) -> Self {
        Self::with_fallback(Fallback::Fail(error))
    }

    /// Queue a result for the next unscripted charge.
    #[must_use]
    pub fn then(self, result: ScriptedResult) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
        self
    }

    /// Delay every answer, keeping concurrent charges in flight together.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every request received, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<ChargeRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of distinct idempotency keys that ended up approved.
    #[must_use]
    pub fn captured_count(&self) -> usize {
        self.settled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|r| matches!(r, Ok(ChargeOutcome::Approved { .. })))
            .count()
    }

    fn decide(&self, request: &ChargeRequest) -> ScriptedResult {
        let mut settled = self.settled.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = settled.get(&request.idempotency_key) {
            return previous.clone();
        }

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let result = scripted.unwrap_or_else(|| match &self.fallback {
            Fallback::Approve => Ok(ChargeOutcome::Approved {
                transaction_id: format!("tx-{}", self.next_tx.fetch_add(1, Ordering::SeqCst)),
            }),
            Fallback::Decline(reason) => Ok(ChargeOutcome::Declined {
                reason: reason.clone(),
            }),
            Fallback::Fail(error) => Err(error.clone()),
        });

        settled.insert(request.idempotency_key.clone(), result.clone());
        result
    }
}

impl PaymentProcessor for ScriptedPaymentProcessor {
    fn charge(&self, request: ChargeRequest) -> BoxFuture<'_, Result<ChargeOutcome, PaymentError>> {
        Box::pin(async move {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            let result = self.decide(&request);

            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            result
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use subserv_core::types::{Money, SubscriptionId, UserId};

    fn request(key: &str) -> ChargeRequest {
        ChargeRequest {
            user_id: UserId::new(1),
            subscription_id: SubscriptionId::new(1),
            amount: Money::from_cents(100),
            idempotency_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn script_runs_before_fallback() {
        let processor = ScriptedPaymentProcessor::approving().then(Ok(ChargeOutcome::Declined {
            reason: "insufficient funds".to_string(),
        }));

        let first = processor.charge(request("a")).await.unwrap();
        let second = processor.charge(request("b")).await.unwrap();

        assert!(matches!(first, ChargeOutcome::Declined { .. }));
        assert_eq!(
            second,
            ChargeOutcome::Approved {
                transaction_id: "tx-1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn repeated_key_does_not_charge_twice() {
        let processor = ScriptedPaymentProcessor::approving();

        let first = processor.charge(request("same")).await.unwrap();
        let second = processor.charge(request("same")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(processor.requests().len(), 2);
        assert_eq!(processor.captured_count(), 1);
    }

    #[tokio::test]
    async fn failing_processor_reports_infrastructure_error() {
        let processor = ScriptedPaymentProcessor::failing(PaymentError::Timeout);

        assert_eq!(processor.charge(request("x")).await, Err(PaymentError::Timeout));
        assert_eq!(processor.captured_count(), 0);
    }
}
