//! The subscription lifecycle service.
//!
//! Every mutating operation is read-validate-mutate-write: one store read, the
//! pure guards from [`lifecycle`](crate::lifecycle), and at most one store
//! write. Failure paths never write.

use crate::environment::Clock;
use crate::error::LifecycleError;
use crate::lifecycle::{self, SubscriptionCommand};
use crate::providers::{
    ChargeOutcome, ChargeRequest, PaymentProcessor, ProductCatalog, StoreError, SubscriptionStore,
    UserDirectory,
};
use crate::types::{Money, NewSubscription, ProductId, Subscription, SubscriptionId, UserId};
use std::sync::Arc;

/// Dependencies of the [`SubscriptionService`].
#[derive(Clone)]
pub struct SubscriptionEnvironment {
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Subscription persistence
    pub store: Arc<dyn SubscriptionStore>,
    /// Product lookup
    pub catalog: Arc<dyn ProductCatalog>,
    /// User existence check
    pub users: Arc<dyn UserDirectory>,
    /// Payment capture
    pub payments: Arc<dyn PaymentProcessor>,
}

/// Outcome of a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    /// The activated subscription
    pub subscription: Subscription,
    /// Processor transaction identifier
    pub transaction_id: String,
    /// Gross amount charged
    pub amount: Money,
}

/// Owns subscription state transitions and their orchestration with payment
/// capture.
#[derive(Clone)]
pub struct SubscriptionService {
    env: SubscriptionEnvironment,
}

impl SubscriptionService {
    /// Creates a service over the given dependencies.
    #[must_use]
    pub const fn new(env: SubscriptionEnvironment) -> Self {
        Self { env }
    }

    /// The injected dependencies.
    #[must_use]
    pub const fn environment(&self) -> &SubscriptionEnvironment {
        &self.env
    }

    /// Load a subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound`: unknown id
    /// - `Store`: storage failure
    #[tracing::instrument(skip(self), fields(subscription_id = %id))]
    pub async fn get(&self, id: SubscriptionId) -> Result<Subscription, LifecycleError> {
        self.env.store.get(id).await.map_err(|e| match e {
            StoreError::NotFound => LifecycleError::SubscriptionNotFound(id),
            other => LifecycleError::store(format!("failed to fetch subscription {id}"), other),
        })
    }

    /// Create a pending subscription of `user_id` to `product_id`.
    ///
    /// The window starts now and lasts one product duration; price and tax are
    /// copied from the product.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` / `ProductNotFound`: unknown user or product
    /// - `InvalidProductDuration`: the product's billing period is unusable
    /// - `Store`: storage failure
    #[tracing::instrument(skip(self), fields(product_id = %product_id, user_id = %user_id))]
    pub async fn create(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<Subscription, LifecycleError> {
        let exists = self
            .env
            .users
            .exists(user_id)
            .await
            .map_err(|e| LifecycleError::store("failed to check user existence", e))?;
        if !exists {
            return Err(LifecycleError::UserNotFound(user_id));
        }

        let product = self
            .env
            .catalog
            .get(product_id)
            .await
            .map_err(|e| LifecycleError::store(format!("failed to fetch product {product_id}"), e))?
            .ok_or(LifecycleError::ProductNotFound(product_id))?;

        let draft = NewSubscription::pending(&product, user_id, self.env.clock.now())
            .ok_or(LifecycleError::InvalidProductDuration(product_id))?;
        let subscription = self
            .env
            .store
            .create(draft)
            .await
            .map_err(|e| LifecycleError::store("failed to create subscription", e))?;

        tracing::info!(
            subscription_id = %subscription.id,
            price = subscription.price.cents(),
            tax_rate = subscription.tax_rate.percent(),
            "Subscription created"
        );
        metrics::counter!("subserv.subscriptions.created").increment(1);

        Ok(subscription)
    }

    /// Charge for a pending subscription and activate it.
    ///
    /// On approval the window is rebased to start now, keeping its length.
    /// Declines and processor faults leave the record untouched.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound`: unknown id
    /// - `NoPendingPayment`: the subscription is not pending
    /// - `FailedPayment`: the processor declined
    /// - `Payment`: processor infrastructure fault
    /// - `ConcurrentModification`: the record changed while charging
    /// - `WindowOutOfRange`: the rebased window end is not representable
    /// - `Store`: storage failure
    #[tracing::instrument(skip(self), fields(subscription_id = %id))]
    pub async fn purchase(&self, id: SubscriptionId) -> Result<PurchaseReceipt, LifecycleError> {
        let mut subscription = self.get(id).await?;
        lifecycle::validate(&subscription, SubscriptionCommand::Purchase, self.env.clock.now())
            .inspect_err(|e| reject(SubscriptionCommand::Purchase, e))?;

        let amount = subscription.charge_amount();
        let request = ChargeRequest {
            user_id: subscription.user_id,
            subscription_id: id,
            amount,
            idempotency_key: format!("subscription-{id}-v{}", subscription.version),
        };

        let transaction_id = match self.env.payments.charge(request).await {
            Ok(ChargeOutcome::Approved { transaction_id }) => {
                metrics::counter!("subserv.charges", "outcome" => "approved").increment(1);
                transaction_id
            }
            Ok(ChargeOutcome::Declined { reason }) => {
                metrics::counter!("subserv.charges", "outcome" => "declined").increment(1);
                tracing::warn!(amount = amount.cents(), reason = %reason, "Payment declined");
                return Err(LifecycleError::FailedPayment { reason });
            }
            Err(e) => {
                metrics::counter!("subserv.charges", "outcome" => "error").increment(1);
                tracing::error!(amount = amount.cents(), error = %e, "Payment processor failure");
                return Err(LifecycleError::payment("an error occurred in payment", e));
            }
        };

        let event = lifecycle::transition(&subscription, SubscriptionCommand::Purchase, self.env.clock.now())?;
        subscription.apply(&event);

        let subscription = self
            .persist(subscription, SubscriptionCommand::Purchase)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    transaction_id = %transaction_id,
                    amount = amount.cents(),
                    error = %e,
                    "Payment captured but activation was not saved"
                );
            })?;

        Ok(PurchaseReceipt {
            subscription,
            transaction_id,
            amount,
        })
    }

    /// Pause an active subscription.
    ///
    /// # Errors
    ///
    /// `AlreadyPaused`, `AlreadyExpired` or `InvalidState` when the guards
    /// fail, plus the lookup and save errors of [`get`](Self::get).
    pub async fn pause(&self, id: SubscriptionId) -> Result<Subscription, LifecycleError> {
        self.execute(id, SubscriptionCommand::Pause).await
    }

    /// Resume a paused subscription, extending its end by the paused time.
    ///
    /// # Errors
    ///
    /// `AlreadyActive`, `InvalidState` or `MissingPauseTimestamp`, plus the
    /// lookup and save errors of [`get`](Self::get).
    pub async fn unpause(&self, id: SubscriptionId) -> Result<Subscription, LifecycleError> {
        self.execute(id, SubscriptionCommand::Unpause).await
    }

    /// Cancel a subscription, ending its window now.
    ///
    /// # Errors
    ///
    /// `AlreadyCancelled`, `AlreadyExpired` or `InvalidState`, plus the lookup
    /// and save errors of [`get`](Self::get).
    pub async fn cancel(&self, id: SubscriptionId) -> Result<Subscription, LifecycleError> {
        self.execute(id, SubscriptionCommand::Cancel).await
    }

    #[tracing::instrument(skip(self), fields(subscription_id = %id, command = %command))]
    async fn execute(
        &self,
        id: SubscriptionId,
        command: SubscriptionCommand,
    ) -> Result<Subscription, LifecycleError> {
        let mut subscription = self.get(id).await?;

        let event = lifecycle::transition(&subscription, command, self.env.clock.now())
            .inspect_err(|e| reject(command, e))?;
        subscription.apply(&event);

        self.persist(subscription, command).await
    }

    async fn persist(
        &self,
        subscription: Subscription,
        command: SubscriptionCommand,
    ) -> Result<Subscription, LifecycleError> {
        let id = subscription.id;
        let from = subscription.version;

        let saved = self.env.store.save(subscription).await.map_err(|e| match e {
            StoreError::Conflict { expected, actual } => {
                tracing::warn!(%expected, %actual, "Concurrent modification detected");
                LifecycleError::ConcurrentModification { id, expected, actual }
            }
            StoreError::NotFound => LifecycleError::SubscriptionNotFound(id),
            other => LifecycleError::store(format!("failed to {command} subscription {id}"), other),
        })?;

        tracing::info!(
            state = %saved.state,
            version = %saved.version,
            previous_version = %from,
            "Subscription transitioned"
        );
        metrics::counter!("subserv.transitions", "command" => command.as_str(), "state" => saved.state.as_str())
            .increment(1);

        Ok(saved)
    }
}

fn reject(command: SubscriptionCommand, error: &LifecycleError) {
    tracing::debug!(error = %error, "{command} rejected");
    metrics::counter!("subserv.transitions.rejected", "command" => command.as_str()).increment(1);
}
