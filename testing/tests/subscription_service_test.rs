//! Service-level tests over the in-memory providers.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Duration;
use std::sync::Arc;
use subserv_core::LifecycleError;
use subserv_core::environment::Clock;
use subserv_core::providers::{ChargeOutcome, PaymentError, StoreError};
use subserv_core::types::{ProductId, SubscriptionId, SubscriptionState, UserId, Version};
use subserv_testing::{
    ScriptedPaymentProcessor, fixtures, init_test_tracing, test_environment, test_environment_with,
};

#[tokio::test]
async fn create_snapshots_product_terms() {
    init_test_tracing();
    let harness = test_environment();
    let service = harness.service();
    let now = harness.clock.now();

    let created = service.create(fixtures::BASIC_PLAN, fixtures::ALICE).await.unwrap();

    assert_eq!(created.state, SubscriptionState::Pending);
    assert_eq!(created.user_id, fixtures::ALICE);
    assert_eq!(created.start, now);
    assert_eq!(created.end - created.start, fixtures::billing_period());
    assert_eq!(created.price.cents(), 999);
    assert_eq!(created.tax_rate.percent(), 15);
    assert_eq!(harness.store.len(), 1);
}

#[tokio::test]
async fn create_rejects_billing_period_beyond_supported_range() {
    let harness = test_environment();
    let service = harness.service();
    let mut forever = fixtures::product(fixtures::BASIC_PLAN, "Basic Plan", "", 999, 15);
    forever.duration = Duration::days(365 * 300_000);
    harness.catalog.upsert(forever);

    let result = service.create(fixtures::BASIC_PLAN, fixtures::ALICE).await;

    assert!(matches!(
        result,
        Err(LifecycleError::InvalidProductDuration(id)) if id == fixtures::BASIC_PLAN
    ));
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn create_keeps_price_snapshot_after_catalog_change() {
    let harness = test_environment();
    let service = harness.service();
    let created = service.create(fixtures::PRO_PLAN, fixtures::BOB).await.unwrap();

    harness
        .catalog
        .upsert(fixtures::product(fixtures::PRO_PLAN, "Pro Plan", "", 5000, 50));
    let receipt = service.purchase(created.id).await.unwrap();

    // 1999 * 1.05 = 2098.95
    assert_eq!(receipt.amount.cents(), 2099);
    assert_eq!(receipt.subscription.price.cents(), 1999);
}

#[tokio::test]
async fn create_rejects_unknown_user_and_product() {
    let harness = test_environment();
    let service = harness.service();

    let unknown_user = service.create(fixtures::BASIC_PLAN, UserId::new(404)).await;
    let unknown_product = service.create(ProductId::new(404), fixtures::ALICE).await;

    assert!(matches!(unknown_user, Err(LifecycleError::UserNotFound(id)) if id == UserId::new(404)));
    assert!(matches!(unknown_product, Err(LifecycleError::ProductNotFound(_))));
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn get_maps_missing_record_and_wraps_store_failures() {
    let harness = test_environment();
    let service = harness.service();

    let missing = service.get(SubscriptionId::new(7)).await;
    assert!(matches!(missing, Err(LifecycleError::SubscriptionNotFound(_))));

    harness.store.fail_with(StoreError::Database("connection refused".into()));
    let failed = service.get(SubscriptionId::new(7)).await.unwrap_err();

    assert!(matches!(
        failed,
        LifecycleError::Store {
            source: StoreError::Database(_),
            ..
        }
    ));
}

#[tokio::test]
async fn purchase_charges_price_plus_tax_and_activates() {
    let harness = test_environment();
    let service = harness.service();
    let created = service.create(fixtures::PREMIUM_PLAN, fixtures::ALICE).await.unwrap();

    harness.clock.advance(Duration::hours(5));
    let receipt = service.purchase(created.id).await.unwrap();

    let activated = &receipt.subscription;
    assert_eq!(receipt.amount.cents(), 11_999);
    assert_eq!(receipt.transaction_id, "tx-1");
    assert_eq!(activated.state, SubscriptionState::Active);
    assert_eq!(activated.start, harness.clock.now());
    assert_eq!(activated.end - activated.start, created.end - created.start);
    assert_eq!(activated.version, Version::new(1));

    let requests = harness.payments.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user_id, fixtures::ALICE);
    assert_eq!(requests[0].subscription_id, created.id);
    assert_eq!(requests[0].idempotency_key, format!("subscription-{}-v0", created.id));
}

#[tokio::test]
async fn declined_purchase_leaves_subscription_pending() {
    let harness = test_environment_with(ScriptedPaymentProcessor::declining("card expired"));
    let service = harness.service();
    let created = service.create(fixtures::BASIC_PLAN, fixtures::ALICE).await.unwrap();

    let err = service.purchase(created.id).await.unwrap_err();

    assert!(matches!(err, LifecycleError::FailedPayment { ref reason } if reason == "card expired"));
    assert_eq!(harness.store.save_count(), 0);
    assert_eq!(harness.store.snapshot(created.id), Some(created));
}

#[tokio::test]
async fn processor_fault_is_not_a_decline() {
    let harness = test_environment_with(ScriptedPaymentProcessor::failing(PaymentError::Unavailable(
        "gateway down".into(),
    )));
    let service = harness.service();
    let created = service.create(fixtures::BASIC_PLAN, fixtures::ALICE).await.unwrap();

    let err = service.purchase(created.id).await.unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::Payment {
            source: PaymentError::Unavailable(_),
            ..
        }
    ));
    assert_eq!(harness.store.save_count(), 0);
}

#[tokio::test]
async fn retried_purchase_replays_the_settled_outcome() {
    let payments = ScriptedPaymentProcessor::approving().then(Ok(ChargeOutcome::Declined {
        reason: "insufficient funds".into(),
    }));
    let harness = test_environment_with(payments);
    let service = harness.service();
    let created = service.create(fixtures::BASIC_PLAN, fixtures::ALICE).await.unwrap();

    assert!(service.purchase(created.id).await.is_err());
    // The record version did not move, so the retry reuses the idempotency key
    // and the processor replays the decline.
    assert!(matches!(
        service.purchase(created.id).await,
        Err(LifecycleError::FailedPayment { .. })
    ));
    assert_eq!(harness.payments.captured_count(), 0);
}

#[tokio::test]
async fn purchase_of_non_pending_subscription_never_saves() {
    let harness = test_environment();
    let service = harness.service();
    let now = harness.clock.now();

    for (id, state) in (1u64..).zip([
        SubscriptionState::Active,
        SubscriptionState::Paused,
        SubscriptionState::Cancelled,
        SubscriptionState::Expired,
        SubscriptionState::Failed,
    ]) {
        harness
            .store
            .insert(fixtures::subscription(id, state, now + Duration::days(10)));

        let err = service.purchase(SubscriptionId::new(id)).await.unwrap_err();
        assert!(matches!(err, LifecycleError::NoPendingPayment), "{state}: {err}");
    }

    assert_eq!(harness.store.save_count(), 0);
    assert!(harness.payments.requests().is_empty());
}

#[tokio::test]
async fn concurrent_purchases_charge_once_and_one_loses() {
    let harness = test_environment_with(
        ScriptedPaymentProcessor::approving().with_latency(std::time::Duration::from_millis(20)),
    );
    let service = harness.service();
    let created = service.create(fixtures::BASIC_PLAN, fixtures::ALICE).await.unwrap();

    let (a, b) = tokio::join!(service.purchase(created.id), service.purchase(created.id));

    let (won, lost) = if a.is_ok() { (a, b) } else { (b, a) };
    assert!(won.is_ok());
    assert!(matches!(
        lost,
        Err(LifecycleError::ConcurrentModification { expected, actual, .. })
            if expected == Version::new(0) && actual == Version::new(1)
    ));
    assert_eq!(harness.payments.requests().len(), 2);
    assert_eq!(harness.payments.captured_count(), 1);
}

#[tokio::test]
async fn pause_and_unpause_preserve_remaining_time() {
    let harness = test_environment();
    let service = harness.service();
    let created = service.create(fixtures::BASIC_PLAN, fixtures::ALICE).await.unwrap();
    let active = service.purchase(created.id).await.unwrap().subscription;

    harness.clock.advance(Duration::days(4));
    let paused = service.pause(active.id).await.unwrap();
    let paused_at = paused.paused_at.unwrap();
    assert_eq!(paused.state, SubscriptionState::Paused);
    assert_eq!(paused_at, harness.clock.now());

    harness.clock.advance(Duration::days(6));
    let resumed = service.unpause(active.id).await.unwrap();

    assert_eq!(resumed.state, SubscriptionState::Active);
    assert_eq!(resumed.paused_at, None);
    assert_eq!(resumed.end - harness.clock.now(), active.end - paused_at);
    assert_eq!(resumed.end, active.end + Duration::days(6));
}

#[tokio::test]
async fn pause_guards() {
    let harness = test_environment();
    let service = harness.service();
    let now = harness.clock.now();
    harness
        .store
        .insert(fixtures::subscription(1, SubscriptionState::Active, now + Duration::hours(1)));
    harness
        .store
        .insert(fixtures::subscription(2, SubscriptionState::Active, now - Duration::hours(1)));
    harness
        .store
        .insert(fixtures::subscription(3, SubscriptionState::Paused, now + Duration::days(1)));
    harness
        .store
        .insert(fixtures::subscription(4, SubscriptionState::Pending, now + Duration::days(1)));

    assert!(service.pause(SubscriptionId::new(1)).await.is_ok());
    assert!(matches!(
        service.pause(SubscriptionId::new(2)).await,
        Err(LifecycleError::AlreadyExpired)
    ));
    assert!(matches!(
        service.pause(SubscriptionId::new(3)).await,
        Err(LifecycleError::AlreadyPaused)
    ));
    assert!(matches!(
        service.pause(SubscriptionId::new(4)).await,
        Err(LifecycleError::InvalidState(SubscriptionState::Pending))
    ));
    assert_eq!(harness.store.save_count(), 1);
}

#[tokio::test]
async fn unpause_guards() {
    let harness = test_environment();
    let service = harness.service();
    let now = harness.clock.now();
    let end = now + Duration::days(1);
    harness
        .store
        .insert(fixtures::subscription(1, SubscriptionState::Active, end));
    harness
        .store
        .insert(fixtures::subscription(2, SubscriptionState::Cancelled, end));
    let mut broken = fixtures::subscription(3, SubscriptionState::Paused, end);
    broken.paused_at = None;
    harness.store.insert(broken);

    assert!(matches!(
        service.unpause(SubscriptionId::new(1)).await,
        Err(LifecycleError::AlreadyActive)
    ));
    assert!(matches!(
        service.unpause(SubscriptionId::new(2)).await,
        Err(LifecycleError::InvalidState(SubscriptionState::Cancelled))
    ));
    assert!(matches!(
        service.unpause(SubscriptionId::new(3)).await,
        Err(LifecycleError::MissingPauseTimestamp(_))
    ));
    assert_eq!(harness.store.save_count(), 0);
}

#[tokio::test]
async fn cancel_twice_reports_already_cancelled() {
    let harness = test_environment();
    let service = harness.service();
    let created = service.create(fixtures::ENTERPRISE_PLAN, fixtures::BOB).await.unwrap();

    harness.clock.advance(Duration::days(1));
    let cancelled = service.cancel(created.id).await.unwrap();
    harness.clock.advance(Duration::days(1));
    let second = service.cancel(created.id).await;

    assert_eq!(cancelled.state, SubscriptionState::Cancelled);
    assert_eq!(cancelled.end, harness.clock.now() - Duration::days(1));
    assert!(matches!(second, Err(LifecycleError::AlreadyCancelled)));
    let stored = harness.store.snapshot(created.id).unwrap();
    assert!(stored.end <= cancelled.end);
}

#[tokio::test]
async fn cancel_of_paused_subscription_clears_pause() {
    let harness = test_environment();
    let service = harness.service();
    let now = harness.clock.now();
    harness
        .store
        .insert(fixtures::subscription(1, SubscriptionState::Paused, now + Duration::days(3)));

    let cancelled = service.cancel(SubscriptionId::new(1)).await.unwrap();

    assert_eq!(cancelled.paused_at, None);
    assert_eq!(cancelled.end, now);
    assert!(cancelled.is_consistent());
}

#[tokio::test]
async fn cancel_guards_on_elapsed_and_terminal_records() {
    let harness = test_environment();
    let service = harness.service();
    let now = harness.clock.now();
    harness
        .store
        .insert(fixtures::subscription(1, SubscriptionState::Pending, now - Duration::seconds(1)));
    harness
        .store
        .insert(fixtures::subscription(2, SubscriptionState::Expired, now + Duration::days(1)));
    harness
        .store
        .insert(fixtures::subscription(3, SubscriptionState::Failed, now + Duration::days(1)));

    assert!(matches!(
        service.cancel(SubscriptionId::new(1)).await,
        Err(LifecycleError::AlreadyExpired)
    ));
    assert!(matches!(
        service.cancel(SubscriptionId::new(2)).await,
        Err(LifecycleError::InvalidState(SubscriptionState::Expired))
    ));
    assert!(matches!(
        service.cancel(SubscriptionId::new(3)).await,
        Err(LifecycleError::InvalidState(SubscriptionState::Failed))
    ));
    assert_eq!(harness.store.save_count(), 0);
}

#[tokio::test]
async fn store_failures_are_wrapped_with_context() {
    let harness = test_environment();
    let service = harness.service();
    let created = service.create(fixtures::BASIC_PLAN, fixtures::ALICE).await.unwrap();

    harness.store.fail_with(StoreError::Database("disk full".into()));
    let err = service.cancel(created.id).await.unwrap_err();

    assert_eq!(err.to_string(), format!("failed to fetch subscription {}", created.id));
    assert!(matches!(
        err,
        LifecycleError::Store {
            source: StoreError::Database(ref msg),
            ..
        } if msg == "disk full"
    ));
}

#[tokio::test]
async fn service_is_shareable_across_tasks() {
    let harness = test_environment();
    let service = Arc::new(harness.service());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.create(fixtures::BASIC_PLAN, fixtures::ALICE).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(harness.store.len(), 8);
}
