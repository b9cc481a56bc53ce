//! proptest strategies for domain types.
//!
//! Generated subscriptions always satisfy the structural invariants: a
//! positive window, and `paused_at` present exactly when paused.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use subserv_core::types::{
    Money, ProductId, Subscription, SubscriptionId, SubscriptionState, TaxRate, UserId, Version,
};

/// Any lifecycle state.
pub fn any_state() -> impl Strategy<Value = SubscriptionState> {
    proptest::sample::select(SubscriptionState::ALL.to_vec())
}

/// Any valid tax rate.
pub fn any_tax_rate() -> impl Strategy<Value = TaxRate> {
    (0u8..=100).prop_map(|p| TaxRate::new(p).unwrap_or_default())
}

/// Prices up to 10 000.00.
pub fn any_price() -> impl Strategy<Value = Money> {
    (0u64..=1_000_000).prop_map(Money::from_cents)
}

/// Billing periods between one hour and one year, in whole seconds.
pub fn any_period() -> impl Strategy<Value = Duration> {
    (3_600i64..=31_536_000).prop_map(Duration::seconds)
}

/// A consistent subscription in `state`, whose window ends anywhere from 60
/// days before to 60 days after `now` and never starts after `now`.
pub fn subscription_in(
    state: SubscriptionState,
    now: DateTime<Utc>,
) -> impl Strategy<Value = Subscription> {
    (
        1u64..10_000,
        -5_184_000i64..=5_184_000,
        any_period(),
        0.0f64..1.0,
        any_price(),
        any_tax_rate(),
    )
        .prop_map(move |(id, end_offset, period, pause_fraction, price, tax_rate)| {
            let end = now + Duration::seconds(end_offset);
            let start = (end - period).min(now);
            let paused_at = (state == SubscriptionState::Paused).then(|| {
                // Somewhere in the window, never in the future.
                #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
                let into_window =
                    Duration::seconds(((end - start).num_seconds() as f64 * pause_fraction) as i64);
                (start + into_window).min(now)
            });
            Subscription {
                id: SubscriptionId::new(id),
                user_id: UserId::new(1),
                product_id: ProductId::new(1),
                state,
                start,
                end,
                paused_at,
                price,
                tax_rate,
                version: Version::INITIAL,
            }
        })
}

/// A consistent subscription in any state.
pub fn any_subscription(now: DateTime<Utc>) -> impl Strategy<Value = Subscription> {
    any_state().prop_flat_map(move |state| subscription_in(state, now))
}
