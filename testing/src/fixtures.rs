//! Demo catalog and users.
//!
//! The same data backs tests, the in-memory server mode and the
//! `subserv-populate` seeder.

use chrono::{DateTime, Duration, Utc};
use subserv_core::types::{
    Money, Product, ProductId, Subscription, SubscriptionId, SubscriptionState, TaxRate, User,
    UserId, Version,
};

/// Basic Plan: 9.99, 15% tax
pub const BASIC_PLAN: ProductId = ProductId::new(1);
/// Pro Plan: 19.99, 5% tax
pub const PRO_PLAN: ProductId = ProductId::new(2);
/// Enterprise Plan: 49.99, 5% tax
pub const ENTERPRISE_PLAN: ProductId = ProductId::new(3);
/// Premium Plan: 99.99, 20% tax
pub const PREMIUM_PLAN: ProductId = ProductId::new(4);

/// Alice, the user behind the default `test-token`
pub const ALICE: UserId = UserId::new(1);
/// Bob
pub const BOB: UserId = UserId::new(2);

/// Billing period of every demo plan.
#[must_use]
pub fn billing_period() -> Duration {
    Duration::days(30)
}

/// Builds a product with a 30-day period.
///
/// Tax rates above 100 are clamped to 100.
#[must_use]
pub fn product(id: ProductId, name: &str, description: &str, price_cents: u64, tax_percent: u8) -> Product {
    let tax_rate = TaxRate::new(tax_percent.min(100)).unwrap_or_default();
    Product {
        id,
        name: name.to_string(),
        description: description.to_string(),
        price: Money::from_cents(price_cents),
        tax_rate,
        duration: billing_period(),
    }
}

/// The four demo plans, ordered by id.
#[must_use]
pub fn demo_products() -> Vec<Product> {
    vec![
        product(BASIC_PLAN, "Basic Plan", "Basic plan for individuals", 999, 15),
        product(PRO_PLAN, "Pro Plan", "Pro plan for small teams", 1999, 5),
        product(ENTERPRISE_PLAN, "Enterprise Plan", "Enterprise plan with advanced features", 4999, 5),
        product(PREMIUM_PLAN, "Premium Plan", "Premium plan with all features included", 9999, 20),
    ]
}

/// The two demo users.
#[must_use]
pub fn demo_users() -> Vec<User> {
    vec![
        User {
            id: ALICE,
            name: "Alice".to_string(),
            email: "alice@d.com".to_string(),
        },
        User {
            id: BOB,
            name: "Bob".to_string(),
            email: "bob@d.com".to_string(),
        },
    ]
}

/// A subscription to the Basic Plan owned by Alice, in `state`, with a
/// 30-day window ending at `end`.
///
/// Paused records get a `paused_at` one day after `start`.
#[must_use]
pub fn subscription(id: u64, state: SubscriptionState, end: DateTime<Utc>) -> Subscription {
    let start = end - billing_period();
    Subscription {
        id: SubscriptionId::new(id),
        user_id: ALICE,
        product_id: BASIC_PLAN,
        state,
        start,
        end,
        paused_at: (state == SubscriptionState::Paused).then(|| start + Duration::days(1)),
        price: Money::from_cents(999),
        tax_rate: TaxRate::new(15).unwrap_or_default(),
        version: Version::INITIAL,
    }
}
