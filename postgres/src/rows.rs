//! Row types and conversions between SQL and domain representations.
//!
//! Identifiers and amounts are `u64` in the domain and `BIGINT` in SQL;
//! values outside the shared range are reported as storage errors rather than
//! wrapped.

use chrono::{DateTime, Duration, Utc};
use subserv_core::providers::StoreError;
use subserv_core::types::{
    Money, Product, ProductId, Subscription, SubscriptionId, SubscriptionState, TaxRate, UserId,
    Version,
};

pub(crate) const SUBSCRIPTION_COLUMNS: &str = "id, user_id, product_id, state, start_at, end_at, \
     paused_at, price_cents, tax_rate, version";

pub(crate) const PRODUCT_COLUMNS: &str =
    "id, name, description, price_cents, tax_rate, duration_secs";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SubscriptionRow {
    id: i64,
    user_id: i64,
    product_id: i64,
    state: String,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    paused_at: Option<DateTime<Utc>>,
    price_cents: i64,
    tax_rate: i16,
    version: i64,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = StoreError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let state = SubscriptionState::parse(&row.state)
            .ok_or_else(|| StoreError::Database(format!("Unknown subscription state: {}", row.state)))?;
        Ok(Self {
            id: SubscriptionId::new(to_u64(row.id, "subscription id")?),
            user_id: UserId::new(to_u64(row.user_id, "user id")?),
            product_id: ProductId::new(to_u64(row.product_id, "product id")?),
            state,
            start: row.start_at,
            end: row.end_at,
            paused_at: row.paused_at,
            price: Money::from_cents(to_u64(row.price_cents, "price")?),
            tax_rate: to_tax_rate(row.tax_rate)?,
            version: Version::new(to_u64(row.version, "version")?),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: i64,
    name: String,
    description: String,
    price_cents: i64,
    tax_rate: i16,
    duration_secs: i64,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(to_u64(row.id, "product id")?),
            name: row.name,
            description: row.description,
            price: Money::from_cents(to_u64(row.price_cents, "price")?),
            tax_rate: to_tax_rate(row.tax_rate)?,
            duration: to_duration(row.duration_secs)?,
        })
    }
}

pub(crate) fn to_u64(value: i64, what: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Database(format!("Negative {what}: {value}")))
}

pub(crate) fn to_i64(value: u64, what: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Database(format!("{what} out of range: {value}")))
}

pub(crate) fn tax_to_i16(rate: TaxRate) -> i16 {
    i16::from(rate.percent())
}

fn to_duration(secs: i64) -> Result<Duration, StoreError> {
    Duration::try_seconds(secs)
        .filter(|_| secs > 0 && secs <= Product::MAX_DURATION_SECS)
        .ok_or_else(|| StoreError::Database(format!("Invalid product duration: {secs}s")))
}

fn to_tax_rate(value: i16) -> Result<TaxRate, StoreError> {
    u8::try_from(value)
        .ok()
        .and_then(|p| TaxRate::new(p).ok())
        .ok_or_else(|| StoreError::Database(format!("Invalid tax rate: {value}")))
}

pub(crate) fn database_error(context: &str, error: &sqlx::Error) -> StoreError {
    StoreError::Database(format!("{context}: {error}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn product_durations_are_bounded() {
        assert_eq!(to_duration(2_592_000).unwrap(), Duration::days(30));
        assert!(to_duration(Product::MAX_DURATION_SECS).is_ok());
        assert!(to_duration(Product::MAX_DURATION_SECS + 1).is_err());
        assert!(to_duration(0).is_err());
        assert!(to_duration(i64::MAX).is_err());
    }

    #[test]
    fn negative_ids_are_rejected() {
        assert!(to_u64(-1, "product id").is_err());
        assert_eq!(to_u64(7, "product id").unwrap(), 7);
    }
}
