//! `PostgreSQL` subscription store.

use crate::rows::{SUBSCRIPTION_COLUMNS, SubscriptionRow, database_error, tax_to_i16, to_i64, to_u64};
use sqlx::PgPool;
use subserv_core::providers::{BoxFuture, StoreError, SubscriptionStore};
use subserv_core::types::{NewSubscription, Subscription, SubscriptionId, SubscriptionState, Version};

/// `PostgreSQL` subscription store.
///
/// `save` is a conditional update on `(id, version)`; when no row matches, a
/// second lookup tells a missing record from a concurrent modification.
#[derive(Clone, Debug)]
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_version(&self, id: i64) -> Result<Option<Version>, StoreError> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error("Failed to read subscription version", &e))?;
        version
            .map(|v| to_u64(v, "version").map(Version::new))
            .transpose()
    }
}

impl SubscriptionStore for PostgresSubscriptionStore {
    fn get(&self, id: SubscriptionId) -> BoxFuture<'_, Result<Subscription, StoreError>> {
        Box::pin(async move {
            let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = $1");
            let row: SubscriptionRow = sqlx::query_as(&sql)
                .bind(to_i64(id.value(), "subscription id")?)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| database_error("Failed to get subscription", &e))?
                .ok_or(StoreError::NotFound)?;
            Subscription::try_from(row)
        })
    }

    fn create(&self, draft: NewSubscription) -> BoxFuture<'_, Result<Subscription, StoreError>> {
        Box::pin(async move {
            let sql = format!(
                "INSERT INTO subscriptions \
                     (user_id, product_id, state, start_at, end_at, price_cents, tax_rate, version) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, 0) \
                 RETURNING {SUBSCRIPTION_COLUMNS}"
            );
            let row: SubscriptionRow = sqlx::query_as(&sql)
                .bind(to_i64(draft.user_id.value(), "user id")?)
                .bind(to_i64(draft.product_id.value(), "product id")?)
                .bind(SubscriptionState::Pending.as_str())
                .bind(draft.start)
                .bind(draft.end)
                .bind(to_i64(draft.price.cents(), "price")?)
                .bind(tax_to_i16(draft.tax_rate))
                .fetch_one(&self.pool)
                .await
                .map_err(|e| database_error("Failed to create subscription", &e))?;

            let subscription = Subscription::try_from(row)?;
            tracing::debug!(subscription_id = %subscription.id, "Subscription row inserted");
            Ok(subscription)
        })
    }

    fn save(&self, subscription: Subscription) -> BoxFuture<'_, Result<Subscription, StoreError>> {
        Box::pin(async move {
            let id = to_i64(subscription.id.value(), "subscription id")?;
            let expected = subscription.version;

            // Price and tax are a snapshot and never rewritten.
            let sql = format!(
                "UPDATE subscriptions \
                 SET state = $2, start_at = $3, end_at = $4, paused_at = $5, \
                     version = version + 1, updated_at = now() \
                 WHERE id = $1 AND version = $6 \
                 RETURNING {SUBSCRIPTION_COLUMNS}"
            );
            let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
                .bind(id)
                .bind(subscription.state.as_str())
                .bind(subscription.start)
                .bind(subscription.end)
                .bind(subscription.paused_at)
                .bind(to_i64(expected.value(), "version")?)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| database_error("Failed to save subscription", &e))?;

            match row {
                Some(row) => Subscription::try_from(row),
                None => match self.current_version(id).await? {
                    Some(actual) => {
                        metrics::counter!("subserv.store.conflicts").increment(1);
                        Err(StoreError::Conflict { expected, actual })
                    }
                    None => Err(StoreError::NotFound),
                },
            }
        })
    }
}
