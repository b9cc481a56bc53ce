//! Demo data seeding.

use crate::rows::{database_error, tax_to_i16, to_i64};
use sqlx::PgPool;
use subserv_core::providers::StoreError;
use subserv_core::types::{Product, User};

/// Rows inserted by [`seed_demo_data`]; existing rows are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Newly inserted products
    pub products: u64,
    /// Newly inserted users
    pub users: u64,
}

/// Insert `products` and `users` with their ids, skipping ids already present.
///
/// Runs in one transaction and advances the id sequences past the seeded
/// ids, so it is safe to run repeatedly.
///
/// # Errors
///
/// Returns `Database` if any statement fails; nothing is committed then.
pub async fn seed_demo_data(
    pool: &PgPool,
    products: &[Product],
    users: &[User],
) -> Result<SeedReport, StoreError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| database_error("Failed to begin seed transaction", &e))?;
    let mut report = SeedReport::default();

    for product in products {
        let result = sqlx::query(
            "INSERT INTO products (id, name, description, price_cents, tax_rate, duration_secs) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(to_i64(product.id.value(), "product id")?)
        .bind(&product.name)
        .bind(&product.description)
        .bind(to_i64(product.price.cents(), "price")?)
        .bind(tax_to_i16(product.tax_rate))
        .bind(product.duration.num_seconds())
        .execute(&mut *tx)
        .await
        .map_err(|e| database_error("Failed to seed product", &e))?;
        report.products += result.rows_affected();
    }

    for user in users {
        let result = sqlx::query(
            "INSERT INTO users (id, name, email) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(to_i64(user.id.value(), "user id")?)
        .bind(&user.name)
        .bind(&user.email)
        .execute(&mut *tx)
        .await
        .map_err(|e| database_error("Failed to seed user", &e))?;
        report.users += result.rows_affected();
    }

    for table in ["products", "users"] {
        let sql = format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
                           GREATEST((SELECT MAX(id) FROM {table}), 1))"
        );
        sqlx::query(&sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| database_error("Failed to advance id sequence", &e))?;
    }

    tx.commit()
        .await
        .map_err(|e| database_error("Failed to commit seed transaction", &e))?;

    tracing::info!(products = report.products, users = report.users, "Demo data seeded");
    Ok(report)
}
