//! Seeds the database with the demo plans and users.
//!
//! Safe to run repeatedly: existing rows are left untouched.

use subserv_server::{Config, app, telemetry};
use subserv_testing::fixtures;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    telemetry::init_tracing(&config.server.log_level)?;

    let database = config
        .database
        .as_ref()
        .ok_or("DATABASE_URL must be set to populate the database")?;
    let pool = app::connect(database).await?;

    let report = subserv_postgres::seed_demo_data(&pool, &fixtures::demo_products(), &fixtures::demo_users()).await?;
    info!(
        products = report.products,
        users = report.users,
        "Demo data inserted"
    );

    pool.close().await;
    Ok(())
}
