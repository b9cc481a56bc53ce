//! Application wiring: providers, router and the serve loop.

use crate::config::{Config, ConfigError, DatabaseConfig};
use axum::Router;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use subserv_core::environment::SystemClock;
use subserv_core::providers::{SimulatedPaymentProcessor, StoreError};
use subserv_core::{SubscriptionEnvironment, SubscriptionService};
use subserv_postgres::{PgPool, PostgresProductCatalog, PostgresSubscriptionStore, PostgresUserDirectory};
use subserv_testing::fixtures;
use subserv_testing::{InMemoryProductCatalog, InMemorySubscriptionStore, InMemoryUserDirectory};
use subserv_web::AppState;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Errors that stop the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The database could not be reached or migrated
    #[error("database setup failed: {0}")]
    Database(#[from] StoreError),

    /// Binding or serving failed
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serve task panicked
    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Which providers back the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `PostgreSQL` via sqlx
    Postgres,
    /// In-memory providers seeded with the demo catalog and users
    InMemory,
}

/// Build the service environment for `config`.
///
/// With a database configured this connects, runs migrations and uses the
/// `PostgreSQL` providers. Without one the in-memory providers are seeded with
/// the demo fixtures.
///
/// # Errors
///
/// Returns [`ServerError::Database`] if the pool or migrations fail.
pub async fn build_environment(config: &Config) -> Result<(SubscriptionEnvironment, Backend), ServerError> {
    let Some(database) = &config.database else {
        warn!("DATABASE_URL not set, subscriptions are kept in memory");
        return Ok((in_memory_environment(config), Backend::InMemory));
    };

    let pool = connect(database).await?;
    let environment = SubscriptionEnvironment {
        clock: Arc::new(SystemClock),
        store: Arc::new(PostgresSubscriptionStore::new(pool.clone())),
        catalog: Arc::new(PostgresProductCatalog::new(pool.clone())),
        users: Arc::new(PostgresUserDirectory::new(pool)),
        payments: Arc::new(SimulatedPaymentProcessor::new(config.payment.success_rate)),
    };

    Ok((environment, Backend::Postgres))
}

/// In-memory environment seeded with the demo catalog and users.
#[must_use]
pub fn in_memory_environment(config: &Config) -> SubscriptionEnvironment {
    SubscriptionEnvironment {
        clock: Arc::new(SystemClock),
        store: Arc::new(InMemorySubscriptionStore::new()),
        catalog: Arc::new(InMemoryProductCatalog::new(fixtures::demo_products())),
        users: Arc::new(InMemoryUserDirectory::from_users(&fixtures::demo_users())),
        payments: Arc::new(SimulatedPaymentProcessor::new(config.payment.success_rate)),
    }
}

/// Connect to the database and apply migrations.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if either step fails.
pub async fn connect(database: &DatabaseConfig) -> Result<PgPool, StoreError> {
    info!(max_connections = database.max_connections, "Connecting to database...");
    let pool = subserv_postgres::connect(&database.url, database.max_connections, database.connect_timeout).await?;
    subserv_postgres::migrate(&pool).await?;
    info!("Database ready");
    Ok(pool)
}

/// The HTTP application for `environment` and `config`.
#[must_use]
pub fn build_router(config: &Config, environment: SubscriptionEnvironment) -> Router {
    let service = SubscriptionService::new(environment);
    subserv_web::router(AppState::new(service, Arc::new(config.auth.clone())))
}

/// Serve `app` on `listener` until `shutdown` resolves.
///
/// In-flight requests get `grace` to finish; after that the server is
/// abandoned and the function returns.
///
/// # Errors
///
/// Returns [`ServerError`] if serving fails.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send,
    grace: Duration,
) -> Result<(), ServerError> {
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let mut handle = tokio::spawn(server.into_future());

    tokio::select! {
        finished = &mut handle => return Ok(finished??),
        () = shutdown => {}
    }

    let _ = stop_tx.send(());
    match tokio::time::timeout(grace, handle).await {
        Ok(finished) => finished??,
        Err(_) => warn!(grace_secs = grace.as_secs(), "Shutdown grace period elapsed, dropping connections"),
    }
    Ok(())
}

/// Resolves on Ctrl+C (SIGINT) or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
