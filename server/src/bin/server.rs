//! Subscription service HTTP server.

use subserv_server::{Config, build_environment, build_router, serve, shutdown_signal, telemetry};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    telemetry::init_tracing(&config.server.log_level)?;

    info!("Starting subscription server");
    telemetry::install_metrics(config.server.metrics_address()?)?;

    let (environment, backend) = build_environment(&config).await?;
    info!(?backend, tokens = config.auth.len(), "Providers initialized");

    let app = build_router(&config, environment);

    let addr = config.server.address();
    let listener = TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    serve(listener, app, shutdown_signal(), config.server.shutdown_timeout).await?;

    info!("Server stopped");
    Ok(())
}
