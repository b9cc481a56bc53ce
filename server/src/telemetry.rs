//! Tracing and Prometheus bootstrap.

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors from telemetry setup.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The filter directives could not be parsed
    #[error("invalid log filter {filter:?}: {reason}")]
    Filter {
        /// Directives as configured
        filter: String,
        /// Parser message
        reason: String,
    },

    /// A global subscriber is already installed
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),

    /// The Prometheus exporter could not be installed
    #[error("failed to install metrics exporter: {0}")]
    Metrics(String),
}

/// Install the global `tracing` subscriber with `filter` directives.
///
/// # Errors
///
/// Returns [`TelemetryError`] if the directives are invalid or a subscriber
/// is already installed.
pub fn init_tracing(filter: &str) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(filter).map_err(|e| TelemetryError::Filter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))
}

/// Start the Prometheus exporter on `addr` and describe the service counters.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`TelemetryError::Metrics`] if the listener cannot be started or a
/// recorder is already installed.
pub fn install_metrics(addr: SocketAddr) -> Result<(), TelemetryError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;

    register_metrics();
    tracing::info!(%addr, "Metrics available at http://{addr}/metrics");
    Ok(())
}

/// Register descriptions for every counter the service records.
pub fn register_metrics() {
    describe_counter!(
        "subserv.subscriptions.created",
        "Subscriptions created in the pending state"
    );
    describe_counter!(
        "subserv.charges",
        "Payment capture attempts by outcome (approved, declined, error)"
    );
    describe_counter!(
        "subserv.transitions",
        "Lifecycle transitions applied, by command and resulting state"
    );
    describe_counter!(
        "subserv.transitions.rejected",
        "Commands rejected by a lifecycle guard, by command"
    );
    describe_counter!(
        "subserv.store.conflicts",
        "Saves rejected by the optimistic version check"
    );
    describe_counter!("subserv.http.errors", "HTTP error responses by status");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_filter() {
        let err = init_tracing("subserv=loud").unwrap_err();
        assert!(matches!(err, TelemetryError::Filter { .. }));
    }
}
