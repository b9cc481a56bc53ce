//! Process bootstrap for the subscription service.
//!
//! Shared by the two binaries:
//!
//! - `subserv-server`: loads [`Config`], installs tracing and the Prometheus
//!   exporter, builds the providers and serves the HTTP API until Ctrl+C or
//!   SIGTERM
//! - `subserv-populate`: connects to `DATABASE_URL`, applies migrations and
//!   inserts the demo plans and users
//!
//! Without `DATABASE_URL` the server runs on in-memory providers seeded with
//! the same demo data.

pub mod app;
pub mod config;
pub mod telemetry;

pub use app::{Backend, ServerError, build_environment, build_router, serve, shutdown_signal};
pub use config::{Config, ConfigError};
