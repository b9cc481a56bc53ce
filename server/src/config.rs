//! Configuration management for the subscription server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Values that are present but unparsable are reported instead of being
//! silently replaced by the default.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use subserv_web::auth::{StaticTokenAuthenticator, TokenTableError};
use thiserror::Error;

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,subserv=debug,sqlx=warn";

/// Default `AUTH_TOKENS` table.
pub const DEFAULT_AUTH_TOKENS: &str = "test-token=1";

/// Errors raised while loading [`Config`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be parsed.
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
        /// Parser message
        reason: String,
    },

    /// `AUTH_TOKENS` is malformed.
    #[error("invalid AUTH_TOKENS: {0}")]
    Tokens(#[from] TokenTableError),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP and metrics listeners
    pub server: ServerConfig,
    /// `PostgreSQL` settings; `None` runs on in-memory providers
    pub database: Option<DatabaseConfig>,
    /// Bearer token table
    pub auth: StaticTokenAuthenticator,
    /// Simulated payment processor
    pub payment: PaymentConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// `tracing` filter directives
    pub log_level: String,
    /// Prometheus exporter host
    pub metrics_host: String,
    /// Prometheus exporter port
    pub metrics_port: u16,
    /// Grace period for in-flight requests after a shutdown signal
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// `host:port` of the HTTP listener.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Socket address of the Prometheus exporter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `METRICS_HOST` is not an IP address.
    pub fn metrics_address(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.metrics_host, self.metrics_port);
        raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            var: "METRICS_HOST",
            value: self.metrics_host.clone(),
            reason: e.to_string(),
        })
    }
}

/// `PostgreSQL` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Time allowed to acquire a connection
    pub connect_timeout: Duration,
}

/// Simulated payment processor configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentConfig {
    /// Probability in `[0, 1]` that a charge is approved
    pub success_rate: f64,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for the first variable holding an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for the first variable holding an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server = ServerConfig {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            log_level: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            metrics_host: lookup("METRICS_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            metrics_port: parse_or(&lookup, "METRICS_PORT", 9090)?,
            shutdown_timeout: Duration::from_secs(parse_or(&lookup, "SHUTDOWN_TIMEOUT", 5)?),
        };

        let database = match lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
                connect_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "DATABASE_CONNECT_TIMEOUT",
                    5,
                )?),
            }),
            None => None,
        };

        let tokens = lookup("AUTH_TOKENS").unwrap_or_else(|| DEFAULT_AUTH_TOKENS.to_string());
        let auth = StaticTokenAuthenticator::parse(&tokens)?;

        let success_rate: f64 = parse_or(
            &lookup,
            "PAYMENT_SUCCESS_RATE",
            subserv_core::providers::SimulatedPaymentProcessor::DEFAULT_SUCCESS_RATE,
        )?;
        if !(0.0..=1.0).contains(&success_rate) {
            return Err(ConfigError::Invalid {
                var: "PAYMENT_SUCCESS_RATE",
                value: success_rate.to_string(),
                reason: "must be between 0 and 1".to_string(),
            });
        }

        Ok(Self {
            server,
            database,
            auth,
            payment: PaymentConfig { success_rate },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
