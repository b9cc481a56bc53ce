//! Error types for web handlers.
//!
//! This module bridges lifecycle errors and HTTP responses, implementing
//! Axum's `IntoResponse` trait. Every error body has the shape
//! `{"code": "...", "message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subserv_core::LifecycleError;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Data>, AppError> {
///     let subscription = state.subscriptions.get(id).await?; // LifecycleError -> AppError
///     Ok(Json(subscription.into()))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// The HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 402 Payment Required error.
    #[must_use]
    pub fn payment_required(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::PAYMENT_REQUIRED,
            message.into(),
            "PAYMENT_FAILED".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error with a specific code.
    #[must_use]
    pub fn conflict(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), code.to_string())
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (for client error handling).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Response extension carrying [`AppError`]'s code to the middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        metrics::counter!("subserv.http.errors", "status" => self.status.as_u16().to_string())
            .increment(1);

        // Log internal errors
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = ?source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let code = ErrorCode(self.code.clone());
        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        let mut response = (self.status, Json(body)).into_response();
        response.extensions_mut().insert(code);
        response
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

/// Map lifecycle outcomes to HTTP statuses.
impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            ref e if e.is_not_found() => {
                Self::new(StatusCode::NOT_FOUND, err.to_string(), "NOT_FOUND".to_string())
            }
            LifecycleError::NoPendingPayment => Self::conflict("NO_PENDING_PAYMENT", err.to_string()),
            LifecycleError::ConcurrentModification { .. } => {
                Self::conflict("CONCURRENT_MODIFICATION", err.to_string())
            }
            LifecycleError::FailedPayment { .. } => Self::payment_required(err.to_string()),
            ref e if e.is_invalid_state() => Self::conflict("INVALID_STATE", err.to_string()),
            other => Self::internal("An internal error occurred").with_source(other.into()),
        }
    }
}
