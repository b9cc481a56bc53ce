//! Axum HTTP layer for the subscription service.
//!
//! The handlers are a thin imperative shell: extract and validate the request,
//! call one [`SubscriptionService`](subserv_core::SubscriptionService)
//! operation, and map the typed result to a response.
//!
//! # Request Flow
//!
//! 1. **Correlation ID** assigned by [`middleware::correlation_id_layer`]
//! 2. **Authenticate** the bearer token ([`extractors::AuthenticatedUser`])
//! 3. **Parse** path ids and JSON bodies (400 on failure)
//! 4. **Call** the lifecycle service
//! 5. **Map** `LifecycleError` to a status through [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use subserv_web::{AppState, router, auth::StaticTokenAuthenticator};
//!
//! let state = AppState::new(service, Arc::new(StaticTokenAuthenticator::development()));
//! let app = router(state);
//! axum::serve(listener, app).await?;
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use auth::{Authenticator, StaticTokenAuthenticator};
pub use error::AppError;
pub use extractors::AuthenticatedUser;
pub use middleware::{CORRELATION_ID_HEADER, CorrelationId, correlation_id_layer};
pub use router::router;
pub use state::AppState;
