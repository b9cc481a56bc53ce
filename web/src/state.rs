//! Application state for Axum handlers.

use crate::auth::Authenticator;
use std::sync::Arc;
use subserv_core::SubscriptionService;
use subserv_core::providers::ProductCatalog;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Lifecycle service
    pub subscriptions: Arc<SubscriptionService>,
    /// Product catalog, read directly by the product routes
    pub catalog: Arc<dyn ProductCatalog>,
    /// Bearer token resolution
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    /// Create application state.
    ///
    /// The product routes read the same catalog the service was built with.
    #[must_use]
    pub fn new(subscriptions: SubscriptionService, authenticator: Arc<dyn Authenticator>) -> Self {
        let catalog = Arc::clone(&subscriptions.environment().catalog);
        Self {
            subscriptions: Arc::new(subscriptions),
            catalog,
            authenticator,
        }
    }
}
