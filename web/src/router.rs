//! Route table.

use crate::handlers::{docs, health, products, subscriptions};
use crate::middleware::{correlation_id_layer, http_trace_layer};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Build the application router.
///
/// ```text
/// GET   /health
/// GET   /products
/// GET   /products/:id
/// POST  /subscriptions                 (auth)
/// GET   /subscriptions/:id             (auth)
/// POST  /subscriptions/:id/purchase    (auth)
/// PATCH /subscriptions/:id/pause       (auth)
/// PATCH /subscriptions/:id/unpause     (auth)
/// PATCH /subscriptions/:id/cancel      (auth)
/// GET   /api-docs/openapi.json
/// ```
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/products", get(products::list_products))
        .route("/products/:id", get(products::get_product))
        .route("/subscriptions", post(subscriptions::create_subscription))
        .route("/subscriptions/:id", get(subscriptions::get_subscription))
        .route(
            "/subscriptions/:id/purchase",
            post(subscriptions::purchase_subscription),
        )
        .route(
            "/subscriptions/:id/pause",
            patch(subscriptions::pause_subscription),
        )
        .route(
            "/subscriptions/:id/unpause",
            patch(subscriptions::unpause_subscription),
        )
        .route(
            "/subscriptions/:id/cancel",
            patch(subscriptions::cancel_subscription),
        )
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        .layer(http_trace_layer())
        .layer(correlation_id_layer())
        .with_state(state)
}
