//! Product catalog endpoints (public).

use crate::dto::{ProductListResponse, ProductResponse};
use crate::error::AppError;
use crate::extractors::PathId;
use crate::state::AppState;
use axum::{Json, extract::State};
use subserv_core::types::ProductId;

fn catalog_failure(e: subserv_core::providers::StoreError) -> AppError {
    AppError::internal("Failed to fetch products").with_source(e.into())
}

/// List every product.
///
/// An empty catalog answers 404.
///
/// # Endpoint
///
/// ```text
/// GET /products
/// ```
///
/// # Errors
///
/// 404 when the catalog is empty, 500 on storage failure.
pub async fn list_products(State(state): State<AppState>) -> Result<Json<ProductListResponse>, AppError> {
    let products = state.catalog.list().await.map_err(catalog_failure)?;

    if products.is_empty() {
        return Err(AppError::new(
            axum::http::StatusCode::NOT_FOUND,
            "No products found".to_string(),
            "NOT_FOUND".to_string(),
        ));
    }

    Ok(Json(ProductListResponse {
        products: products.into_iter().map(ProductResponse::from).collect(),
    }))
}

/// Fetch one product.
///
/// # Endpoint
///
/// ```text
/// GET /products/:id
/// ```
///
/// # Errors
///
/// 400 for a malformed id, 404 for an unknown one, 500 on storage failure.
pub async fn get_product(
    State(state): State<AppState>,
    PathId(id): PathId<ProductId>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = state
        .catalog
        .get(id)
        .await
        .map_err(catalog_failure)?
        .ok_or_else(|| AppError::not_found("Product", id))?;

    Ok(Json(product.into()))
}
