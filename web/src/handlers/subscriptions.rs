//! Subscription lifecycle endpoints. All require a bearer token.

use crate::dto::{CreateSubscriptionRequest, PurchaseResponse, SubscriptionResponse};
use crate::error::AppError;
use crate::extractors::{AuthenticatedUser, JsonBody, PathId};
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use subserv_core::types::{ProductId, SubscriptionId};

/// `GET /subscriptions/:id`
///
/// # Errors
///
/// 400 malformed id, 401 unauthenticated, 404 unknown subscription.
pub async fn get_subscription(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    PathId(id): PathId<SubscriptionId>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let subscription = state.subscriptions.get(id).await?;
    Ok(Json(subscription.into()))
}

/// `POST /subscriptions` with `{"product_id": n}`; the caller becomes the owner.
///
/// # Errors
///
/// 400 malformed body, 401 unauthenticated, 404 unknown product or user.
pub async fn create_subscription(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(request): JsonBody<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), AppError> {
    if request.product_id == 0 {
        return Err(AppError::bad_request("product_id must be a positive integer"));
    }

    let subscription = state
        .subscriptions
        .create(ProductId::new(request.product_id), user.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(subscription.into())))
}

/// `POST /subscriptions/:id/purchase`
///
/// # Errors
///
/// 402 declined, 404 unknown, 409 not pending or concurrently modified.
pub async fn purchase_subscription(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    PathId(id): PathId<SubscriptionId>,
) -> Result<Json<PurchaseResponse>, AppError> {
    let receipt = state.subscriptions.purchase(id).await?;
    Ok(Json(receipt.into()))
}

/// `PATCH /subscriptions/:id/pause`
///
/// # Errors
///
/// 404 unknown, 409 not active or expired.
pub async fn pause_subscription(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    PathId(id): PathId<SubscriptionId>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), AppError> {
    let subscription = state.subscriptions.pause(id).await?;
    Ok((StatusCode::ACCEPTED, Json(subscription.into())))
}

/// `PATCH /subscriptions/:id/unpause`
///
/// # Errors
///
/// 404 unknown, 409 not paused.
pub async fn unpause_subscription(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    PathId(id): PathId<SubscriptionId>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), AppError> {
    let subscription = state.subscriptions.unpause(id).await?;
    Ok((StatusCode::ACCEPTED, Json(subscription.into())))
}

/// `PATCH /subscriptions/:id/cancel`
///
/// # Errors
///
/// 404 unknown, 409 already cancelled, expired or terminal.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    PathId(id): PathId<SubscriptionId>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), AppError> {
    let subscription = state.subscriptions.cancel(id).await?;
    Ok((StatusCode::ACCEPTED, Json(subscription.into())))
}
