//! Custom Axum extractors.
//!
//! - `BearerToken`: Extract the token from `Authorization: Bearer <token>`
//! - `AuthenticatedUser`: Resolve the bearer token to a user through the
//!   configured [`Authenticator`](crate::auth::Authenticator)
//! - `PathId`: Parse a positive integer id from the path
//! - `JsonBody`: JSON body whose rejections become 400 `AppError`s

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request, rejection::JsonRejection},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use std::str::FromStr;
use subserv_core::types::UserId;

/// Bearer token extracted from `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
            })?
            .trim();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token.to_string()))
    }
}

/// The caller, authenticated from its bearer token.
///
/// Use this as a handler parameter to require authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The authenticated user ID
    pub user_id: UserId,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;

        let user_id = state.authenticator.authenticate(&bearer.0).ok_or_else(|| {
            tracing::debug!("Rejected unknown bearer token");
            AppError::unauthorized("Invalid token")
        })?;

        Ok(Self { user_id })
    }
}

/// An identifier parsed from the single path parameter.
///
/// Anything that does not parse as `T` (for the id newtypes: not a positive
/// integer) is rejected with 400.
#[derive(Debug, Clone, Copy)]
pub struct PathId<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathId<T>
where
    S: Send + Sync,
    T: FromStr + Send,
    T::Err: std::fmt::Display,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::bad_request(format!("Invalid path: {e}")))?;

        raw.parse::<T>()
            .map(Self)
            .map_err(|e| AppError::bad_request(e.to_string()))
    }
}

/// JSON request body.
///
/// Same as `axum::Json` but malformed bodies, missing fields and a wrong
/// content type all answer 400 with the standard error body.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        axum::Json::<T>::from_request(req, state)
            .await
            .map(|axum::Json(value)| Self(value))
            .map_err(|e: JsonRejection| AppError::bad_request(e.body_text()))
    }
}
