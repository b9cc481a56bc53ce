//! Bearer token authentication.
//!
//! Tokens are opaque strings resolved to a [`UserId`] by an [`Authenticator`].
//! [`StaticTokenAuthenticator`] holds a fixed table, configured from a
//! `token=user_id,...` list.

use std::collections::HashMap;
use subserv_core::types::UserId;
use thiserror::Error;

/// Token used by the default authenticator for local development.
pub const DEFAULT_TEST_TOKEN: &str = "test-token";

/// Resolves bearer tokens to users.
pub trait Authenticator: Send + Sync {
    /// Returns the user owning `token`, if any.
    fn authenticate(&self, token: &str) -> Option<UserId>;
}

/// Error parsing a token table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenTableError {
    /// An entry is not of the form `token=user_id`.
    #[error("invalid token entry {0:?}, expected token=user_id")]
    MalformedEntry(String),

    /// An entry's user id is not a positive integer.
    #[error("invalid user id in token entry {0:?}")]
    InvalidUserId(String),
}

/// Authenticator backed by a fixed token table.
///
/// ```
/// use subserv_web::auth::{Authenticator, StaticTokenAuthenticator};
/// use subserv_core::types::UserId;
///
/// let auth = StaticTokenAuthenticator::parse("alice-token=1, bob-token=2").unwrap();
/// assert_eq!(auth.authenticate("bob-token"), Some(UserId::new(2)));
/// assert_eq!(auth.authenticate("nope"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenAuthenticator {
    /// Create an authenticator with no tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, user_id: UserId) -> Self {
        self.tokens.insert(token.into(), user_id);
        self
    }

    /// The development table: `test-token` authenticates user 1.
    #[must_use]
    pub fn development() -> Self {
        Self::new().with_token(DEFAULT_TEST_TOKEN, UserId::new(1))
    }

    /// Parse a comma-separated `token=user_id` list. Blank entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TokenTableError`] for the first malformed entry.
    pub fn parse(table: &str) -> Result<Self, TokenTableError> {
        table
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .try_fold(Self::new(), |auth, entry| {
                let (token, user) = entry
                    .split_once('=')
                    .filter(|(token, _)| !token.trim().is_empty())
                    .ok_or_else(|| TokenTableError::MalformedEntry(entry.to_string()))?;
                let user_id = user
                    .trim()
                    .parse::<UserId>()
                    .map_err(|_| TokenTableError::InvalidUserId(entry.to_string()))?;
                Ok(auth.with_token(token.trim(), user_id))
            })
    }

    /// Number of configured tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no token is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn authenticate(&self, token: &str) -> Option<UserId> {
        self.tokens.get(token).copied()
    }
}
