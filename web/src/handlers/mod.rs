//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by domain.

pub mod docs;
pub mod health;
pub mod products;
pub mod subscriptions;

// Re-export common handler utilities
pub use health::health_check;
