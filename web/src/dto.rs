//! Request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subserv_core::PurchaseReceipt;
use subserv_core::types::{Product, Subscription};

/// `POST /subscriptions` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Product to subscribe to; must be positive
    pub product_id: u64,
}

/// A subscription as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    /// Subscription id
    pub id: u64,
    /// Owner
    pub user_id: u64,
    /// Subscribed product
    pub product_id: u64,
    /// Lifecycle state (`pending`, `active`, ...)
    pub state: String,
    /// Net price per period, in cents
    pub price_cent: u64,
    /// Tax rate, percent
    pub tax_rate: u8,
    /// Window start
    pub start: DateTime<Utc>,
    /// Window end
    pub end: DateTime<Utc>,
    /// Pause instant, only while paused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
    /// Record version
    pub version: u64,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(s: Subscription) -> Self {
        Self {
            id: s.id.value(),
            user_id: s.user_id.value(),
            product_id: s.product_id.value(),
            state: s.state.as_str().to_string(),
            price_cent: s.price.cents(),
            tax_rate: s.tax_rate.percent(),
            start: s.start,
            end: s.end,
            paused_at: s.paused_at,
            version: s.version.value(),
        }
    }
}

/// `POST /subscriptions/:id/purchase` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseResponse {
    /// Human-readable confirmation
    pub message: String,
    /// Processor transaction id
    pub transaction_id: String,
    /// Gross amount charged, in cents
    pub amount_cent: u64,
    /// The activated subscription
    pub subscription: SubscriptionResponse,
}

impl From<PurchaseReceipt> for PurchaseResponse {
    fn from(receipt: PurchaseReceipt) -> Self {
        Self {
            message: "Subscription purchased successfully".to_string(),
            transaction_id: receipt.transaction_id,
            amount_cent: receipt.amount.cents(),
            subscription: receipt.subscription.into(),
        }
    }
}

/// A product as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductResponse {
    /// Product id
    pub id: u64,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Net price, in cents
    pub price: u64,
    /// Tax rate, percent
    pub tax_rate: u8,
    /// Billing period, in seconds
    pub duration_secs: i64,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id.value(),
            name: p.name,
            description: p.description,
            price: p.price.cents(),
            tax_rate: p.tax_rate.percent(),
            duration_secs: p.duration.num_seconds(),
        }
    }
}

/// `GET /products` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListResponse {
    /// Products ordered by id
    pub products: Vec<ProductResponse>,
}
