//! Domain types for subscriptions and the product catalog.
//!
//! Identifiers are positive integers wrapped in newtypes. Money is kept in
//! cents to avoid floating point, and every subscription carries a [`Version`]
//! used for optimistic concurrency at the store boundary.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when an identifier is not a positive integer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} id: {input:?}")]
pub struct ParseIdError {
    kind: &'static str,
    input: String,
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the raw identifier.
            #[must_use]
            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().parse::<u64>() {
                    Ok(id) if id > 0 => Ok(Self(id)),
                    _ => Err(ParseIdError {
                        kind: $kind,
                        input: s.to_string(),
                    }),
                }
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(
    /// Unique identifier of a subscription record.
    SubscriptionId,
    "subscription"
);
define_id!(
    /// Unique identifier of a catalog product.
    ProductId,
    "product"
);
define_id!(
    /// Unique identifier of a user.
    UserId,
    "user"
);

/// Money amount in cents (avoids floating point issues)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Creates a new `Money` amount from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns this amount with `rate` percent of tax added, rounded to the
    /// nearest cent (halves round up).
    ///
    /// The intermediate product is computed in `u128`; a result that does not
    /// fit in `u64` saturates.
    ///
    /// ```
    /// use subserv_core::types::{Money, TaxRate};
    ///
    /// let gross = Money::from_cents(1000).with_tax(TaxRate::new(20).unwrap());
    /// assert_eq!(gross.cents(), 1200);
    /// ```
    #[must_use]
    pub fn with_tax(self, rate: TaxRate) -> Self {
        let scaled = u128::from(self.0) * u128::from(100 + u16::from(rate.percent()));
        let rounded = (scaled + 50) / 100;
        Self(u64::try_from(rounded).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Error returned for tax rates outside `0..=100`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("tax rate must be between 0 and 100, got {0}")]
pub struct InvalidTaxRate(pub u8);

/// Tax rate as an integer percentage (0–100).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TaxRate(u8);

impl TaxRate {
    /// Creates a tax rate.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTaxRate`] if `percent` exceeds 100.
    pub const fn new(percent: u8) -> Result<Self, InvalidTaxRate> {
        if percent > 100 {
            return Err(InvalidTaxRate(percent));
        }
        Ok(Self(percent))
    }

    /// Returns the rate as a percentage.
    #[must_use]
    pub const fn percent(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for TaxRate {
    type Error = InvalidTaxRate;

    fn try_from(percent: u8) -> Result<Self, Self::Error> {
        Self::new(percent)
    }
}

impl From<TaxRate> for u8 {
    fn from(rate: TaxRate) -> Self {
        rate.0
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Record version for optimistic concurrency control.
///
/// A freshly created record is at [`Version::INITIAL`]. Every successful save
/// moves it to [`Version::next`]; a save carrying a stale version is rejected
/// by the store.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// The version of a record that has never been saved after creation.
    pub const INITIAL: Self = Self(0);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A product that can be subscribed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Product {
    /// Product identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Net price per period
    pub price: Money,
    /// Tax applied on top of the price
    pub tax_rate: TaxRate,
    /// Length of one paid period
    pub duration: Duration,
}

impl Product {
    /// Longest billing period accepted, in seconds (100 years of 366 days).
    pub const MAX_DURATION_SECS: i64 = 100 * 366 * 24 * 60 * 60;

    /// Whether the billing period is positive and at most
    /// [`MAX_DURATION_SECS`](Self::MAX_DURATION_SECS).
    #[must_use]
    pub fn has_valid_duration(&self) -> bool {
        self.duration > Duration::zero() && self.duration.num_seconds() <= Self::MAX_DURATION_SECS
    }
}

/// A registered user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
}

/// Lifecycle state of a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// Created, not paid yet
    Pending,
    /// Paid and inside its validity window
    Active,
    /// Suspended before its natural end
    Paused,
    /// Cancelled by the subscriber
    Cancelled,
    /// Validity window elapsed
    Expired,
    /// Payment could not be collected
    Failed,
}

impl SubscriptionState {
    /// Every state, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Active,
        Self::Paused,
        Self::Cancelled,
        Self::Expired,
        Self::Failed,
    ];

    /// Convert state to its storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }

    /// Parse state from its storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == s)
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subscription of one user to one product.
///
/// `price` and `tax_rate` are a snapshot taken when the subscription was
/// created; later catalog changes do not affect what this subscription is
/// charged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription identifier
    pub id: SubscriptionId,
    /// Owning user
    pub user_id: UserId,
    /// Subscribed product
    pub product_id: ProductId,
    /// Current lifecycle state
    pub state: SubscriptionState,
    /// Start of the validity window
    pub start: DateTime<Utc>,
    /// End of the validity window (exclusive)
    pub end: DateTime<Utc>,
    /// When the subscription was paused; set only while `Paused`
    pub paused_at: Option<DateTime<Utc>>,
    /// Net price captured at creation
    pub price: Money,
    /// Tax rate captured at creation
    pub tax_rate: TaxRate,
    /// Optimistic concurrency version
    pub version: Version,
}

impl Subscription {
    /// Length of the validity window.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.end - self.start
    }

    /// Gross amount charged for one period (price plus tax).
    #[must_use]
    pub fn charge_amount(&self) -> Money {
        self.price.with_tax(self.tax_rate)
    }

    /// Returns `true` while `now` is strictly before the end of the window.
    #[must_use]
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        now < self.end
    }

    /// Returns `true` when the record satisfies the structural invariants:
    /// `paused_at` is present exactly when paused, and `end` is not before
    /// `start`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let pause_ok = self.paused_at.is_some() == (self.state == SubscriptionState::Paused);
        pause_ok && self.end >= self.start
    }
}

/// A subscription that has not been persisted yet.
///
/// The store assigns the identifier and the initial version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSubscription {
    /// Owning user
    pub user_id: UserId,
    /// Subscribed product
    pub product_id: ProductId,
    /// Start of the validity window
    pub start: DateTime<Utc>,
    /// End of the validity window
    pub end: DateTime<Utc>,
    /// Net price snapshot
    pub price: Money,
    /// Tax rate snapshot
    pub tax_rate: TaxRate,
}

impl NewSubscription {
    /// Builds a pending subscription for `product`, valid from `now` for one
    /// product duration.
    ///
    /// Returns `None` if the product's billing period is not valid or the
    /// window end is not representable.
    #[must_use]
    pub fn pending(product: &Product, user_id: UserId, now: DateTime<Utc>) -> Option<Self> {
        if !product.has_valid_duration() {
            return None;
        }
        Some(Self {
            user_id,
            product_id: product.id,
            start: now,
            end: now.checked_add_signed(product.duration)?,
            price: product.price,
            tax_rate: product.tax_rate,
        })
    }

    /// Materialises the draft with the identifier assigned by a store.
    #[must_use]
    pub const fn into_subscription(self, id: SubscriptionId) -> Subscription {
        Subscription {
            id,
            user_id: self.user_id,
            product_id: self.product_id,
            state: SubscriptionState::Pending,
            start: self.start,
            end: self.end,
            paused_at: None,
            price: self.price,
            tax_rate: self.tax_rate,
            version: Version::INITIAL,
        }
    }
}
