//! Subscription lifecycle state machine.
//!
//! Pure functions, no I/O: given a subscription, a command and the current
//! time, [`validate`] enforces the guards and [`transition`] yields the
//! [`SubscriptionEvent`] describing the change. [`Subscription::apply`] folds
//! the event into the record.
//!
//! ```text
//!              Purchase (approved)
//!   Pending ───────────────────────▶ Active ◀──────┐
//!      │                              │  Pause     │ Unpause
//!      │ Cancel                       ▼            │
//!      │                            Paused ────────┘
//!      ▼                              │
//!  Cancelled ◀────────────────────────┘ Cancel (Active/Paused too)
//! ```
//!
//! Expiry is lazy: no transition writes `Expired`. Guards compare `now`
//! against the current `end` instead.

use crate::error::LifecycleError;
use crate::types::{Subscription, SubscriptionState};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A request to move a subscription through its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionCommand {
    /// Activate a pending subscription after payment
    Purchase,
    /// Suspend an active subscription
    Pause,
    /// Resume a paused subscription
    Unpause,
    /// End a subscription now
    Cancel,
}

impl SubscriptionCommand {
    /// Short name used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for SubscriptionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change that passed its guards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubscriptionEvent {
    /// Payment captured; the window was rebased to start at activation.
    Activated {
        /// New window start
        start: DateTime<Utc>,
        /// New window end
        end: DateTime<Utc>,
    },
    /// Subscription suspended.
    Paused {
        /// Pause instant
        at: DateTime<Utc>,
    },
    /// Subscription resumed with its window extended by the paused time.
    Resumed {
        /// Resume instant
        at: DateTime<Utc>,
        /// Extended window end
        end: DateTime<Utc>,
    },
    /// Subscription ended.
    Cancelled {
        /// Cancellation instant, which becomes the new window end
        at: DateTime<Utc>,
    },
}

impl SubscriptionEvent {
    /// The state a subscription is in after this event.
    #[must_use]
    pub const fn resulting_state(&self) -> SubscriptionState {
        match self {
            Self::Activated { .. } | Self::Resumed { .. } => SubscriptionState::Active,
            Self::Paused { .. } => SubscriptionState::Paused,
            Self::Cancelled { .. } => SubscriptionState::Cancelled,
        }
    }
}

/// Checks whether `command` may be applied to `subscription` at `now`.
///
/// # Errors
///
/// | Command | Current state | Error |
/// |---|---|---|
/// | Purchase | anything but Pending | `NoPendingPayment` |
/// | Pause | Active, `now >= end` | `AlreadyExpired` |
/// | Pause | Paused | `AlreadyPaused` |
/// | Unpause | Active | `AlreadyActive` |
/// | Cancel | Pending/Active/Paused, `now >= end` | `AlreadyExpired` |
/// | Cancel | Cancelled | `AlreadyCancelled` |
/// | any | other states | `InvalidState` |
pub fn validate(
    subscription: &Subscription,
    command: SubscriptionCommand,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    use SubscriptionCommand as C;
    use SubscriptionState as S;

    match (command, subscription.state) {
        (C::Purchase, S::Pending) | (C::Unpause, S::Paused) => Ok(()),
        (C::Purchase, _) => Err(LifecycleError::NoPendingPayment),

        (C::Pause, S::Active) | (C::Cancel, S::Pending | S::Active | S::Paused) => {
            if subscription.is_within_window(now) {
                Ok(())
            } else {
                Err(LifecycleError::AlreadyExpired)
            }
        }
        (C::Pause, S::Paused) => Err(LifecycleError::AlreadyPaused),
        (C::Unpause, S::Active) => Err(LifecycleError::AlreadyActive),
        (C::Cancel, S::Cancelled) => Err(LifecycleError::AlreadyCancelled),

        (_, state) => Err(LifecycleError::InvalidState(state)),
    }
}

/// Validates `command` and computes the resulting event.
///
/// # Errors
///
/// Returns the guard errors of [`validate`], `MissingPauseTimestamp` when
/// unpausing a record that lost its pause timestamp, and `WindowOutOfRange`
/// when the new end is not representable.
pub fn transition(
    subscription: &Subscription,
    command: SubscriptionCommand,
    now: DateTime<Utc>,
) -> Result<SubscriptionEvent, LifecycleError> {
    validate(subscription, command, now)?;

    let event = match command {
        SubscriptionCommand::Purchase => SubscriptionEvent::Activated {
            start: now,
            end: now
                .checked_add_signed(subscription.window())
                .ok_or(LifecycleError::WindowOutOfRange(subscription.id))?,
        },
        SubscriptionCommand::Pause => SubscriptionEvent::Paused { at: now },
        SubscriptionCommand::Unpause => {
            let paused_at = subscription
                .paused_at
                .ok_or(LifecycleError::MissingPauseTimestamp(subscription.id))?;
            // A clock that stepped back must not pull the end in.
            let paused_for = (now - paused_at).max(Duration::zero());
            SubscriptionEvent::Resumed {
                at: now,
                end: subscription
                    .end
                    .checked_add_signed(paused_for)
                    .ok_or(LifecycleError::WindowOutOfRange(subscription.id))?,
            }
        }
        SubscriptionCommand::Cancel => SubscriptionEvent::Cancelled { at: now },
    };

    Ok(event)
}

impl Subscription {
    /// Folds a lifecycle event into the record.
    ///
    /// Events are produced by [`transition`]; applying one to a record it was
    /// not computed for yields an undefined, though memory-safe, record.
    pub fn apply(&mut self, event: &SubscriptionEvent) {
        match *event {
            SubscriptionEvent::Activated { start, end } => {
                self.start = start;
                self.end = end;
            }
            SubscriptionEvent::Paused { at } => {
                self.paused_at = Some(at);
            }
            SubscriptionEvent::Resumed { end, .. } => {
                self.end = end;
                self.paused_at = None;
            }
            SubscriptionEvent::Cancelled { at } => {
                self.end = at;
                self.paused_at = None;
            }
        }
        self.state = event.resulting_state();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Money, ProductId, SubscriptionId, TaxRate, UserId, Version};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn subscription(state: SubscriptionState, end: DateTime<Utc>) -> Subscription {
        Subscription {
            id: SubscriptionId::new(1),
            user_id: UserId::new(1),
            product_id: ProductId::new(1),
            state,
            start: end - Duration::days(30),
            end,
            paused_at: (state == SubscriptionState::Paused).then(|| now() - Duration::days(2)),
            price: Money::from_cents(1000),
            tax_rate: TaxRate::new(20).unwrap(),
            version: Version::INITIAL,
        }
    }

    #[test]
    fn pause_within_window_succeeds() {
        let mut sub = subscription(SubscriptionState::Active, now() + Duration::hours(1));

        let event = transition(&sub, SubscriptionCommand::Pause, now()).unwrap();
        sub.apply(&event);

        assert_eq!(sub.state, SubscriptionState::Paused);
        assert_eq!(sub.paused_at, Some(now()));
    }

    #[test]
    fn pause_after_window_is_expired() {
        let sub = subscription(SubscriptionState::Active, now() - Duration::hours(1));

        let err = validate(&sub, SubscriptionCommand::Pause, now()).unwrap_err();

        assert!(matches!(err, LifecycleError::AlreadyExpired));
    }

    #[test]
    fn window_end_is_exclusive() {
        let sub = subscription(SubscriptionState::Active, now());

        assert!(matches!(
            validate(&sub, SubscriptionCommand::Cancel, now()),
            Err(LifecycleError::AlreadyExpired)
        ));
    }

    #[test]
    fn pause_from_other_states() {
        let end = now() + Duration::days(1);
        let paused = subscription(SubscriptionState::Paused, end);
        let cancelled = subscription(SubscriptionState::Cancelled, end);

        assert!(matches!(
            validate(&paused, SubscriptionCommand::Pause, now()),
            Err(LifecycleError::AlreadyPaused)
        ));
        assert!(matches!(
            validate(&cancelled, SubscriptionCommand::Pause, now()),
            Err(LifecycleError::InvalidState(SubscriptionState::Cancelled))
        ));
    }

    #[test]
    fn unpause_extends_end_by_paused_time() {
        let end = now() + Duration::days(10);
        let mut sub = subscription(SubscriptionState::Paused, end);
        let paused_for = now() - sub.paused_at.unwrap();

        let event = transition(&sub, SubscriptionCommand::Unpause, now()).unwrap();
        sub.apply(&event);

        assert_eq!(sub.state, SubscriptionState::Active);
        assert_eq!(sub.end, end + paused_for);
        assert_eq!(sub.paused_at, None);
    }

    #[test]
    fn unpause_after_window_end_still_resumes() {
        // A paused subscription does not consume its window.
        let end = now() - Duration::hours(1);
        let sub = subscription(SubscriptionState::Paused, end);

        let event = transition(&sub, SubscriptionCommand::Unpause, now()).unwrap();

        assert!(matches!(event, SubscriptionEvent::Resumed { end: new_end, .. } if new_end > now()));
    }

    #[test]
    fn unpause_never_pulls_end_in_when_clock_steps_back() {
        let end = now() + Duration::days(10);
        let mut sub = subscription(SubscriptionState::Paused, end);
        sub.paused_at = Some(now() + Duration::hours(3));

        let event = transition(&sub, SubscriptionCommand::Unpause, now()).unwrap();
        sub.apply(&event);

        assert_eq!(sub.end, end);
        assert!(sub.end >= sub.start);
    }

    #[test]
    fn unpause_past_representable_time_is_rejected() {
        let mut sub = subscription(SubscriptionState::Paused, DateTime::<Utc>::MAX_UTC - Duration::hours(1));
        sub.start = now() - Duration::days(1);

        let err = transition(&sub, SubscriptionCommand::Unpause, now()).unwrap_err();

        assert!(matches!(err, LifecycleError::WindowOutOfRange(id) if id == sub.id));
    }

    #[test]
    fn purchase_with_unrepresentable_window_is_rejected() {
        let mut sub = subscription(SubscriptionState::Pending, now() + Duration::days(1));
        sub.start = DateTime::<Utc>::MIN_UTC;

        let err = transition(&sub, SubscriptionCommand::Purchase, now()).unwrap_err();

        assert!(matches!(err, LifecycleError::WindowOutOfRange(_)));
    }

    #[test]
    fn unpause_without_pause_timestamp_is_reported() {
        let mut sub = subscription(SubscriptionState::Paused, now() + Duration::days(1));
        sub.paused_at = None;

        let err = transition(&sub, SubscriptionCommand::Unpause, now()).unwrap_err();

        assert!(matches!(err, LifecycleError::MissingPauseTimestamp(id) if id == sub.id));
    }

    #[test]
    fn unpause_from_active_and_cancelled() {
        let end = now() + Duration::days(1);

        assert!(matches!(
            validate(&subscription(SubscriptionState::Active, end), SubscriptionCommand::Unpause, now()),
            Err(LifecycleError::AlreadyActive)
        ));
        assert!(matches!(
            validate(&subscription(SubscriptionState::Cancelled, end), SubscriptionCommand::Unpause, now()),
            Err(LifecycleError::InvalidState(SubscriptionState::Cancelled))
        ));
    }

    #[test]
    fn purchase_requires_pending() {
        let end = now() + Duration::days(30);
        for state in SubscriptionState::ALL {
            let result = validate(&subscription(state, end), SubscriptionCommand::Purchase, now());
            if state == SubscriptionState::Pending {
                assert!(result.is_ok());
            } else {
                assert!(matches!(result, Err(LifecycleError::NoPendingPayment)));
            }
        }
    }

    #[test]
    fn purchase_rebases_window_and_keeps_its_length() {
        let created = now() - Duration::days(3);
        let mut sub = subscription(SubscriptionState::Pending, created + Duration::days(30));
        sub.start = created;

        let event = transition(&sub, SubscriptionCommand::Purchase, now()).unwrap();
        sub.apply(&event);

        assert_eq!(sub.state, SubscriptionState::Active);
        assert_eq!(sub.start, now());
        assert_eq!(sub.end, now() + Duration::days(30));
    }

    #[test]
    fn cancel_ends_window_now_and_clears_pause() {
        let mut sub = subscription(SubscriptionState::Paused, now() + Duration::days(5));

        let event = transition(&sub, SubscriptionCommand::Cancel, now()).unwrap();
        sub.apply(&event);

        assert_eq!(sub.state, SubscriptionState::Cancelled);
        assert_eq!(sub.end, now());
        assert_eq!(sub.paused_at, None);
        assert!(sub.is_consistent());
    }

    #[test]
    fn cancel_from_terminal_states() {
        let end = now() + Duration::days(1);

        assert!(matches!(
            validate(&subscription(SubscriptionState::Cancelled, end), SubscriptionCommand::Cancel, now()),
            Err(LifecycleError::AlreadyCancelled)
        ));
        for state in [SubscriptionState::Expired, SubscriptionState::Failed] {
            assert!(matches!(
                validate(&subscription(state, end), SubscriptionCommand::Cancel, now()),
                Err(LifecycleError::InvalidState(s)) if s == state
            ));
        }
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = SubscriptionEvent::Paused { at: now() };

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "paused");
    }
}
