//! Login throttle domain model.
//!
//! Tracks failed login attempts per browser session. The counter decays one
//! unit per fixed interval since the most recent failure; decay is always
//! recomputed from the stored anchor timestamp at read time, never accumulated
//! through repeated partial writes. An active lockout blocks authentication
//! regardless of what the decayed counter says.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of seconds it takes for one failed attempt to decay.
pub const DEFAULT_DECAY_INTERVAL_SECONDS: i64 = 10;

/// Per-session failed login state as persisted in the attempt store.
///
/// Absence of a record is equivalent to the default zero state. Invariant:
/// `failed_attempts == 0` implies `last_failed_at` is `None`, and
/// `lockout_until` is always strictly later than the `last_failed_at` that
/// triggered it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Stored failure counter, before decay.
    pub failed_attempts: i32,
    /// Anchor timestamp of the most recent failed attempt.
    pub last_failed_at: Option<DateTime<Utc>>,
    /// While in the future, authentication for the session is refused.
    pub lockout_until: Option<DateTime<Utc>>,
}

impl RateLimitRecord {
    /// Returns the effective attempt count at `now`, after decay.
    #[must_use]
    pub fn decayed_attempts(&self, now: DateTime<Utc>, decay_interval_seconds: i64) -> i32 {
        decayed_attempts(
            self.failed_attempts,
            self.last_failed_at,
            now,
            decay_interval_seconds,
        )
    }

    /// Returns whether a lockout is active at `now`.
    ///
    /// Lockout expiry is observed lazily: an elapsed `lockout_until` simply
    /// stops matching here, it is never cleared by a background job.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.lockout_until.is_some_and(|until| until > now)
    }

    /// Classifies the record into the throttle state machine at `now`.
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>, decay_interval_seconds: i64) -> ThrottleState {
        if let Some(until) = self.lockout_until
            && until > now
        {
            return ThrottleState::Locked { until };
        }

        match self.decayed_attempts(now, decay_interval_seconds) {
            0 => ThrottleState::Clean,
            attempts => ThrottleState::Warning { attempts },
        }
    }
}

/// Throttle state machine for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleState {
    /// No effective failed attempts.
    Clean,
    /// Below the lockout threshold; counts down as attempts decay.
    Warning {
        /// Effective attempt count after decay.
        attempts: i32,
    },
    /// Authentication refused until the deadline passes.
    Locked {
        /// Lockout deadline.
        until: DateTime<Utc>,
    },
}

/// Computes the effective attempt count after time-based decay.
///
/// One attempt is recovered for every full `decay_interval_seconds` elapsed
/// since `last_failed_at`. The result is never negative, and a record with no
/// anchor timestamp does not decay.
#[must_use]
pub fn decayed_attempts(
    attempts: i32,
    last_failed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    decay_interval_seconds: i64,
) -> i32 {
    let attempts = attempts.max(0);

    let Some(anchor) = last_failed_at else {
        return attempts;
    };

    if decay_interval_seconds <= 0 {
        return attempts;
    }

    let elapsed_seconds = (now - anchor).num_seconds().max(0);
    let recovered = elapsed_seconds / decay_interval_seconds;
    let remaining = i64::from(attempts).saturating_sub(recovered).max(0);

    i32::try_from(remaining).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    use super::{
        DEFAULT_DECAY_INTERVAL_SECONDS, RateLimitRecord, ThrottleState, decayed_attempts,
    };

    #[test]
    fn zero_state_record_is_clean() {
        let record = RateLimitRecord::default();
        let now = Utc::now();

        assert!(!record.is_locked(now));
        assert_eq!(
            record.state(now, DEFAULT_DECAY_INTERVAL_SECONDS),
            ThrottleState::Clean
        );
    }

    #[test]
    fn attempts_without_anchor_do_not_decay() {
        let now = Utc::now();
        assert_eq!(decayed_attempts(3, None, now, 10), 3);
    }

    #[test]
    fn two_attempts_decay_to_zero_after_twenty_five_seconds() {
        let now = Utc::now();
        let record = RateLimitRecord {
            failed_attempts: 2,
            last_failed_at: Some(now - Duration::seconds(25)),
            lockout_until: None,
        };

        assert_eq!(record.decayed_attempts(now, 10), 0);
        assert_eq!(record.state(now, 10), ThrottleState::Clean);
    }

    #[test]
    fn partial_decay_keeps_the_remainder() {
        let now = Utc::now();
        let record = RateLimitRecord {
            failed_attempts: 4,
            last_failed_at: Some(now - Duration::seconds(19)),
            lockout_until: None,
        };

        // 19 seconds is one full interval, not two.
        assert_eq!(record.decayed_attempts(now, 10), 3);
    }

    #[test]
    fn active_lockout_wins_over_decay() {
        let now = Utc::now();
        let record = RateLimitRecord {
            failed_attempts: 5,
            last_failed_at: Some(now - Duration::seconds(500)),
            lockout_until: Some(now + Duration::seconds(400)),
        };

        assert!(record.is_locked(now));
        assert!(matches!(
            record.state(now, 10),
            ThrottleState::Locked { .. }
        ));
    }

    #[test]
    fn expired_lockout_is_observed_lazily() {
        let now = Utc::now();
        let record = RateLimitRecord {
            failed_attempts: 5,
            last_failed_at: Some(now - Duration::seconds(901)),
            lockout_until: Some(now - Duration::seconds(1)),
        };

        assert!(!record.is_locked(now));
        // Decay has run down the counter by the time the lockout elapsed.
        assert_eq!(record.state(now, 10), ThrottleState::Clean);
    }

    proptest! {
        #[test]
        fn decay_never_goes_negative(
            attempts in 0_i32..1_000,
            elapsed_seconds in 0_i64..1_000_000,
        ) {
            let now = Utc::now();
            let anchor = now - Duration::seconds(elapsed_seconds);
            let decayed = decayed_attempts(attempts, Some(anchor), now, 10);

            prop_assert!(decayed >= 0);
            prop_assert!(decayed <= attempts);
        }

        #[test]
        fn full_decay_after_interval_times_attempts(
            attempts in 0_i32..1_000,
            extra_seconds in 0_i64..10_000,
        ) {
            let now = Utc::now();
            let elapsed = i64::from(attempts) * 10 + extra_seconds;
            let anchor = now - Duration::seconds(elapsed);

            prop_assert_eq!(decayed_attempts(attempts, Some(anchor), now, 10), 0);
        }

        #[test]
        fn decay_is_monotone_in_elapsed_time(
            attempts in 0_i32..1_000,
            earlier in 0_i64..100_000,
            later_delta in 0_i64..100_000,
        ) {
            let now = Utc::now();
            let anchor_recent = now - Duration::seconds(earlier);
            let anchor_old = now - Duration::seconds(earlier + later_delta);

            let recent = decayed_attempts(attempts, Some(anchor_recent), now, 10);
            let old = decayed_attempts(attempts, Some(anchor_old), now, 10);

            prop_assert!(old <= recent);
        }
    }
}
