use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use market_core::{AppResult, SessionKey};

use super::config::LoginThrottlePolicy;
use super::ports::LoginAttemptStore;

/// Outcome of a read-only throttle check.
#[derive(Debug, Clone, Serialize)]
pub struct ThrottleDecision {
    /// Whether authentication for the session is currently refused.
    pub blocked: bool,
    /// Effective attempt count after decay.
    pub attempts: i32,
    /// Lockout deadline when blocked.
    pub lockout_until: Option<DateTime<Utc>>,
}

/// Outcome of recording a failed attempt.
#[derive(Debug, Clone, Serialize)]
pub struct FailedAttempt {
    /// Post-increment attempt count.
    pub attempts: i32,
    /// Whether the count is at or past the lockout threshold.
    pub locked_out: bool,
    /// Lockout deadline when armed.
    pub lockout_until: Option<DateTime<Utc>>,
}

/// Application service deciding whether a session may attempt authentication.
#[derive(Clone)]
pub struct LoginThrottleService {
    store: Arc<dyn LoginAttemptStore>,
    policy: LoginThrottlePolicy,
}

impl LoginThrottleService {
    /// Creates a throttle service over an attempt store.
    #[must_use]
    pub fn new(store: Arc<dyn LoginAttemptStore>, policy: LoginThrottlePolicy) -> Self {
        Self { store, policy }
    }

    /// Returns the active policy.
    #[must_use]
    pub fn policy(&self) -> &LoginThrottlePolicy {
        &self.policy
    }

    /// Read-only throttle decision for a session.
    ///
    /// An active lockout blocks regardless of the decayed counter; the
    /// reported attempt count is the decayed value either way, so operators
    /// see the same number the next failure write would start from.
    pub async fn check_rate_limit(&self, session_key: &str) -> AppResult<ThrottleDecision> {
        let key = SessionKey::new(session_key)?;
        let now = Utc::now();

        let record = self.store.load(key.as_str()).await?.unwrap_or_default();
        let attempts = record.decayed_attempts(now, self.policy.decay_interval_seconds);

        if record.is_locked(now) {
            return Ok(ThrottleDecision {
                blocked: true,
                attempts,
                lockout_until: record.lockout_until,
            });
        }

        Ok(ThrottleDecision {
            blocked: false,
            attempts,
            lockout_until: None,
        })
    }

    /// Records a failed credential check for the session.
    ///
    /// The store applies decay before incrementing, so bursts and slow
    /// drip-feeds are counted against the same effective window.
    pub async fn record_failed_attempt(&self, session_key: &str) -> AppResult<FailedAttempt> {
        let key = SessionKey::new(session_key)?;
        let now = Utc::now();

        let recorded = self
            .store
            .record_failure(key.as_str(), &self.policy, now)
            .await?;

        Ok(FailedAttempt {
            attempts: recorded.attempts,
            locked_out: recorded.attempts >= self.policy.max_attempts,
            lockout_until: recorded.lockout_until,
        })
    }

    /// Clears the session's record after a successful authentication.
    pub async fn reset_on_success(&self, session_key: &str) -> AppResult<()> {
        let key = SessionKey::new(session_key)?;
        self.store.clear(key.as_str()).await
    }

    /// Administrative bulk reset; returns the number of rows changed.
    pub async fn reset_all(&self) -> AppResult<u64> {
        self.store.clear_all().await
    }
}
