use async_trait::async_trait;
use chrono::{DateTime, Utc};

use market_core::AppResult;
use market_domain::RateLimitRecord;

use super::config::LoginThrottlePolicy;

/// Persistence port for per-session failed login records.
#[async_trait]
pub trait LoginAttemptStore: Send + Sync {
    /// Loads the record for a session key. Absence is the zero state, not an
    /// error.
    async fn load(&self, session_key: &str) -> AppResult<Option<RateLimitRecord>>;

    /// Applies decay to the stored counter, increments it, stamps
    /// `last_failed_at = now`, and arms the lockout when the incremented value
    /// reaches the policy threshold.
    ///
    /// The whole step must execute as one conditional update against the
    /// latest committed row; a plain read-then-write would lose increments
    /// under parallel failed attempts for the same session.
    async fn record_failure(
        &self,
        session_key: &str,
        policy: &LoginThrottlePolicy,
        now: DateTime<Utc>,
    ) -> AppResult<FailureRecorded>;

    /// Resets the record to the zero state. Creating a zero record for an
    /// unknown key is equivalent.
    async fn clear(&self, session_key: &str) -> AppResult<()>;

    /// Resets every record; returns the number of rows changed.
    async fn clear_all(&self) -> AppResult<u64>;
}

/// Row state as returned by a failure write.
#[derive(Debug, Clone)]
pub struct FailureRecorded {
    /// Post-increment attempt count.
    pub attempts: i32,
    /// Current lockout deadline on the row, if any.
    pub lockout_until: Option<DateTime<Utc>>,
}
