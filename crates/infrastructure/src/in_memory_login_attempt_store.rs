//! In-memory login attempt store for development and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use market_application::{FailureRecorded, LoginAttemptStore, LoginThrottlePolicy};
use market_core::{AppError, AppResult};
use market_domain::RateLimitRecord;

/// Process-local implementation of the login attempt store port.
///
/// Holds the mutex across the whole decay-increment-lock step, matching the
/// atomicity the persistent adapters provide. State does not survive a
/// restart, so this backend is only suitable for development.
#[derive(Default)]
pub struct InMemoryLoginAttemptStore {
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl InMemoryLoginAttemptStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(
        &self,
    ) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, RateLimitRecord>>> {
        self.records
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock store state: {error}")))
    }
}

#[async_trait]
impl LoginAttemptStore for InMemoryLoginAttemptStore {
    async fn load(&self, session_key: &str) -> AppResult<Option<RateLimitRecord>> {
        Ok(self.locked()?.get(session_key).cloned())
    }

    async fn record_failure(
        &self,
        session_key: &str,
        policy: &LoginThrottlePolicy,
        now: DateTime<Utc>,
    ) -> AppResult<FailureRecorded> {
        if policy.decay_interval_seconds <= 0 || policy.lockout_seconds <= 0 {
            return Err(AppError::Validation(
                "throttle policy intervals must be greater than zero".to_owned(),
            ));
        }

        let mut records = self.locked()?;
        let record = records.entry(session_key.to_owned()).or_default();

        let attempts = record.decayed_attempts(now, policy.decay_interval_seconds) + 1;
        record.failed_attempts = attempts;
        record.last_failed_at = Some(now);
        if attempts >= policy.max_attempts {
            record.lockout_until = Some(now + Duration::seconds(policy.lockout_seconds));
        }

        Ok(FailureRecorded {
            attempts,
            lockout_until: record.lockout_until,
        })
    }

    async fn clear(&self, session_key: &str) -> AppResult<()> {
        self.locked()?
            .insert(session_key.to_owned(), RateLimitRecord::default());
        Ok(())
    }

    async fn clear_all(&self) -> AppResult<u64> {
        let mut records = self.locked()?;

        let mut affected = 0_u64;
        for record in records.values_mut() {
            if *record != RateLimitRecord::default() {
                *record = RateLimitRecord::default();
                affected += 1;
            }
        }

        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use market_application::{LoginAttemptStore, LoginThrottlePolicy};
    use market_core::AppError;

    use super::InMemoryLoginAttemptStore;

    #[tokio::test]
    async fn failures_accumulate_and_arm_the_lockout() {
        let store = InMemoryLoginAttemptStore::new();
        let policy = LoginThrottlePolicy::default();
        let now = Utc::now();

        for expected in 1..=4 {
            let recorded = store.record_failure("sess", &policy, now).await;
            assert!(recorded.as_ref().is_ok_and(|recorded| {
                recorded.attempts == expected && recorded.lockout_until.is_none()
            }));
        }

        let fifth = store.record_failure("sess", &policy, now).await;
        assert!(fifth.is_ok_and(|recorded| {
            recorded.attempts == 5
                && recorded
                    .lockout_until
                    .is_some_and(|until| until == now + Duration::seconds(900))
        }));
    }

    #[tokio::test]
    async fn decay_is_applied_before_the_increment() {
        let store = InMemoryLoginAttemptStore::new();
        let policy = LoginThrottlePolicy::default();
        let first = Utc::now() - Duration::seconds(30);

        let (Ok(_), Ok(_)) = (
            store.record_failure("sess", &policy, first).await,
            store.record_failure("sess", &policy, first).await,
        ) else {
            panic!("seeding failures errored");
        };

        // 30 seconds later both attempts have decayed; the write sees 0 + 1.
        let recorded = store
            .record_failure("sess", &policy, first + Duration::seconds(30))
            .await;
        assert!(recorded.is_ok_and(|recorded| recorded.attempts == 1));
    }

    #[tokio::test]
    async fn parallel_failures_lose_no_increments() {
        let store = InMemoryLoginAttemptStore::new();
        let policy = LoginThrottlePolicy::default();
        let now = Utc::now();

        let (a, b, c, d, e) = tokio::join!(
            store.record_failure("sess", &policy, now),
            store.record_failure("sess", &policy, now),
            store.record_failure("sess", &policy, now),
            store.record_failure("sess", &policy, now),
            store.record_failure("sess", &policy, now),
        );
        for result in [a, b, c, d, e] {
            assert!(result.is_ok());
        }

        let record = store.load("sess").await;
        assert!(record.is_ok_and(|record| {
            record.is_some_and(|record| record.failed_attempts == 5 && record.is_locked(now))
        }));
    }

    #[tokio::test]
    async fn non_positive_policy_intervals_are_rejected() {
        let store = InMemoryLoginAttemptStore::new();
        let policy = LoginThrottlePolicy::new(5, 900, 0);

        let result = store.record_failure("sess", &policy, Utc::now()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn clear_all_reports_only_dirty_records() {
        let store = InMemoryLoginAttemptStore::new();
        let policy = LoginThrottlePolicy::default();
        let now = Utc::now();

        let Ok(_) = store.record_failure("dirty", &policy, now).await else {
            panic!("seeding failure errored");
        };
        let Ok(()) = store.clear("already-clean").await else {
            panic!("seeding clean record errored");
        };

        let affected = store.clear_all().await;
        assert!(affected.is_ok_and(|affected| affected == 1));

        let record = store.load("dirty").await;
        assert!(record.is_ok_and(|record| {
            record.is_some_and(|record| record.failed_attempts == 0)
        }));
    }
}
