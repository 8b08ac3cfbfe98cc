//! PostgreSQL-backed login attempt store using the `login_rate_limits` table.

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use market_application::{FailureRecorded, LoginAttemptStore, LoginThrottlePolicy};
use market_core::{AppError, AppResult};
use market_domain::RateLimitRecord;

/// PostgreSQL implementation of the login attempt store port.
///
/// The failure write is a single `INSERT .. ON CONFLICT DO UPDATE` statement,
/// so decay, increment, and lockout arming always apply to the latest
/// committed row even under parallel requests for the same session.
#[derive(Clone)]
pub struct PostgresLoginAttemptStore {
    pool: PgPool,
}

impl PostgresLoginAttemptStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoginAttemptStore for PostgresLoginAttemptStore {
    async fn load(&self, session_key: &str) -> AppResult<Option<RateLimitRecord>> {
        let row = sqlx::query_as::<_, ThrottleRow>(
            r#"
            SELECT failed_attempts, last_failed_at, lockout_until
            FROM login_rate_limits
            WHERE session_key = $1
            "#,
        )
        .bind(session_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            tracing::error!(%error, "login attempt store read failed");
            AppError::Internal(format!("failed to load login throttle record: {error}"))
        })?;

        Ok(row.map(ThrottleRow::into_record))
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

        // Decay-then-increment in one conditional upsert. The decayed counter
        // expression appears twice because the lockout CASE cannot reference
        // the newly assigned column value.
        let row = sqlx::query_as::<_, ThrottleRow>(
            r#"
            INSERT INTO login_rate_limits (session_key, failed_attempts, last_failed_at, lockout_until)
            VALUES (
                $1,
                1,
                $2,
                CASE WHEN 1 >= $3 THEN $2::timestamptz + make_interval(secs => $4::float8) END
            )
            ON CONFLICT (session_key) DO UPDATE
            SET
                failed_attempts = CASE
                    WHEN login_rate_limits.last_failed_at IS NULL THEN 1
                    ELSE GREATEST(
                        0,
                        login_rate_limits.failed_attempts - GREATEST(
                            0,
                            FLOOR(EXTRACT(EPOCH FROM ($2::timestamptz - login_rate_limits.last_failed_at)) / $5)::int
                        )
                    ) + 1
                END,
                last_failed_at = $2,
                lockout_until = CASE
                    WHEN (CASE
                        WHEN login_rate_limits.last_failed_at IS NULL THEN 1
                        ELSE GREATEST(
                            0,
                            login_rate_limits.failed_attempts - GREATEST(
                                0,
                                FLOOR(EXTRACT(EPOCH FROM ($2::timestamptz - login_rate_limits.last_failed_at)) / $5)::int
                            )
                        ) + 1
                    END) >= $3
                    THEN $2::timestamptz + make_interval(secs => $4::float8)
                    ELSE login_rate_limits.lockout_until
                END
            RETURNING failed_attempts, last_failed_at, lockout_until
            "#,
        )
        .bind(session_key)
        .bind(now)
        .bind(policy.max_attempts)
        .bind(policy.lockout_seconds as f64)
        .bind(policy.decay_interval_seconds as f64)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            tracing::error!(%error, "login attempt store write failed");
            AppError::Internal(format!("failed to record login failure: {error}"))
        })?;

        Ok(FailureRecorded {
            attempts: row.failed_attempts,
            lockout_until: row.lockout_until,
        })
    }

    async fn clear(&self, session_key: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO login_rate_limits (session_key, failed_attempts, last_failed_at, lockout_until)
            VALUES ($1, 0, NULL, NULL)
            ON CONFLICT (session_key) DO UPDATE
            SET failed_attempts = 0, last_failed_at = NULL, lockout_until = NULL
            "#,
        )
        .bind(session_key)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            tracing::error!(%error, "login attempt store reset failed");
            AppError::Internal(format!("failed to reset login throttle record: {error}"))
        })?;

        Ok(())
    }

    async fn clear_all(&self) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE login_rate_limits
            SET failed_attempts = 0, last_failed_at = NULL, lockout_until = NULL
            WHERE failed_attempts <> 0
               OR last_failed_at IS NOT NULL
               OR lockout_until IS NOT NULL
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|error| {
            tracing::error!(%error, "login attempt store bulk reset failed");
            AppError::Internal(format!("failed to reset login throttle records: {error}"))
        })?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ThrottleRow {
    failed_attempts: i32,
    last_failed_at: Option<DateTime<Utc>>,
    lockout_until: Option<DateTime<Utc>>,
}

impl ThrottleRow {
    fn into_record(self) -> RateLimitRecord {
        RateLimitRecord {
            failed_attempts: self.failed_attempts,
            last_failed_at: self.last_failed_at,
            lockout_until: self.lockout_until,
        }
    }
}
