//! Redis-backed login attempt store.
//!
//! Records live in one hash per session key. The failure write runs as a Lua
//! script, which Redis executes atomically, giving the same lost-update
//! protection the PostgreSQL adapter gets from its conditional upsert.
//! Timestamps are stored at epoch-second resolution.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use redis::Script;

use market_application::{FailureRecorded, LoginAttemptStore, LoginThrottlePolicy};
use market_core::{AppError, AppResult};
use market_domain::RateLimitRecord;

const RECORD_FAILURE_SCRIPT: &str = r#"
local attempts = tonumber(redis.call('HGET', KEYS[1], 'failed_attempts') or '0')
local last = tonumber(redis.call('HGET', KEYS[1], 'last_failed_at') or '0')
local lockout = tonumber(redis.call('HGET', KEYS[1], 'lockout_until') or '0')
local now = tonumber(ARGV[1])
local decay = tonumber(ARGV[2])
local max_attempts = tonumber(ARGV[3])
local lockout_secs = tonumber(ARGV[4])

if last > 0 then
  local elapsed = now - last
  if elapsed > 0 then
    attempts = attempts - math.floor(elapsed / decay)
    if attempts < 0 then attempts = 0 end
  end
end

attempts = attempts + 1
if attempts >= max_attempts then
  lockout = now + lockout_secs
end

redis.call('HSET', KEYS[1],
  'failed_attempts', attempts,
  'last_failed_at', now,
  'lockout_until', lockout)

return {attempts, lockout}
"#;

/// Redis implementation of the login attempt store port.
#[derive(Clone)]
pub struct RedisLoginAttemptStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisLoginAttemptStore {
    /// Creates a store with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, session_key: &str) -> String {
        format!("{}:{session_key}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| {
                tracing::error!(%error, "login attempt store connection failed");
                AppError::Internal(format!("failed to connect to redis: {error}"))
            })
    }
}

#[async_trait]
impl LoginAttemptStore for RedisLoginAttemptStore {
    async fn load(&self, session_key: &str) -> AppResult<Option<RateLimitRecord>> {
        let mut connection = self.connection().await?;

        let (attempts, last_failed_epoch, lockout_epoch): (
            Option<i32>,
            Option<i64>,
            Option<i64>,
        ) = redis::cmd("HMGET")
            .arg(self.key_for(session_key))
            .arg("failed_attempts")
            .arg("last_failed_at")
            .arg("lockout_until")
            .query_async(&mut connection)
            .await
            .map_err(|error| {
                tracing::error!(%error, "login attempt store read failed");
                AppError::Internal(format!("failed to load login throttle record: {error}"))
            })?;

        let Some(attempts) = attempts else {
            return Ok(None);
        };

        Ok(Some(RateLimitRecord {
            failed_attempts: attempts,
            last_failed_at: epoch_to_timestamp(last_failed_epoch.unwrap_or(0))?,
            lockout_until: epoch_to_timestamp(lockout_epoch.unwrap_or(0))?,
        }))
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

        let mut connection = self.connection().await?;

        let script = Script::new(RECORD_FAILURE_SCRIPT);
        let (attempts, lockout_epoch): (i64, i64) = script
            .key(self.key_for(session_key))
            .arg(now.timestamp())
            .arg(policy.decay_interval_seconds)
            .arg(policy.max_attempts)
            .arg(policy.lockout_seconds)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                tracing::error!(%error, "login attempt store write failed");
                AppError::Internal(format!("failed to record login failure: {error}"))
            })?;

        let attempts = i32::try_from(attempts)
            .map_err(|error| AppError::Internal(format!("invalid redis attempt count: {error}")))?;

        Ok(FailureRecorded {
            attempts,
            lockout_until: epoch_to_timestamp(lockout_epoch)?,
        })
    }

    async fn clear(&self, session_key: &str) -> AppResult<()> {
        let mut connection = self.connection().await?;

        redis::cmd("DEL")
            .arg(self.key_for(session_key))
            .query_async::<()>(&mut connection)
            .await
            .map_err(|error| {
                tracing::error!(%error, "login attempt store reset failed");
                AppError::Internal(format!("failed to reset login throttle record: {error}"))
            })
    }

    async fn clear_all(&self) -> AppResult<u64> {
        let mut connection = self.connection().await?;
        let pattern = format!("{}:*", self.key_prefix);

        let mut cursor = 0_u64;
        let mut affected = 0_u64;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern.as_str())
                .arg("COUNT")
                .arg(100)
                .query_async(&mut connection)
                .await
                .map_err(|error| {
                    tracing::error!(%error, "login attempt store bulk reset failed");
                    AppError::Internal(format!("failed to scan login throttle records: {error}"))
                })?;

            if !keys.is_empty() {
                let removed: u64 = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut connection)
                    .await
                    .map_err(|error| {
                        tracing::error!(%error, "login attempt store bulk reset failed");
                        AppError::Internal(format!(
                            "failed to reset login throttle records: {error}"
                        ))
                    })?;
                affected += removed;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(affected)
    }
}

fn epoch_to_timestamp(epoch: i64) -> AppResult<Option<DateTime<Utc>>> {
    if epoch == 0 {
        return Ok(None);
    }

    Utc.timestamp_opt(epoch, 0)
        .single()
        .map(Some)
        .ok_or_else(|| AppError::Internal(format!("invalid redis timestamp: {epoch}")))
}
