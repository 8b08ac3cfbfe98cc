//! Operational CLI for the login throttle.
//!
//! Commands:
//! - `inspect <session-key>`: print the stored record, decay projection, and
//!   lockout status for one session.
//! - `reset-all`: reset every throttle record and report rows changed.
//!
//! Reads the same environment as the API (`DATABASE_URL`, `REDIS_URL`,
//! `RATE_LIMIT_*`), so it inspects exactly what the server enforces.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use market_application::{LoginAttemptStore, LoginThrottlePolicy, LoginThrottleService};
use market_core::{AppError, AppResult};
use market_domain::ThrottleState;
use market_infrastructure::{PostgresLoginAttemptStore, RedisLoginAttemptStore};

const USAGE: &str = "usage: market-limitctl <inspect <session-key> | reset-all>";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    let command = args
        .next()
        .ok_or_else(|| AppError::Validation(USAGE.to_owned()))?;

    let store = build_store().await?;
    let policy = load_policy()?;
    let service = LoginThrottleService::new(store.clone(), policy);

    match command.as_str() {
        "inspect" => {
            let session_key = args
                .next()
                .ok_or_else(|| AppError::Validation(USAGE.to_owned()))?;
            inspect(&service, store.as_ref(), &session_key).await
        }
        "reset-all" => reset_all(&service).await,
        _ => Err(AppError::Validation(USAGE.to_owned())),
    }
}

async fn inspect(
    service: &LoginThrottleService,
    store: &dyn LoginAttemptStore,
    session_key: &str,
) -> AppResult<()> {
    let stored = store.load(session_key).await?;
    let decision = service.check_rate_limit(session_key).await?;

    let record = stored.unwrap_or_default();
    let state = match record.state(Utc::now(), service.policy().decay_interval_seconds) {
        ThrottleState::Clean => "clean",
        ThrottleState::Warning { .. } => "warning",
        ThrottleState::Locked { .. } => "locked",
    };

    let report = serde_json::json!({
        "session_key": session_key,
        "state": state,
        "stored_attempts": record.failed_attempts,
        "last_failed_at": record.last_failed_at,
        "effective_attempts": decision.attempts,
        "blocked": decision.blocked,
        "lockout_until": decision.lockout_until,
    });

    print_json(&report)
}

async fn reset_all(service: &LoginThrottleService) -> AppResult<()> {
    let affected = service.reset_all().await?;

    print_json(&serde_json::json!({ "affected": affected }))
}

fn print_json(value: &serde_json::Value) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|error| AppError::Internal(format!("failed to render report: {error}")))?;
    println!("{rendered}");
    Ok(())
}

async fn build_store() -> Result<Arc<dyn LoginAttemptStore>, AppError> {
    match env::var("RATE_LIMIT_BACKEND")
        .unwrap_or_else(|_| "postgres".to_owned())
        .as_str()
    {
        "postgres" => {
            let database_url = required_env("DATABASE_URL")?;
            let pool = PgPoolOptions::new()
                .max_connections(2)
                .connect(&database_url)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to connect to database: {error}"))
                })?;

            Ok(Arc::new(PostgresLoginAttemptStore::new(pool)))
        }
        "redis" => {
            let redis_url = required_env("REDIS_URL")?;
            let key_prefix = env::var("RATE_LIMIT_REDIS_PREFIX")
                .unwrap_or_else(|_| "login_rate_limit".to_owned());
            let client = redis::Client::open(redis_url.as_str())
                .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))?;

            Ok(Arc::new(RedisLoginAttemptStore::new(client, key_prefix)))
        }
        other => Err(AppError::Validation(format!(
            "RATE_LIMIT_BACKEND must be 'postgres' or 'redis' for limitctl, got '{other}'"
        ))),
    }
}

fn load_policy() -> Result<LoginThrottlePolicy, AppError> {
    let defaults = LoginThrottlePolicy::default();

    Ok(LoginThrottlePolicy::new(
        env_parse("RATE_LIMIT_MAX_ATTEMPTS", defaults.max_attempts)?,
        env_parse("RATE_LIMIT_LOCKOUT_SECONDS", defaults.lockout_seconds)?,
        env_parse("RATE_LIMIT_DECAY_SECONDS", defaults.decay_interval_seconds)?,
    ))
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        Err(_) => Ok(default),
    }
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
