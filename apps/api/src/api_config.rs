use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use market_application::LoginThrottlePolicy;
use market_core::AppError;

/// Backend selected for the login throttle store.
#[derive(Debug, Clone)]
pub enum ThrottleBackendConfig {
    /// `login_rate_limits` table in the primary database.
    Postgres,
    /// Dedicated Redis instance; records live under `key_prefix`.
    Redis {
        url: String,
        key_prefix: String,
    },
    /// Process-local store, development only.
    Memory,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub cookie_secure: bool,
    pub admin_reset_token: String,
    pub throttle_policy: LoginThrottlePolicy,
    pub throttle_backend: ThrottleBackendConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
        let admin_reset_token = required_env("ADMIN_RESET_TOKEN")?;

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let cookie_secure = env::var("SESSION_COOKIE_SECURE")
            .unwrap_or_else(|_| "false".to_owned())
            .eq_ignore_ascii_case("true");

        let throttle_policy = load_throttle_policy()?;
        let throttle_backend = load_throttle_backend()?;

        Ok(Self {
            migrate_only,
            database_url,
            frontend_url,
            api_host,
            api_port,
            cookie_secure,
            admin_reset_token,
            throttle_policy,
            throttle_backend,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

fn load_throttle_policy() -> Result<LoginThrottlePolicy, AppError> {
    let defaults = LoginThrottlePolicy::default();

    let max_attempts = env_i32("RATE_LIMIT_MAX_ATTEMPTS", defaults.max_attempts)?;
    let lockout_seconds = env_i64("RATE_LIMIT_LOCKOUT_SECONDS", defaults.lockout_seconds)?;
    let decay_interval_seconds =
        env_i64("RATE_LIMIT_DECAY_SECONDS", defaults.decay_interval_seconds)?;

    if max_attempts <= 0 || lockout_seconds <= 0 || decay_interval_seconds <= 0 {
        return Err(AppError::Validation(
            "rate limit policy values must be greater than zero".to_owned(),
        ));
    }

    Ok(LoginThrottlePolicy::new(
        max_attempts,
        lockout_seconds,
        decay_interval_seconds,
    ))
}

fn load_throttle_backend() -> Result<ThrottleBackendConfig, AppError> {
    match env::var("RATE_LIMIT_BACKEND")
        .unwrap_or_else(|_| "postgres".to_owned())
        .as_str()
    {
        "postgres" => Ok(ThrottleBackendConfig::Postgres),
        "redis" => Ok(ThrottleBackendConfig::Redis {
            url: required_env("REDIS_URL")?,
            key_prefix: env::var("RATE_LIMIT_REDIS_PREFIX")
                .unwrap_or_else(|_| "login_rate_limit".to_owned()),
        }),
        "memory" => Ok(ThrottleBackendConfig::Memory),
        other => Err(AppError::Validation(format!(
            "RATE_LIMIT_BACKEND must be 'postgres', 'redis', or 'memory', got '{other}'"
        ))),
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn env_i32(name: &str, default: i32) -> Result<i32, AppError> {
    match env::var(name) {
        Ok(value) => value
            .parse::<i32>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        Err(_) => Ok(default),
    }
}

fn env_i64(name: &str, default: i64) -> Result<i64, AppError> {
    match env::var(name) {
        Ok(value) => value
            .parse::<i64>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        Err(_) => Ok(default),
    }
}
