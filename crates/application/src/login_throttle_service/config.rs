use market_domain::DEFAULT_DECAY_INTERVAL_SECONDS;

/// Deployment-level throttle policy.
#[derive(Debug, Clone)]
pub struct LoginThrottlePolicy {
    /// Effective attempt count at which the lockout arms.
    pub max_attempts: i32,
    /// How long a triggered lockout lasts.
    pub lockout_seconds: i64,
    /// Seconds for one failed attempt to decay.
    pub decay_interval_seconds: i64,
}

impl LoginThrottlePolicy {
    /// Creates a throttle policy.
    #[must_use]
    pub fn new(max_attempts: i32, lockout_seconds: i64, decay_interval_seconds: i64) -> Self {
        Self {
            max_attempts,
            lockout_seconds,
            decay_interval_seconds,
        }
    }
}

impl Default for LoginThrottlePolicy {
    /// 5 attempts, 15 minute lockout, one attempt recovered every 10 seconds.
    fn default() -> Self {
        Self::new(5, 15 * 60, DEFAULT_DECAY_INTERVAL_SECONDS)
    }
}
