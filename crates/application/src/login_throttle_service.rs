//! Login throttle ports and application service.
//!
//! Session-keyed failed-attempt tracking with time decay and a timed lockout,
//! backed by the `login_rate_limits` table. The browser session token is the
//! throttle key, so the policy applies per client rather than per account.

mod config;
mod ports;
mod service;

pub use config::LoginThrottlePolicy;
pub use ports::{FailureRecorded, LoginAttemptStore};
pub use service::{FailedAttempt, LoginThrottleService, ThrottleDecision};
