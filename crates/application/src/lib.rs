//! Application services and ports.

#![forbid(unsafe_code)]

mod login_throttle_service;
mod user_service;

pub use login_throttle_service::{
    FailedAttempt, FailureRecorded, LoginAttemptStore, LoginThrottlePolicy, LoginThrottleService,
    ThrottleDecision,
};
pub use user_service::{AuthOutcome, PasswordHasher, UserRepository, UserService};
