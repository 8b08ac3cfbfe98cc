//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod rate_limit;
mod user;

pub use rate_limit::{
    DEFAULT_DECAY_INTERVAL_SECONDS, RateLimitRecord, ThrottleState, decayed_attempts,
};
pub use user::{User, UserId};
