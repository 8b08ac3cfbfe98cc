use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Incoming payload for email/password login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Auth status response for the login flow.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockout_until: Option<DateTime<Utc>>,
}

impl LoginResponse {
    pub fn authenticated() -> Self {
        Self {
            status: "authenticated",
            lockout_until: None,
        }
    }

    pub fn failed() -> Self {
        Self {
            status: "failed",
            lockout_until: None,
        }
    }

    pub fn locked(lockout_until: Option<DateTime<Utc>>) -> Self {
        Self {
            status: "locked",
            lockout_until,
        }
    }
}

/// Current authenticated user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: String,
}

/// Administrative throttle reset result.
#[derive(Debug, Serialize)]
pub struct ResetThrottleResponse {
    pub affected: u64,
}

/// Health probe response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
