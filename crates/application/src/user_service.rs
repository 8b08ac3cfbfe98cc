//! Account service: login orchestration over the throttle and user store.

mod login;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use market_core::AppResult;
use market_domain::User;

use crate::LoginThrottleService;

/// Persistence port for marketplace accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds an account by lowercased email.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
}

/// Password hashing port.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password for storage.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Result of a login attempt.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// Credentials verified; session should be established.
    Authenticated(User),
    /// Wrong credentials or unknown account; message stays generic.
    Failed,
    /// The session throttle refuses the attempt.
    Locked {
        /// Deadline after which attempts are accepted again.
        lockout_until: Option<DateTime<Utc>>,
    },
}

/// Application service for account authentication.
#[derive(Clone)]
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    login_throttle: LoginThrottleService,
}

impl UserService {
    /// Creates a user service.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        login_throttle: LoginThrottleService,
    ) -> Self {
        Self {
            user_repository,
            password_hasher,
            login_throttle,
        }
    }
}
