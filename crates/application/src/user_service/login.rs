use market_core::AppResult;

use super::*;

impl UserService {
    /// Authenticates a user with email and password, consulting the session
    /// throttle before and after the credential check.
    ///
    /// Throttle store failures propagate as errors so the caller fails closed;
    /// an unreachable store never lets an attempt through unchecked. Failed
    /// credentials return a generic `Failed` to prevent account enumeration.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        session_key: &str,
    ) -> AppResult<AuthOutcome> {
        let decision = self.login_throttle.check_rate_limit(session_key).await?;
        if decision.blocked {
            return Ok(AuthOutcome::Locked {
                lockout_until: decision.lockout_until,
            });
        }

        let user = self.user_repository.find_by_email(email).await?;

        let Some(user) = user else {
            // Always hash to keep unknown-email timing level with known email.
            let _ = self.password_hasher.hash_password(password);
            return self.register_failure(session_key).await;
        };

        let Some(ref stored_hash) = user.password_hash else {
            // Account without a password -- fail generically.
            let _ = self.password_hasher.hash_password(password);
            return self.register_failure(session_key).await;
        };

        let password_valid = self
            .password_hasher
            .verify_password(password, stored_hash)?;

        if !password_valid {
            return self.register_failure(session_key).await;
        }

        self.login_throttle.reset_on_success(session_key).await?;

        Ok(AuthOutcome::Authenticated(user))
    }

    async fn register_failure(&self, session_key: &str) -> AppResult<AuthOutcome> {
        let failure = self
            .login_throttle
            .record_failed_attempt(session_key)
            .await?;

        if failure.locked_out {
            return Ok(AuthOutcome::Locked {
                lockout_until: failure.lockout_until,
            });
        }

        Ok(AuthOutcome::Failed)
    }
}
