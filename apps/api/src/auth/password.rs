use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tower_sessions::Session;
use uuid::Uuid;

use market_application::AuthOutcome;
use market_core::{AppError, UserIdentity};

use crate::dto::{LoginRequest, LoginResponse};
use crate::error::ApiResult;
use crate::state::AppState;

use super::{SESSION_THROTTLE_KEY, SESSION_USER_KEY};

/// POST /auth/login - Authenticate with email+password.
///
/// The throttle key is minted once per browser session and reused for every
/// attempt, so the lockout follows the client across accounts. A throttled
/// attempt answers 429 with the lockout deadline in the body.
pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<(StatusCode, Json<LoginResponse>)> {
    let throttle_key = throttle_key(&session).await?;

    let outcome = state
        .user_service
        .login(&payload.email, &payload.password, &throttle_key)
        .await?;

    match outcome {
        AuthOutcome::Authenticated(user) => {
            let identity = UserIdentity::new(
                user.id.as_uuid(),
                user.display_name.clone(),
                user.email.clone(),
            );

            // New session id on privilege change.
            session.cycle_id().await.map_err(|error| {
                AppError::Internal(format!("failed to cycle session id: {error}"))
            })?;

            session
                .insert(SESSION_USER_KEY, &identity)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to persist session identity: {error}"))
                })?;

            Ok((StatusCode::OK, Json(LoginResponse::authenticated())))
        }
        AuthOutcome::Failed => Ok((StatusCode::OK, Json(LoginResponse::failed()))),
        AuthOutcome::Locked { lockout_until } => Ok((
            StatusCode::TOO_MANY_REQUESTS,
            Json(LoginResponse::locked(lockout_until)),
        )),
    }
}

/// Returns the session's throttle key, minting one on first use.
async fn throttle_key(session: &Session) -> Result<String, AppError> {
    let existing = session
        .get::<String>(SESSION_THROTTLE_KEY)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to read session throttle key: {error}"))
        })?;

    if let Some(key) = existing {
        return Ok(key);
    }

    let minted = Uuid::new_v4().to_string();
    session
        .insert(SESSION_THROTTLE_KEY, &minted)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist session throttle key: {error}"))
        })?;

    Ok(minted)
}
