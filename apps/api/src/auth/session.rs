use axum::Json;
use axum::http::StatusCode;
use tower_sessions::Session;

use market_core::{AppError, UserIdentity};

use crate::dto::MeResponse;
use crate::error::ApiResult;

use super::SESSION_USER_KEY;

/// POST /auth/logout - Destroy the current session.
pub async fn logout_handler(session: Session) -> ApiResult<StatusCode> {
    session
        .flush()
        .await
        .map_err(|error| AppError::Internal(format!("failed to destroy session: {error}")))?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - Current authenticated user.
pub async fn me_handler(session: Session) -> ApiResult<Json<MeResponse>> {
    let identity = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    Ok(Json(MeResponse {
        user_id: identity.user_id(),
        display_name: identity.display_name().to_owned(),
        email: identity.email().to_owned(),
    }))
}
