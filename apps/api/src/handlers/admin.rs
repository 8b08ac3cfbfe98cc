use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use tracing::info;

use market_core::AppError;

use crate::dto::ResetThrottleResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /admin/rate-limits/reset - Bulk-reset every login throttle record.
///
/// Operational/test-environment surface, guarded by the deployment admin
/// token rather than a user session.
pub async fn reset_rate_limits_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ResetThrottleResponse>> {
    let provided = headers
        .get("x-admin-token")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if provided.is_empty() || provided != state.admin_reset_token {
        return Err(AppError::Unauthorized("invalid admin token".to_owned()).into());
    }

    let affected = state.login_throttle_service.reset_all().await?;

    info!(affected, "login throttle records reset");

    Ok(Json(ResetThrottleResponse { affected }))
}
