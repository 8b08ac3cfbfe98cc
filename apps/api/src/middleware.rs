//! Request guards for the session routes.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use tower_sessions::Session;

use market_core::{AppError, UserIdentity};

use crate::auth::SESSION_USER_KEY;
use crate::error::ApiResult;
use crate::state::AppState;

/// Rejects the request unless the session carries an authenticated identity.
///
/// The identity is attached as a request extension for downstream handlers.
pub async fn require_auth(
    session: Session,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("login required".to_owned()))?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Refuses login and logout requests that did not come from the frontend.
///
/// Both routes are POST-only and cookie-authenticated, so a request minted by
/// another site must be turned away before it reaches the handler. Requests
/// carrying no origin headers at all are refused too; the admin surface lives
/// outside this guard.
pub async fn reject_foreign_origins(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let headers = request.headers();
    let fetch_site = headers
        .get("sec-fetch-site")
        .and_then(|value| value.to_str().ok());
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    let referer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok());

    if !browser_request_allowed(fetch_site, origin, referer, &state.frontend_url) {
        return Err(AppError::Forbidden("request origin not accepted".to_owned()).into());
    }

    Ok(next.run(request).await)
}

fn browser_request_allowed(
    fetch_site: Option<&str>,
    origin: Option<&str>,
    referer: Option<&str>,
    frontend_url: &str,
) -> bool {
    // Fetch metadata is browser-asserted and cannot be spoofed by page script.
    if fetch_site == Some("cross-site") {
        return false;
    }

    let origin_matches = origin == Some(frontend_url);
    let referer_matches = referer.is_some_and(|referer| referer.starts_with(frontend_url));

    origin_matches || referer_matches
}
