use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::routing::post;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use market_application::{
    LoginThrottlePolicy, LoginThrottleService, PasswordHasher, UserRepository, UserService,
};
use market_core::AppResult;
use market_domain::User;
use market_infrastructure::InMemoryLoginAttemptStore;

use crate::state::AppState;

struct EmptyUserRepository;

#[async_trait]
impl UserRepository for EmptyUserRepository {
    async fn find_by_email(&self, _email: &str) -> AppResult<Option<User>> {
        Ok(None)
    }
}

struct RejectAllHasher;

impl PasswordHasher for RejectAllHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        Ok(password.to_owned())
    }

    fn verify_password(&self, _password: &str, _hash: &str) -> AppResult<bool> {
        Ok(false)
    }
}

fn login_router() -> Router {
    let throttle = LoginThrottleService::new(
        Arc::new(InMemoryLoginAttemptStore::new()),
        LoginThrottlePolicy::default(),
    );
    let user_service = UserService::new(
        Arc::new(EmptyUserRepository),
        Arc::new(RejectAllHasher),
        throttle.clone(),
    );
    let state = AppState {
        user_service,
        login_throttle_service: throttle,
        frontend_url: "http://localhost:3000".to_owned(),
        admin_reset_token: "testing".to_owned(),
    };

    Router::new()
        .route("/auth/login", post(super::login_handler))
        .layer(SessionManagerLayer::new(MemoryStore::default()))
        .with_state(state)
}

fn login_request(cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie.to_owned());
    }

    let Ok(request) = builder.body(Body::from(
        r#"{"email":"ghost@campus.edu","password":"nope"}"#,
    )) else {
        panic!("failed to build login request");
    };
    request
}

#[tokio::test]
async fn fifth_failed_login_answers_with_429() {
    let router = login_router();

    let Ok(first) = router.clone().oneshot(login_request(None)).await else {
        unreachable!()
    };
    assert_eq!(first.status(), StatusCode::OK);

    // Later attempts carry the session cookie so they share the throttle key.
    let cookie = first
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_owned);
    let Some(cookie) = cookie else {
        panic!("login response carried no session cookie");
    };

    for _ in 0..3 {
        let Ok(response) = router.clone().oneshot(login_request(Some(&cookie))).await else {
            unreachable!()
        };
        assert_eq!(response.status(), StatusCode::OK);
    }

    let Ok(fifth) = router.clone().oneshot(login_request(Some(&cookie))).await else {
        unreachable!()
    };
    assert_eq!(fifth.status(), StatusCode::TOO_MANY_REQUESTS);
}
