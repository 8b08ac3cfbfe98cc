//! Campus market API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod auth;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

use market_application::{LoginAttemptStore, LoginThrottleService, UserService};
use market_core::AppError;
use market_infrastructure::{
    Argon2PasswordHasher, InMemoryLoginAttemptStore, PostgresLoginAttemptStore,
    PostgresUserRepository, RedisLoginAttemptStore,
};

use crate::api_config::{ApiConfig, ThrottleBackendConfig};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    api_config::init_tracing();

    let config = ApiConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let session_store = PostgresStore::new(pool.clone())
        .with_table_name("tower_sessions")
        .map_err(|error| {
            AppError::Validation(format!("invalid session table name configuration: {error}"))
        })?;
    session_store.migrate().await.map_err(|error| {
        AppError::Internal(format!("failed to initialize session store: {error}"))
    })?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(30)));

    let attempt_store: Arc<dyn LoginAttemptStore> = match &config.throttle_backend {
        ThrottleBackendConfig::Postgres => Arc::new(PostgresLoginAttemptStore::new(pool.clone())),
        ThrottleBackendConfig::Redis { url, key_prefix } => {
            let client = redis::Client::open(url.as_str()).map_err(|error| {
                AppError::Validation(format!("invalid REDIS_URL: {error}"))
            })?;
            Arc::new(RedisLoginAttemptStore::new(client, key_prefix.clone()))
        }
        ThrottleBackendConfig::Memory => Arc::new(InMemoryLoginAttemptStore::new()),
    };

    let login_throttle_service =
        LoginThrottleService::new(attempt_store, config.throttle_policy.clone());

    let user_repository = Arc::new(PostgresUserRepository::new(pool.clone()));
    let password_hasher = Arc::new(Argon2PasswordHasher::new());
    let user_service = UserService::new(
        user_repository,
        password_hasher,
        login_throttle_service.clone(),
    );

    let app_state = AppState {
        user_service,
        login_throttle_service,
        frontend_url: config.frontend_url.clone(),
        admin_reset_token: config.admin_reset_token.clone(),
    };

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route_layer(from_fn(middleware::require_auth));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&config.frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    // Only the two cookie-authenticated POST routes sit behind the origin
    // guard; the admin reset is called without browser headers.
    let session_routes = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::reject_foreign_origins,
        ))
        .merge(protected_routes);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route(
            "/admin/rate-limits/reset",
            post(handlers::admin::reset_rate_limits_handler),
        )
        .merge(session_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(session_layer)
        .with_state(app_state);

    let address = config.socket_address()?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "market-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
