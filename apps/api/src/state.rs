use market_application::{LoginThrottleService, UserService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub login_throttle_service: LoginThrottleService,
    pub frontend_url: String,
    pub admin_reset_token: String,
}
