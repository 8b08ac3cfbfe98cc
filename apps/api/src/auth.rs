mod password;
mod session;
#[cfg(test)]
mod tests;

pub use password::login_handler;
pub use session::{logout_handler, me_handler};

pub const SESSION_USER_KEY: &str = "user_identity";
/// Stable per-browser-session token used as the login throttle key.
pub(super) const SESSION_THROTTLE_KEY: &str = "login_throttle_key";
