//! Session cookie construction.
//!
//! Centralizes cookie formatting so every handler that creates a session
//! emits the same attributes.

use axum::http::HeaderValue;

/// Session id cookie name
pub const SESSION_COOKIE_NAME: &str = "session_id";
/// Session cookie max-age in seconds (8 hours; state is in-memory anyway)
pub const SESSION_MAX_AGE_SECS: u32 = 8 * 60 * 60;

fn is_dev() -> bool {
    std::env::var("ENV").as_deref() != Ok("prod")
}

/// Build the Set-Cookie header installing a session id.
pub fn build_session_cookie(session_id: &str) -> HeaderValue {
    let secure = if is_dev() { "" } else { " Secure;" };
    format!(
        "{}={}; HttpOnly;{} SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE_NAME, session_id, secure, SESSION_MAX_AGE_SECS
    )
    .parse()
    .expect("session id is base64url, cookie string always parses")
}
