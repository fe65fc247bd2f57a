//! OAuth endpoints (/auth/{platform} and /auth/{platform}/callback).

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::SmartIpKeyExtractor,
};

use crate::AppState;
use crate::platforms::Platform;
use crate::routes::{render_review, with_session_cookie};

pub fn routes() -> Router<Arc<AppState>> {
    // Rate limit: Stricter for OAuth - 5 requests per minute to prevent abuse
    let rate_limit_config = GovernorConfigBuilder::default()
        .per_second(12)  // Refill rate
        .burst_size(5)   // Allow burst of 5 requests, then 1 per 12 seconds
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("Failed to build rate limit config");

    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config.into(),
    };

    Router::new()
        .route("/auth/{platform}", get(start_auth))
        .route("/auth/{platform}/callback", get(auth_callback))
        .layer(rate_limit_layer)
}

/// GET /auth/{platform} - redirect the browser to the provider's consent page
async fn start_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(platform): Path<String>,
) -> Response {
    let (sid, cookie) = state.sessions.resolve(&jar).await;

    let Some(platform) = Platform::parse(&platform) else {
        state
            .sessions
            .flash_error(&sid, format!("Unknown platform '{}'", platform))
            .await;
        return with_session_cookie(Redirect::to("/").into_response(), cookie);
    };

    let Some(client) = state.client(platform) else {
        state
            .sessions
            .flash_error(&sid, format!("{} is not configured on this server", platform))
            .await;
        return with_session_cookie(Redirect::to("/").into_response(), cookie);
    };

    with_session_cookie(Redirect::to(&client.build_auth_url()).into_response(), cookie)
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /auth/{platform}/callback - exchange the code, store the token
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(platform): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let (sid, cookie) = state.sessions.resolve(&jar).await;

    let Some(platform) = Platform::parse(&platform) else {
        state
            .sessions
            .flash_error(&sid, format!("Unknown platform '{}'", platform))
            .await;
        return with_session_cookie(Redirect::to("/").into_response(), cookie);
    };

    if let Some(error) = query.error {
        let detail = query.error_description.unwrap_or(error);
        state
            .sessions
            .flash_error(&sid, format!("{} authorization denied: {}", platform, detail))
            .await;
        return with_session_cookie(Redirect::to("/").into_response(), cookie);
    }

    let Some(code) = query.code else {
        state
            .sessions
            .flash_error(&sid, format!("{} callback had no authorization code", platform))
            .await;
        return with_session_cookie(Redirect::to("/").into_response(), cookie);
    };

    let Some(client) = state.client(platform) else {
        state
            .sessions
            .flash_error(&sid, format!("{} is not configured on this server", platform))
            .await;
        return with_session_cookie(Redirect::to("/").into_response(), cookie);
    };

    match client.exchange_code(&code).await {
        Ok(token) => {
            state.sessions.set_token(&sid, platform, token).await;
            state
                .sessions
                .flash_success(&sid, format!("{} connected", platform))
                .await;
        }
        Err(e) => {
            eprintln!("{} token exchange failed: {}", platform, e);
            state
                .sessions
                .flash_error(&sid, format!("{} authentication failed: {}", platform, e))
                .await;
        }
    }

    // Drop the user back on the review page when a draft is waiting.
    if let Some(pending) = state.sessions.pending(&sid).await {
        let html = render_review(&state, &sid, &pending, None).await;
        return with_session_cookie(html.into_response(), cookie);
    }

    with_session_cookie(Redirect::to("/").into_response(), cookie)
}
