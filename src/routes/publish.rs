//! Publish endpoints: the multi-platform fan-out and the LinkedIn-only
//! shortcut. Outcome aggregation drives where the browser lands next:
//! full success goes home, anything partial re-renders the review page.

use std::sync::Arc;

use axum::Form;
use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::AppState;
use crate::platforms::Platform;
use crate::routes::{render_review, with_session_cookie};
use crate::services::publisher;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/post/social", post(post_social))
        .route("/post/linkedin", post(post_linkedin))
}

#[derive(Deserialize)]
struct SocialForm {
    post_text: String,
    /// Comma-delimited platform names, e.g. `linkedin,facebook`.
    platforms: String,
}

fn parse_platforms(raw: &str) -> (Vec<Platform>, Vec<String>) {
    let mut platforms = Vec::new();
    let mut unknown = Vec::new();
    for name in raw.split(',') {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        match Platform::parse(name) {
            Some(p) if !platforms.contains(&p) => platforms.push(p),
            Some(_) => {}
            None => unknown.push(name.to_string()),
        }
    }
    (platforms, unknown)
}

async fn post_social(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<SocialForm>,
) -> Response {
    let (sid, cookie) = state.sessions.resolve(&jar).await;

    let Some(pending) = state.sessions.pending(&sid).await else {
        state
            .sessions
            .flash_error(&sid, "No draft to publish. Upload a video first.")
            .await;
        return with_session_cookie(Redirect::to("/").into_response(), cookie);
    };

    let post_text = form.post_text.trim();
    if post_text.is_empty() {
        state.sessions.flash_error(&sid, "Post text is empty").await;
        let html = render_review(&state, &sid, &pending, None).await;
        return with_session_cookie(html.into_response(), cookie);
    }

    let (platforms, unknown) = parse_platforms(&form.platforms);
    if platforms.is_empty() {
        state
            .sessions
            .flash_error(&sid, "Select at least one platform")
            .await;
        let html = render_review(&state, &sid, &pending, Some(post_text)).await;
        return with_session_cookie(html.into_response(), cookie);
    }

    let mut report = publisher::publish_selected(
        &state.sessions,
        &sid,
        &state.clients,
        &platforms,
        post_text,
        pending.image_local_path.as_deref(),
    )
    .await;
    for name in unknown {
        report.errors.push(format!("{}: Unknown platform", name));
    }

    println!(
        "Publish request for {} platform(s): {} succeeded, {} failed",
        platforms.len(),
        report.results.len(),
        report.errors.len()
    );

    if report.all_succeeded() {
        state
            .sessions
            .flash_success(&sid, format!("Posted to {}", report.results.join(", ")))
            .await;
        with_session_cookie(Redirect::to("/").into_response(), cookie)
    } else if report.any_succeeded() {
        state
            .sessions
            .flash_warning(
                &sid,
                format!(
                    "Posted to {}. Failed: {}",
                    report.results.join(", "),
                    report.errors.join("; ")
                ),
            )
            .await;
        let html = render_review(&state, &sid, &pending, Some(post_text)).await;
        with_session_cookie(html.into_response(), cookie)
    } else {
        state
            .sessions
            .flash_error(&sid, format!("Publishing failed: {}", report.errors.join("; ")))
            .await;
        let html = render_review(&state, &sid, &pending, Some(post_text)).await;
        with_session_cookie(html.into_response(), cookie)
    }
}

#[derive(Deserialize)]
struct LinkedInForm {
    /// Overrides the pending draft text when supplied.
    post_text: Option<String>,
    /// Overrides the session token when supplied (e.g. pasted manually).
    access_token: Option<String>,
}

async fn post_linkedin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LinkedInForm>,
) -> Response {
    let (sid, cookie) = state.sessions.resolve(&jar).await;
    let pending = state.sessions.pending(&sid).await;

    if let Some(token) = form.access_token.as_deref().map(str::trim) {
        if !token.is_empty() {
            state
                .sessions
                .set_token(&sid, Platform::LinkedIn, token.to_string())
                .await;
        }
    }

    // Form text wins; without it the pending draft is required. A bare
    // text submission publishes text-only even with no draft in session.
    let override_text = form
        .post_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let post_text = match (override_text, &pending) {
        (Some(text), _) => text.to_string(),
        (None, Some(pending)) => pending.draft_text.clone(),
        (None, None) => {
            state
                .sessions
                .flash_error(&sid, "No draft to publish. Upload a video first.")
                .await;
            return with_session_cookie(Redirect::to("/").into_response(), cookie);
        }
    };
    let image_path = pending.as_ref().and_then(|p| p.image_local_path.clone());

    let report = publisher::publish_selected(
        &state.sessions,
        &sid,
        &state.clients,
        &[Platform::LinkedIn],
        &post_text,
        image_path.as_deref(),
    )
    .await;

    if report.all_succeeded() {
        state
            .sessions
            .flash_success(&sid, format!("Posted to {}", report.results.join(", ")))
            .await;
        with_session_cookie(Redirect::to("/").into_response(), cookie)
    } else {
        state
            .sessions
            .flash_error(&sid, format!("Publishing failed: {}", report.errors.join("; ")))
            .await;
        match &pending {
            Some(pending) => {
                let html = render_review(&state, &sid, pending, Some(&post_text)).await;
                with_session_cookie(html.into_response(), cookie)
            }
            None => with_session_cookie(Redirect::to("/").into_response(), cookie),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::drafter::Drafter;
    use crate::extract::TranscriptExtractor;
    use crate::services::session::SessionStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            config: Config {
                linkedin: None,
                facebook: None,
                openai_api_key: None,
                upload_dir: "uploads".into(),
                images_dir: "images".into(),
                port: 0,
            },
            sessions: SessionStore::new(),
            extractor: TranscriptExtractor::new(None),
            drafter: Drafter::new(None, "images".into()),
            clients: HashMap::new(),
        })
    }

    #[tokio::test]
    async fn linkedin_publish_without_a_draft_accepts_form_text() {
        let state = test_state();
        let app = routes().with_state(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/post/linkedin")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("post_text=hello+from+the+form"))
                    .unwrap(),
            )
            .await
            .unwrap();

        // Rejected for lack of a credential, not for lack of a draft.
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        let sid = set_cookie
            .split(';')
            .next()
            .unwrap()
            .trim_start_matches("session_id=")
            .to_string();

        let flash = state.sessions.take_flash(&sid).await;
        let error = flash.error.unwrap();
        assert!(error.contains("LinkedIn: Not authenticated"));
        assert!(!error.contains("No draft"));
    }

    #[tokio::test]
    async fn linkedin_publish_with_neither_text_nor_draft_is_rejected() {
        let state = test_state();
        let app = routes().with_state(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/post/linkedin")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(""))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        let sid = set_cookie
            .split(';')
            .next()
            .unwrap()
            .trim_start_matches("session_id=")
            .to_string();

        let flash = state.sessions.take_flash(&sid).await;
        assert!(flash.error.unwrap().contains("No draft to publish"));
    }

    #[test]
    fn platform_list_parsing_dedupes_and_reports_unknown() {
        let (platforms, unknown) = parse_platforms("linkedin, facebook,linkedin,, tiktok");
        assert_eq!(platforms, vec![Platform::LinkedIn, Platform::Facebook]);
        assert_eq!(unknown, vec!["tiktok"]);
    }

    #[test]
    fn empty_platform_list() {
        let (platforms, unknown) = parse_platforms(" , ");
        assert!(platforms.is_empty());
        assert!(unknown.is_empty());
    }
}
