pub mod home;
pub mod oauth;
pub mod publish;
pub mod upload;

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::SET_COOKIE;
use axum::response::{Html, Response};
use tower_http::services::ServeDir;

use crate::AppState;
use crate::platforms::Platform;
use crate::services::session::{Flash, PendingPost};

/// Build all routes for the app, plus static serving of generated images.
pub fn build_routes(images_dir: &Path) -> Router<Arc<AppState>> {
    Router::new()
        .merge(home::routes())
        .merge(upload::routes())
        .merge(oauth::routes())
        .merge(publish::routes())
        .nest_service("/images", ServeDir::new(images_dir))
}

/// Attach a Set-Cookie header (if the session was just created).
pub fn with_session_cookie(mut response: Response, cookie: Option<HeaderValue>) -> Response {
    if let Some(cookie) = cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

/// Minimal HTML escaping for user-controlled text in the rendered pages.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn flash_html(flash: &Flash) -> String {
    let mut out = String::new();
    if let Some(error) = &flash.error {
        out.push_str(&format!("<p class=\"flash error\">{}</p>\n", escape(error)));
    }
    if let Some(warning) = &flash.warning {
        out.push_str(&format!("<p class=\"flash warning\">{}</p>\n", escape(warning)));
    }
    if let Some(success) = &flash.success {
        out.push_str(&format!("<p class=\"flash success\">{}</p>\n", escape(success)));
    }
    out
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body>\n</html>",
        escape(title),
        body
    ))
}

/// Render the review surface: transcript excerpt, draft text, image preview
/// (if any), and the current per-platform authentication status.
pub async fn render_review(
    state: &AppState,
    sid: &str,
    pending: &PendingPost,
    post_text_override: Option<&str>,
) -> Html<String> {
    let flash = state.sessions.take_flash(sid).await;
    let draft_text = post_text_override.unwrap_or(&pending.draft_text);
    let transcript_excerpt: String = pending.transcript_text.chars().take(500).collect();

    let image_html = match &pending.image_web_url {
        Some(url) => format!(
            "<h2>Suggested image</h2>\n<img src=\"{}\" alt=\"Suggested image\" width=\"400\">\n",
            escape(url)
        ),
        None => String::new(),
    };

    let mut auth_html = String::from("<h2>Platforms</h2>\n<ul>\n");
    for platform in [Platform::LinkedIn, Platform::Facebook, Platform::Instagram] {
        let authenticated = state.sessions.authenticated(sid, platform).await;
        let slug = platform.as_str().to_lowercase();
        if authenticated {
            auth_html.push_str(&format!("<li>{}: connected</li>\n", platform));
        } else {
            auth_html.push_str(&format!(
                "<li>{}: <a href=\"/auth/{}\">connect</a></li>\n",
                platform, slug
            ));
        }
    }
    auth_html.push_str("</ul>\n");

    let body = format!(
        "{flash}<h1>Review: {title}</h1>\n\
         <h2>Transcript</h2>\n<blockquote>{transcript}</blockquote>\n\
         <h2>Draft</h2>\n{image}\
         <form method=\"post\" action=\"/post/social\">\n\
         <textarea name=\"post_text\" rows=\"12\" cols=\"80\">{draft}</textarea><br>\n\
         <label>Platforms (comma separated):\n\
         <input type=\"text\" name=\"platforms\" value=\"linkedin\"></label>\n\
         <button type=\"submit\">Publish</button>\n\
         </form>\n\
         {auth}<p><a href=\"/\">Back</a></p>",
        flash = flash_html(&flash),
        title = escape(pending.video_title.as_deref().unwrap_or("Video Content Analysis")),
        transcript = escape(&transcript_excerpt),
        image = image_html,
        draft = escape(draft_text),
        auth = auth_html,
    );

    page("Review draft", &body)
}
