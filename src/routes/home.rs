//! Landing page: upload form plus this session's publish history.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::routes::{escape, flash_html, page, with_session_cookie};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(home))
}

async fn home(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let (sid, cookie) = state.sessions.resolve(&jar).await;
    let flash = state.sessions.take_flash(&sid).await;
    let posted = state.sessions.posted(&sid).await;

    let mut posted_html = String::new();
    if !posted.is_empty() {
        posted_html.push_str("<h2>Posted this session</h2>\n<table border=\"1\">\n");
        posted_html.push_str("<tr><th>Platform</th><th>Content</th><th>Post ID</th><th>Status</th></tr>\n");
        for record in &posted {
            posted_html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                record.platform,
                escape(&record.content_excerpt),
                escape(&record.post_id),
                escape(&record.status),
            ));
        }
        posted_html.push_str("</table>\n");
    }

    let body = format!(
        "{flash}<h1>Video to Social Post</h1>\n\
         <form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\n\
         <p><label>Video file: <input type=\"file\" name=\"video_file\" accept=\"video/*\"></label></p>\n\
         <p><label>Or YouTube URL: <input type=\"text\" name=\"youtube_url\" size=\"60\"></label></p>\n\
         <button type=\"submit\">Generate draft</button>\n\
         </form>\n\
         {posted}",
        flash = flash_html(&flash),
        posted = posted_html,
    );

    with_session_cookie(page("Video to Social Post", &body).into_response(), cookie)
}
