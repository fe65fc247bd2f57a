//! Video intake: one multipart endpoint accepting either an uploaded file
//! or a YouTube URL, never both. Uploads are staged in a temp file that is
//! removed once the transcript exists.

use std::io::Write;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::routes::{render_review, with_session_cookie};
use crate::services::session::PendingPost;

const ALLOWED_VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "avi", "mov", "mkv", "webm"];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/upload", post(upload))
}

struct UploadForm {
    file_name: Option<String>,
    file_bytes: Vec<u8>,
    youtube_url: Option<String>,
}

async fn read_form(multipart: &mut Multipart) -> Result<UploadForm, String> {
    let mut form = UploadForm {
        file_name: None,
        file_bytes: Vec::new(),
        youtube_url: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Unreadable upload: {}", e))?
    {
        match field.name() {
            Some("video_file") => {
                let name = field.file_name().map(|n| n.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Unreadable upload: {}", e))?;
                // Browsers submit an empty file part when nothing was chosen.
                if name.as_deref().is_some_and(|n| !n.is_empty()) && !bytes.is_empty() {
                    form.file_name = name;
                    form.file_bytes = bytes.to_vec();
                }
            }
            Some("youtube_url") => {
                let url = field
                    .text()
                    .await
                    .map_err(|e| format!("Unreadable upload: {}", e))?;
                let url = url.trim().to_string();
                if !url.is_empty() {
                    form.youtube_url = Some(url);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

fn validate_extension(file_name: &str) -> Result<String, String> {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if ALLOWED_VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(format!(
            "Unsupported file type '{}'. Allowed: {}",
            file_name,
            ALLOWED_VIDEO_EXTENSIONS.join(", ")
        ))
    }
}

async fn upload(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let (sid, cookie) = state.sessions.resolve(&jar).await;

    match process_upload(&state, &sid, &mut multipart).await {
        Ok(pending) => {
            state.sessions.set_pending(&sid, pending.clone()).await;
            let html = render_review(&state, &sid, &pending, None).await;
            with_session_cookie(html.into_response(), cookie)
        }
        Err(message) => {
            eprintln!("Upload failed: {}", message);
            state.sessions.flash_error(&sid, message).await;
            with_session_cookie(Redirect::to("/").into_response(), cookie)
        }
    }
}

async fn process_upload(
    state: &AppState,
    _sid: &str,
    multipart: &mut Multipart,
) -> Result<PendingPost, String> {
    let form = read_form(multipart).await?;

    let transcript = match (&form.file_name, &form.youtube_url) {
        (Some(_), Some(_)) => {
            return Err("Provide either a video file or a YouTube URL, not both".to_string());
        }
        (None, None) => {
            return Err("Provide a video file or a YouTube URL".to_string());
        }
        (Some(file_name), None) => {
            let ext = validate_extension(file_name)?;
            let mut temp = tempfile::Builder::new()
                .suffix(&format!(".{}", ext))
                .tempfile_in(&state.config.upload_dir)
                .map_err(|e| format!("Could not stage upload: {}", e))?;
            temp.write_all(&form.file_bytes)
                .map_err(|e| format!("Could not stage upload: {}", e))?;
            temp.flush()
                .map_err(|e| format!("Could not stage upload: {}", e))?;

            println!(
                "Processing uploaded file '{}' ({} bytes)",
                file_name,
                form.file_bytes.len()
            );
            state
                .extractor
                .extract(&temp.path().to_string_lossy())
                .await
                .map_err(|e| e.to_string())?
            // temp drops here, removing the staged upload.
        }
        (None, Some(url)) => {
            println!("Processing video URL {}", url);
            state.extractor.extract(url).await.map_err(|e| e.to_string())?
        }
    };

    if transcript.text.trim().is_empty() {
        return Err("The video produced an empty transcript".to_string());
    }

    let draft = state
        .drafter
        .draft(&transcript.text, transcript.title.as_deref())
        .await;

    let image_web_url = draft.image_path.as_ref().and_then(|path| {
        path.file_name()
            .map(|name| format!("/images/{}", name.to_string_lossy()))
    });

    Ok(PendingPost {
        transcript_text: transcript.text,
        draft_text: draft.post_text,
        image_web_url,
        image_local_path: draft.image_path,
        video_title: transcript.title,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allowlist() {
        assert_eq!(validate_extension("clip.mp4").unwrap(), "mp4");
        assert_eq!(validate_extension("CLIP.MOV").unwrap(), "mov");
        assert!(validate_extension("malware.exe").is_err());
        assert!(validate_extension("noextension").is_err());
    }
}
