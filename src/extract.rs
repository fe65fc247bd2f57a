//! Transcript extraction: yt-dlp for URL sources, a speech-to-text API call
//! for the actual transcription. Downloads land in a scoped temp directory
//! that is removed on every exit path.

use std::path::Path;

use reqwest::Client;
use serde::Deserialize;
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;

const TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const TRANSCRIPTION_MODEL: &str = "whisper-1";

const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "mkv"];

#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    pub segments: Vec<Segment>,
    pub title: Option<String>,
}

#[derive(Debug)]
pub enum ExtractError {
    Download(String),
    Transcription(String),
    Http(reqwest::Error),
    Io(std::io::Error),
}

impl From<reqwest::Error> for ExtractError {
    fn from(e: reqwest::Error) -> Self {
        ExtractError::Http(e)
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        ExtractError::Io(e)
    }
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Download(s) => write!(f, "Video download failed: {}", s),
            ExtractError::Transcription(s) => write!(f, "Transcription failed: {}", s),
            ExtractError::Http(e) => write!(f, "HTTP error: {}", e),
            ExtractError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
    #[serde(default)]
    segments: Vec<Segment>,
}

pub struct TranscriptExtractor {
    api_key: Option<String>,
    yt_dlp_path: String,
    http: Client,
}

impl TranscriptExtractor {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            yt_dlp_path: "yt-dlp".to_string(),
            http: Client::new(),
        }
    }

    /// Dispatch on source shape: URLs are downloaded first, file paths go
    /// straight to transcription.
    pub async fn extract(&self, source: &str) -> Result<Transcript, ExtractError> {
        if is_url(source) {
            self.extract_from_url(source).await
        } else {
            self.extract_from_file(Path::new(source)).await
        }
    }

    async fn extract_from_url(&self, url: &str) -> Result<Transcript, ExtractError> {
        let temp_dir = TempDir::new()?;

        // Title and duration first, so a failed download still names what
        // it was trying to fetch.
        let info = self.video_info(url).await?;
        let title = info
            .get("title")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string());
        if let Some(duration) = info.get("duration").and_then(|d| d.as_f64()) {
            println!("Downloading '{}' ({}s)", title.as_deref().unwrap_or("unknown"), duration);
        }

        let output_template = temp_dir.path().join("%(title)s.%(ext)s");
        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--format",
                "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
                "--output",
                &output_template.to_string_lossy(),
                "--no-playlist",
                "--quiet",
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Download(stderr.into_owned()));
        }

        let downloaded = find_downloaded_file(temp_dir.path())?;
        let mut transcript = self.extract_from_file(&downloaded).await?;
        transcript.title = title;

        // temp_dir drops here, removing the downloaded media.
        Ok(transcript)
    }

    async fn video_info(&self, url: &str) -> Result<serde_json::Value, ExtractError> {
        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--no-playlist", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Download(format!("yt-dlp failed: {}", stderr)));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractError::Download(format!("unreadable yt-dlp metadata: {}", e)))
    }

    async fn extract_from_file(&self, file_path: &Path) -> Result<Transcript, ExtractError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ExtractError::Transcription("no transcription backend configured".to_string())
        })?;

        let data = tokio::fs::read(file_path).await?;
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());

        let form = reqwest::multipart::Form::new()
            .text("model", TRANSCRIPTION_MODEL)
            .text("response_format", "verbose_json")
            .part("file", reqwest::multipart::Part::bytes(data).file_name(file_name));

        let resp = self
            .http
            .post(TRANSCRIPTIONS_URL)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractError::Transcription(format!(
                "transcription endpoint returned {}: {}",
                status, body
            )));
        }

        let parsed: TranscriptionResponse = resp
            .json()
            .await
            .map_err(|e| ExtractError::Transcription(format!("unreadable response: {}", e)))?;

        println!("Transcription completed, {} characters", parsed.text.chars().count());

        Ok(Transcript {
            text: parsed.text,
            segments: parsed.segments,
            title: None,
        })
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn find_downloaded_file(dir: &Path) -> Result<std::path::PathBuf, ExtractError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        if ext.map(|e| VIDEO_EXTENSIONS.contains(&e.as_str())) == Some(true) {
            return Ok(path);
        }
    }
    Err(ExtractError::Download("no video file was downloaded".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_detection() {
        assert!(is_url("https://www.youtube.com/watch?v=abc"));
        assert!(is_url("http://youtu.be/abc"));
        assert!(!is_url("/tmp/video.mp4"));
        assert!(!is_url("video.mp4"));
    }

    #[test]
    fn finds_video_file_among_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("clip.MP4"), b"x").unwrap();
        let found = find_downloaded_file(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "clip.MP4");
    }

    #[test]
    fn empty_dir_is_a_download_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_downloaded_file(dir.path()),
            Err(ExtractError::Download(_))
        ));
    }

    #[test]
    fn verbose_json_segments_deserialize() {
        let body = r#"{
            "text": "hello world",
            "segments": [
                {"start": 0.0, "end": 1.5, "text": "hello"},
                {"start": 1.5, "end": 3.0, "text": "world"}
            ]
        }"#;
        let parsed: TranscriptionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text, "hello world");
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[1].start, 1.5);
    }
}
