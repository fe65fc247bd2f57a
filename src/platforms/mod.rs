//! Platform clients for the three publishing targets.
//!
//! Each client implements the same capability set (auth URL, code-to-token
//! exchange, publish) behind [`SocialClient`], so the orchestration layer in
//! `services::publisher` can treat the platforms uniformly and keep
//! token-expiry handling out of string inspection.

pub mod facebook;
pub mod instagram;
pub mod linkedin;

use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    LinkedIn,
    Facebook,
    Instagram,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "LinkedIn",
            Platform::Facebook => "Facebook",
            Platform::Instagram => "Instagram",
        }
    }

    /// Parse the lowercase form used in the `platforms` form field.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "linkedin" => Some(Platform::LinkedIn),
            "facebook" => Some(Platform::Facebook),
            "instagram" => Some(Platform::Instagram),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum PlatformError {
    Http(reqwest::Error),
    /// The token endpoint answered without an access token.
    AuthExchange(String),
    /// The provider reported the stored credential revoked or expired.
    TokenExpired { platform: Platform, message: String },
    /// Required linkage or app setup is missing (e.g. no Page, no linked
    /// Instagram account).
    Configuration(String),
    /// The provider rejected the publish call itself.
    Publish(String),
    /// The request can't be attempted at all (e.g. Instagram without image).
    Validation(String),
}

impl From<reqwest::Error> for PlatformError {
    fn from(e: reqwest::Error) -> Self {
        PlatformError::Http(e)
    }
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::Http(e) => write!(f, "HTTP error: {}", e),
            PlatformError::AuthExchange(s) => write!(f, "Token exchange failed: {}", s),
            PlatformError::TokenExpired { platform, message } => {
                write!(f, "{} access token expired or revoked: {}", platform, message)
            }
            PlatformError::Configuration(s) => write!(f, "Configuration error: {}", s),
            PlatformError::Publish(s) => write!(f, "Publish failed: {}", s),
            PlatformError::Validation(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for PlatformError {}

/// Result of a successful publish call.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub platform: Platform,
    pub post_id: String,
    pub message: String,
}

#[async_trait]
pub trait SocialClient: Send + Sync {
    fn platform(&self) -> Platform;

    /// Provider authorization URL carrying client id, redirect URI, scopes
    /// and response type.
    fn build_auth_url(&self) -> String;

    /// Exchange an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<String, PlatformError>;

    /// Publish text (plus optional image) on behalf of the token's owner.
    async fn publish(
        &self,
        access_token: &str,
        text: &str,
        image_path: Option<&Path>,
    ) -> Result<PublishOutcome, PlatformError>;
}

/// Random state parameter for the OAuth dance.
pub(crate) fn generate_state() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn percent_encode(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s, percent_encoding::NON_ALPHANUMERIC).to_string()
}

/// Append a millisecond-resolution timestamp so identical text published
/// twice (even within the same second) yields distinct payloads.
pub(crate) fn with_timestamp(text: &str) -> String {
    let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
    format!("{}\n\n(Posted at {})", text, now)
}

/// Shared classification of Graph API error bodies (Facebook and Instagram
/// both speak it). Code 190 and OAuthException both mean the user token is
/// no longer usable.
pub(crate) fn classify_graph_error(
    body: &serde_json::Value,
    platform: Platform,
) -> Option<PlatformError> {
    let error = body.get("error")?;
    let code = error.get("code").and_then(|c| c.as_i64());
    let error_type = error.get("type").and_then(|t| t.as_str());
    if code == Some(190) || error_type == Some("OAuthException") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("access token expired or invalid")
            .to_string();
        return Some(PlatformError::TokenExpired { platform, message });
    }
    None
}
