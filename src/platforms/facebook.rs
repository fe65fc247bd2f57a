//! Facebook Graph client: OAuth dialog, Page resolution, and Page posting.
//!
//! Page resolution is shared with the Instagram client, which publishes
//! through the same Page's access token.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;

use super::{
    Platform, PlatformError, PublishOutcome, SocialClient, classify_graph_error, percent_encode,
    with_timestamp,
};

pub(crate) const GRAPH_BASE: &str = "https://graph.facebook.com/v19.0";
const DIALOG_URL: &str = "https://www.facebook.com/v19.0/dialog/oauth";

const SCOPES: &str = "pages_manage_posts,pages_read_engagement,pages_show_list,business_management";

/// First managed Page of the authorized user, with its page-scoped token.
pub(crate) struct PageInfo {
    pub page_id: String,
    pub page_access_token: String,
    pub page_name: String,
}

/// Resolve the user's Page and page token from `/me/accounts`.
///
/// `platform` attributes token-expiry errors to whichever platform is
/// driving the call (Facebook or Instagram).
pub(crate) async fn page_info(
    http: &Client,
    user_access_token: &str,
    platform: Platform,
) -> Result<PageInfo, PlatformError> {
    let resp = http
        .get(format!("{}/me/accounts", GRAPH_BASE))
        .query(&[("access_token", user_access_token)])
        .send()
        .await?;

    let body: serde_json::Value = resp.json().await?;
    if let Some(expired) = classify_graph_error(&body, platform) {
        return Err(expired);
    }

    let pages = body.get("data").and_then(|d| d.as_array());
    let first = pages
        .and_then(|p| p.first())
        .ok_or_else(|| PlatformError::Configuration("no Facebook Pages found for this account".to_string()))?;

    let field = |name: &str| {
        first
            .get(name)
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .ok_or_else(|| PlatformError::Publish(format!("malformed page entry: missing {}", name)))
    };

    Ok(PageInfo {
        page_id: field("id")?,
        page_access_token: field("access_token")?,
        page_name: field("name")?,
    })
}

/// Build the shared Meta OAuth dialog URL.
pub(crate) fn build_dialog_url(client_id: &str, redirect_uri: &str, scopes: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&scope={}&response_type=code&auth_type=reauthenticate",
        DIALOG_URL,
        percent_encode(client_id),
        percent_encode(redirect_uri),
        percent_encode(scopes),
    )
}

/// Exchange an authorization code at the Graph token endpoint (a GET, unlike
/// LinkedIn's POST).
pub(crate) async fn exchange_graph_code(
    http: &Client,
    client_id: &str,
    client_secret: &str,
    redirect_uri: &str,
    code: &str,
) -> Result<String, PlatformError> {
    let resp = http
        .get(format!("{}/oauth/access_token", GRAPH_BASE))
        .query(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
            ("code", code),
        ])
        .send()
        .await?;

    let body: serde_json::Value = resp.json().await?;
    body.get("access_token")
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| PlatformError::AuthExchange(format!("no access token in {}", body)))
}

pub struct FacebookClient {
    app_id: String,
    app_secret: String,
    redirect_uri: String,
    http: Client,
}

impl FacebookClient {
    pub fn new(app_id: &str, app_secret: &str, redirect_uri: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            http: Client::new(),
        }
    }
}

#[async_trait]
impl SocialClient for FacebookClient {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    fn build_auth_url(&self) -> String {
        build_dialog_url(&self.app_id, &self.redirect_uri, SCOPES)
    }

    async fn exchange_code(&self, code: &str) -> Result<String, PlatformError> {
        exchange_graph_code(
            &self.http,
            &self.app_id,
            &self.app_secret,
            &self.redirect_uri,
            code,
        )
        .await
    }

    async fn publish(
        &self,
        access_token: &str,
        text: &str,
        image_path: Option<&Path>,
    ) -> Result<PublishOutcome, PlatformError> {
        let page = page_info(&self.http, access_token, Platform::Facebook).await?;
        let final_caption = with_timestamp(text);

        // A vanished image file downgrades to a text-only post.
        let image_path = match image_path {
            Some(path) if path.exists() => Some(path),
            Some(path) => {
                eprintln!("Image file not found: {}, posting text only", path.display());
                None
            }
            None => None,
        };

        let resp = match image_path {
            Some(path) => {
                println!("Posting to Facebook Page '{}' with image", page.page_name);
                let data = tokio::fs::read(path)
                    .await
                    .map_err(|e| PlatformError::Publish(format!("failed to read image: {}", e)))?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "image.png".to_string());
                let form = reqwest::multipart::Form::new()
                    .text("caption", final_caption.clone())
                    .text("access_token", page.page_access_token.clone())
                    .part("source", reqwest::multipart::Part::bytes(data).file_name(file_name));
                self.http
                    .post(format!("{}/{}/photos", GRAPH_BASE, page.page_id))
                    .multipart(form)
                    .send()
                    .await?
            }
            None => {
                println!("Posting to Facebook Page '{}' (text only)", page.page_name);
                self.http
                    .post(format!("{}/{}/feed", GRAPH_BASE, page.page_id))
                    .form(&[
                        ("message", final_caption.as_str()),
                        ("access_token", page.page_access_token.as_str()),
                    ])
                    .send()
                    .await?
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PlatformError::Publish(format!(
                "Facebook returned status {}: {}",
                status, text
            )));
        }

        let body: serde_json::Value = resp.json().await?;
        let post_id = body
            .get("id")
            .and_then(|i| i.as_str())
            .unwrap_or("Unknown ID")
            .to_string();

        Ok(PublishOutcome {
            platform: Platform::Facebook,
            post_id,
            message: final_caption,
        })
    }
}
