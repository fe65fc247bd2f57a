//! Instagram publishing via the Facebook Graph API.
//!
//! Instagram Business Accounts publish through the Facebook Page they are
//! linked to: resolve the Page, resolve the linked account, upload the image
//! unpublished to get a public URL, create a media container, then publish
//! it. An image is mandatory.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::{Duration, sleep};

use super::facebook::{GRAPH_BASE, build_dialog_url, exchange_graph_code, page_info};
use super::{Platform, PlatformError, PublishOutcome, SocialClient, classify_graph_error, with_timestamp};

const SCOPES: &str =
    "instagram_basic,instagram_content_publish,pages_show_list,pages_read_engagement,business_management";

/// Fixed wait for the media container to become publishable.
const CONTAINER_READY_DELAY: Duration = Duration::from_secs(2);

pub struct InstagramClient {
    app_id: String,
    app_secret: String,
    redirect_uri: String,
    http: Client,
}

impl InstagramClient {
    /// Takes the shared Facebook app credentials; the redirect URI is the
    /// Facebook one with its path segment swapped for Instagram's.
    pub fn new(app_id: &str, app_secret: &str, facebook_redirect_uri: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
            redirect_uri: facebook_redirect_uri.replace("/facebook/", "/instagram/"),
            http: Client::new(),
        }
    }

    /// Instagram Business Account linked to the given Page.
    async fn business_account_id(
        &self,
        page_id: &str,
        page_access_token: &str,
    ) -> Result<String, PlatformError> {
        let resp = self
            .http
            .get(format!("{}/{}", GRAPH_BASE, page_id))
            .query(&[
                ("fields", "instagram_business_account"),
                ("access_token", page_access_token),
            ])
            .send()
            .await?;

        let body: serde_json::Value = resp.json().await?;
        if let Some(expired) = classify_graph_error(&body, Platform::Instagram) {
            return Err(expired);
        }

        body.get("instagram_business_account")
            .and_then(|a| a.get("id"))
            .and_then(|i| i.as_str())
            .map(|i| i.to_string())
            .ok_or_else(|| {
                PlatformError::Configuration(
                    "no Instagram Business Account linked to this Facebook Page".to_string(),
                )
            })
    }

    /// Upload the image to the Page unpublished and return a public URL the
    /// container creation step can reference.
    async fn upload_image_for_url(
        &self,
        page_id: &str,
        page_access_token: &str,
        image_path: &Path,
    ) -> Result<String, PlatformError> {
        let data = tokio::fs::read(image_path)
            .await
            .map_err(|e| PlatformError::Publish(format!("failed to read image: {}", e)))?;
        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.png".to_string());

        let form = reqwest::multipart::Form::new()
            .text("published", "false")
            .text("access_token", page_access_token.to_string())
            .part("source", reqwest::multipart::Part::bytes(data).file_name(file_name));

        let upload_resp = self
            .http
            .post(format!("{}/{}/photos", GRAPH_BASE, page_id))
            .multipart(form)
            .send()
            .await?;

        if !upload_resp.status().is_success() {
            let text = upload_resp.text().await.unwrap_or_default();
            return Err(PlatformError::Publish(format!("failed to upload image: {}", text)));
        }

        let upload_body: serde_json::Value = upload_resp.json().await?;
        let photo_id = upload_body
            .get("id")
            .and_then(|i| i.as_str())
            .ok_or_else(|| PlatformError::Publish("photo upload returned no id".to_string()))?;

        let url_resp = self
            .http
            .get(format!("{}/{}", GRAPH_BASE, photo_id))
            .query(&[("fields", "images"), ("access_token", page_access_token)])
            .send()
            .await?;

        if !url_resp.status().is_success() {
            let text = url_resp.text().await.unwrap_or_default();
            return Err(PlatformError::Publish(format!("failed to get image URL: {}", text)));
        }

        let url_body: serde_json::Value = url_resp.json().await?;
        // First entry is the highest resolution.
        url_body
            .get("images")
            .and_then(|i| i.as_array())
            .and_then(|i| i.first())
            .and_then(|i| i.get("source"))
            .and_then(|s| s.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| PlatformError::Publish("no image URL in photo response".to_string()))
    }
}

#[async_trait]
impl SocialClient for InstagramClient {
    fn platform(&self) -> Platform {
        Platform::Instagram
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
        let image_path = match image_path {
            Some(path) if path.exists() => path,
            _ => {
                return Err(PlatformError::Validation(
                    "Instagram requires an image; image path not provided or file not found"
                        .to_string(),
                ));
            }
        };

        let page = page_info(&self.http, access_token, Platform::Instagram).await?;
        println!("Looking for Instagram account linked to '{}'", page.page_name);
        let account_id = self
            .business_account_id(&page.page_id, &page.page_access_token)
            .await?;

        let final_caption = with_timestamp(text);
        let image_url = self
            .upload_image_for_url(&page.page_id, &page.page_access_token, image_path)
            .await?;

        let container_resp = self
            .http
            .post(format!("{}/{}/media", GRAPH_BASE, account_id))
            .form(&[
                ("image_url", image_url.as_str()),
                ("caption", final_caption.as_str()),
                ("access_token", page.page_access_token.as_str()),
            ])
            .send()
            .await?;

        if !container_resp.status().is_success() {
            let text = container_resp.text().await.unwrap_or_default();
            return Err(PlatformError::Publish(format!(
                "failed to create media container: {}",
                text
            )));
        }

        let container_body: serde_json::Value = container_resp.json().await?;
        let creation_id = container_body
            .get("id")
            .and_then(|i| i.as_str())
            .ok_or_else(|| PlatformError::Publish("container creation returned no id".to_string()))?;

        sleep(CONTAINER_READY_DELAY).await;

        let publish_resp = self
            .http
            .post(format!("{}/{}/media_publish", GRAPH_BASE, account_id))
            .form(&[
                ("creation_id", creation_id),
                ("access_token", page.page_access_token.as_str()),
            ])
            .send()
            .await?;

        let status = publish_resp.status();
        if !status.is_success() {
            let text = publish_resp.text().await.unwrap_or_default();
            return Err(PlatformError::Publish(format!(
                "Instagram returned status {}: {}",
                status, text
            )));
        }

        let body: serde_json::Value = publish_resp.json().await?;
        let post_id = body
            .get("id")
            .and_then(|i| i.as_str())
            .unwrap_or("Unknown ID")
            .to_string();

        Ok(PublishOutcome {
            platform: Platform::Instagram,
            post_id,
            message: final_caption,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_path_segment_is_swapped() {
        let client = InstagramClient::new("app", "secret", "https://app.example/auth/facebook/callback");
        let url = client.build_auth_url();
        assert!(url.contains("instagram%2Fcallback"));
        assert!(!url.contains("facebook%2Fcallback"));
        assert!(url.contains("instagram%5Fcontent%5Fpublish"));
    }

    #[tokio::test]
    async fn publish_without_image_is_a_validation_error() {
        let client = InstagramClient::new("app", "secret", "https://app.example/auth/facebook/callback");
        let err = client.publish("token", "text", None).await.unwrap_err();
        assert!(matches!(err, PlatformError::Validation(_)));
    }
}
