//! LinkedIn OAuth + UGC posting client.
//!
//! Publishing resolves the member URN from the userinfo endpoint, runs the
//! three-step asset upload when an image is attached, and submits a UGC
//! post. A failed image upload degrades to a text-only post.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{
    Platform, PlatformError, PublishOutcome, SocialClient, generate_state, percent_encode,
    with_timestamp,
};

const AUTH_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
const TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const USERINFO_URL: &str = "https://api.linkedin.com/v2/userinfo";
const REGISTER_UPLOAD_URL: &str = "https://api.linkedin.com/v2/assets?action=registerUpload";
const UGC_POSTS_URL: &str = "https://api.linkedin.com/v2/ugcPosts";

const SCOPES: &str = "openid profile w_member_social";

pub struct LinkedInClient {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http: Client,
}

impl LinkedInClient {
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            http: Client::new(),
        }
    }

    /// Resolve the caller's member URN, treating a 401 (or an embedded 401
    /// status with a REVOKED/EXPIRED code) as token expiry.
    async fn profile_urn(&self, access_token: &str) -> Result<String, PlatformError> {
        let resp = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = resp.status();
        let body: serde_json::Value = resp.json().await?;

        let embedded_status = body.get("status").and_then(|s| s.as_i64());
        if status.as_u16() == 401 || embedded_status == Some(401) {
            let code = body.get("code").and_then(|c| c.as_str()).unwrap_or("");
            let message = if code.contains("REVOKED") || code.contains("EXPIRED") {
                format!("access token has been revoked or expired: {}", code)
            } else {
                format!("authentication failed: {}", body)
            };
            return Err(PlatformError::TokenExpired {
                platform: Platform::LinkedIn,
                message,
            });
        }

        let sub = body
            .get("sub")
            .and_then(|s| s.as_str())
            .ok_or_else(|| PlatformError::Publish(format!("error fetching profile: {}", body)))?;

        Ok(format!("urn:li:person:{}", sub))
    }

    /// Three-step asset upload: register, binary upload, asset URN.
    /// Returns None on any failure so the caller can post text-only.
    async fn upload_image(&self, access_token: &str, user_urn: &str, image_path: &Path) -> Option<String> {
        let data = match tokio::fs::read(image_path).await {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Image file not readable: {}: {}", image_path.display(), e);
                return None;
            }
        };

        let register_body = json!({
            "registerUploadRequest": {
                "recipes": ["urn:li:digitalmediaRecipe:feedshare-image"],
                "owner": user_urn,
                "serviceRelationships": [{
                    "relationshipType": "OWNER",
                    "identifier": "urn:li:userGeneratedContent"
                }]
            }
        });

        let register_resp = self
            .http
            .post(REGISTER_UPLOAD_URL)
            .bearer_auth(access_token)
            .json(&register_body)
            .send()
            .await
            .ok()?;

        if !register_resp.status().is_success() {
            let text = register_resp.text().await.unwrap_or_default();
            eprintln!("Failed to register LinkedIn upload: {}", text);
            return None;
        }

        let register_result: serde_json::Value = register_resp.json().await.ok()?;
        let value = register_result.get("value")?;
        let asset_id = value.get("asset")?.as_str()?.to_string();
        let upload_url = value
            .get("uploadMechanism")?
            .get("com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest")?
            .get("uploadUrl")?
            .as_str()?
            .to_string();

        let upload_resp = self
            .http
            .post(&upload_url)
            .bearer_auth(access_token)
            .body(data)
            .send()
            .await
            .ok()?;

        if !upload_resp.status().is_success() {
            let text = upload_resp.text().await.unwrap_or_default();
            eprintln!("Failed to upload image to LinkedIn: {}", text);
            return None;
        }

        Some(asset_id)
    }
}

#[async_trait]
impl SocialClient for LinkedInClient {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn build_auth_url(&self) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            AUTH_URL,
            percent_encode(&self.client_id),
            percent_encode(&self.redirect_uri),
            percent_encode(SCOPES),
            percent_encode(&generate_state()),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<String, PlatformError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.redirect_uri),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ];

        let resp = self.http.post(TOKEN_URL).form(&params).send().await?;
        let body: serde_json::Value = resp.json().await?;

        body.get("access_token")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string())
            .ok_or_else(|| PlatformError::AuthExchange(format!("no access token in {}", body)))
    }

    async fn publish(
        &self,
        access_token: &str,
        text: &str,
        image_path: Option<&Path>,
    ) -> Result<PublishOutcome, PlatformError> {
        let user_urn = self.profile_urn(access_token).await?;
        let final_message = with_timestamp(text);

        let mut media_asset = None;
        if let Some(path) = image_path {
            media_asset = self.upload_image(access_token, &user_urn, path).await;
            if media_asset.is_none() {
                eprintln!("LinkedIn image upload failed, posting without image");
            }
        }

        let specific_content = match &media_asset {
            Some(asset) => json!({
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": { "text": final_message },
                    "shareMediaCategory": "IMAGE",
                    "media": [{
                        "status": "READY",
                        "description": { "text": "Illustration for this post" },
                        "media": asset,
                        "title": { "text": "Post Image" }
                    }]
                }
            }),
            None => json!({
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": { "text": final_message },
                    "shareMediaCategory": "NONE"
                }
            }),
        };

        let post_body = json!({
            "author": user_urn,
            "lifecycleState": "PUBLISHED",
            "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC" },
            "specificContent": specific_content,
        });

        let resp = self
            .http
            .post(UGC_POSTS_URL)
            .bearer_auth(access_token)
            .json(&post_body)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() != 201 {
            let text = resp.text().await.unwrap_or_default();
            return Err(PlatformError::Publish(format!(
                "LinkedIn returned status {}: {}",
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
            platform: Platform::LinkedIn,
            post_id,
            message: final_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_url_carries_client_redirect_and_scopes() {
        let client = LinkedInClient::new("cid", "secret", "https://app.example/auth/linkedin/callback");
        let url = client.build_auth_url();
        assert!(url.starts_with("https://www.linkedin.com/oauth/v2/authorization?response_type=code"));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp%2Eexample%2Fauth%2Flinkedin%2Fcallback"));
        assert!(url.contains("scope=openid%20profile%20w%5Fmember%5Fsocial"));
        assert!(url.contains("state="));
    }
}
