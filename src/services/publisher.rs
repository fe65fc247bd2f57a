//! Multi-platform publish orchestration.
//!
//! Each requested platform is attempted independently and sequentially;
//! a failure on one never aborts the others. Token expiry clears only the
//! affected platform's credential so the next attempt re-triggers its auth
//! flow.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::platforms::{Platform, PlatformError, SocialClient};
use crate::services::session::{PostedRecord, SessionStore};

#[derive(Debug, Default)]
pub struct PublishReport {
    /// Human-readable success entries, e.g. `LinkedIn (Post ID: abc)`.
    pub results: Vec<String>,
    /// Platform-qualified error entries, e.g. `Facebook: Not authenticated`.
    pub errors: Vec<String>,
}

impl PublishReport {
    pub fn all_succeeded(&self) -> bool {
        !self.results.is_empty() && self.errors.is_empty()
    }

    pub fn any_succeeded(&self) -> bool {
        !self.results.is_empty()
    }
}

fn excerpt(text: &str) -> String {
    let head: String = text.chars().take(100).collect();
    format!("{}...", head)
}

/// Fan one publish request out to every requested platform.
pub async fn publish_selected(
    store: &SessionStore,
    sid: &str,
    clients: &HashMap<Platform, Arc<dyn SocialClient>>,
    platforms: &[Platform],
    text: &str,
    image_path: Option<&Path>,
) -> PublishReport {
    let mut report = PublishReport::default();

    for &platform in platforms {
        let Some(token) = store.token(sid, platform).await else {
            report.errors.push(format!("{}: Not authenticated", platform));
            continue;
        };

        let Some(client) = clients.get(&platform) else {
            report.errors.push(format!("{}: Not configured", platform));
            continue;
        };

        // Instagram can't be attempted without an image; record the error
        // without touching the client.
        if platform == Platform::Instagram && image_path.is_none() {
            report.errors.push("Instagram: Requires an image".to_string());
            continue;
        }

        match client.publish(&token, text, image_path).await {
            Ok(outcome) => {
                store
                    .push_posted(
                        sid,
                        PostedRecord {
                            platform,
                            content_excerpt: excerpt(text),
                            post_id: outcome.post_id.clone(),
                            status: "Posted".to_string(),
                        },
                    )
                    .await;
                report
                    .results
                    .push(format!("{} (Post ID: {})", platform, outcome.post_id));
            }
            Err(PlatformError::TokenExpired { message, .. }) => {
                store.clear_token(sid, platform).await;
                report
                    .errors
                    .push(format!("{}: {}. Please re-authenticate.", platform, message));
            }
            Err(e) => {
                report.errors.push(format!("{}: {}", platform, e));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::PublishOutcome;
    use async_trait::async_trait;
    use axum_extra::extract::CookieJar;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Succeed,
        ExpireToken,
        Reject,
    }

    struct MockClient {
        platform: Platform,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl MockClient {
        fn new(platform: Platform, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                platform,
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SocialClient for MockClient {
        fn platform(&self) -> Platform {
            self.platform
        }

        fn build_auth_url(&self) -> String {
            format!("https://auth.example/{}", self.platform)
        }

        async fn exchange_code(&self, _code: &str) -> Result<String, PlatformError> {
            Ok("token".to_string())
        }

        async fn publish(
            &self,
            _access_token: &str,
            _text: &str,
            _image_path: Option<&Path>,
        ) -> Result<PublishOutcome, PlatformError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => Ok(PublishOutcome {
                    platform: self.platform,
                    post_id: "post-1".to_string(),
                    message: "ok".to_string(),
                }),
                Behavior::ExpireToken => Err(PlatformError::TokenExpired {
                    platform: self.platform,
                    message: "token revoked".to_string(),
                }),
                Behavior::Reject => Err(PlatformError::Publish("provider said no".to_string())),
            }
        }
    }

    async fn session() -> (SessionStore, String) {
        let store = SessionStore::new();
        let (sid, _) = store.resolve(&CookieJar::new()).await;
        (store, sid)
    }

    fn clients(
        entries: Vec<Arc<MockClient>>,
    ) -> (
        HashMap<Platform, Arc<dyn SocialClient>>,
        Vec<Arc<MockClient>>,
    ) {
        let map = entries
            .iter()
            .map(|c| (c.platform, c.clone() as Arc<dyn SocialClient>))
            .collect();
        (map, entries)
    }

    #[tokio::test]
    async fn token_expiry_clears_only_the_affected_credential() {
        let (store, sid) = session().await;
        store.set_token(&sid, Platform::LinkedIn, "li".into()).await;
        store.set_token(&sid, Platform::Facebook, "fb".into()).await;

        let (map, _mocks) = clients(vec![
            MockClient::new(Platform::LinkedIn, Behavior::ExpireToken),
            MockClient::new(Platform::Facebook, Behavior::Succeed),
        ]);

        let report = publish_selected(
            &store,
            &sid,
            &map,
            &[Platform::LinkedIn, Platform::Facebook],
            "hello",
            None,
        )
        .await;

        assert!(!store.authenticated(&sid, Platform::LinkedIn).await);
        assert!(store.authenticated(&sid, Platform::Facebook).await);
        assert_eq!(report.results, vec!["Facebook (Post ID: post-1)"]);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("LinkedIn: token revoked"));
        assert!(report.errors[0].ends_with("Please re-authenticate."));
    }

    #[tokio::test]
    async fn instagram_without_image_is_skipped_without_calling_the_client() {
        let (store, sid) = session().await;
        store.set_token(&sid, Platform::Instagram, "ig".into()).await;

        let (map, mocks) = clients(vec![MockClient::new(Platform::Instagram, Behavior::Succeed)]);

        let report =
            publish_selected(&store, &sid, &map, &[Platform::Instagram], "hello", None).await;

        assert_eq!(report.errors, vec!["Instagram: Requires an image"]);
        assert_eq!(mocks[0].calls.load(Ordering::SeqCst), 0);
        // Token stays; only the image was missing.
        assert!(store.authenticated(&sid, Platform::Instagram).await);
    }

    #[tokio::test]
    async fn missing_credential_is_reported_and_siblings_proceed() {
        let (store, sid) = session().await;
        store.set_token(&sid, Platform::Facebook, "fb".into()).await;

        let (map, _mocks) = clients(vec![
            MockClient::new(Platform::LinkedIn, Behavior::Succeed),
            MockClient::new(Platform::Facebook, Behavior::Succeed),
        ]);

        let report = publish_selected(
            &store,
            &sid,
            &map,
            &[Platform::LinkedIn, Platform::Facebook],
            "hello",
            None,
        )
        .await;

        assert_eq!(report.errors, vec!["LinkedIn: Not authenticated"]);
        assert_eq!(report.results, vec!["Facebook (Post ID: post-1)"]);
        assert!(!report.all_succeeded());
        assert!(report.any_succeeded());
        assert!(!store.authenticated(&sid, Platform::LinkedIn).await);
    }

    #[tokio::test]
    async fn success_appends_a_posted_record_with_excerpt() {
        let (store, sid) = session().await;
        store.set_token(&sid, Platform::LinkedIn, "li".into()).await;

        let (map, _mocks) = clients(vec![MockClient::new(Platform::LinkedIn, Behavior::Succeed)]);
        let long_text = "x".repeat(250);

        let report =
            publish_selected(&store, &sid, &map, &[Platform::LinkedIn], &long_text, None).await;

        assert!(report.all_succeeded());
        let posted = store.posted(&sid).await;
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].platform, Platform::LinkedIn);
        assert_eq!(posted[0].content_excerpt.chars().count(), 103);
        assert_eq!(posted[0].status, "Posted");
        assert_eq!(posted[0].post_id, "post-1");
    }

    #[tokio::test]
    async fn provider_rejection_is_isolated_and_keeps_the_token() {
        let (store, sid) = session().await;
        store.set_token(&sid, Platform::Facebook, "fb".into()).await;

        let (map, _mocks) = clients(vec![MockClient::new(Platform::Facebook, Behavior::Reject)]);

        let report =
            publish_selected(&store, &sid, &map, &[Platform::Facebook], "hello", None).await;

        assert!(report.results.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Facebook: Publish failed"));
        assert!(store.authenticated(&sid, Platform::Facebook).await);
    }
}
