//! In-memory per-session state: the pending draft, per-platform tokens,
//! the posted-record log, and one-shot flash messages.
//!
//! Tokens and the pending post are independent; clearing one never touches
//! the other. Nothing here survives the process.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum_extra::extract::CookieJar;
use base64::Engine;
use rand::Rng;
use tokio::sync::RwLock;

use crate::platforms::Platform;
use crate::services::cookies;

/// Server-side lifetime matches the cookie's Max-Age; entries idle longer
/// than this are purged so abandoned sessions can't accumulate.
const SESSION_TTL: Duration = Duration::from_secs(cookies::SESSION_MAX_AGE_SECS as u64);

/// Draft held for review, overwritten by each successful upload.
#[derive(Debug, Clone)]
pub struct PendingPost {
    pub transcript_text: String,
    pub draft_text: String,
    /// Web path for preview (`/images/<file>`).
    pub image_web_url: Option<String>,
    /// Local path handed to platform clients at publish time.
    pub image_local_path: Option<std::path::PathBuf>,
    pub video_title: Option<String>,
}

/// Append-only log entry for a successful publish.
#[derive(Debug, Clone)]
pub struct PostedRecord {
    pub platform: Platform,
    pub content_excerpt: String,
    pub post_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Default)]
pub struct Flash {
    pub error: Option<String>,
    pub success: Option<String>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone)]
struct Session {
    pending: Option<PendingPost>,
    tokens: HashMap<Platform, String>,
    posted: Vec<PostedRecord>,
    flash: Flash,
    last_seen: Instant,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            pending: None,
            tokens: HashMap::new(),
            posted: Vec::new(),
            flash: Flash::default(),
            last_seen: Instant::now(),
        }
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

fn generate_session_id() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn purge_idle(sessions: &mut HashMap<String, Session>, ttl: Duration) {
    sessions.retain(|_, session| session.last_seen.elapsed() < ttl);
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the session id from the cookie jar, creating a fresh session
    /// (and the Set-Cookie header to install it) on first contact. Idle
    /// sessions past their cookie lifetime are dropped here.
    pub async fn resolve(&self, jar: &CookieJar) -> (String, Option<axum::http::HeaderValue>) {
        let mut sessions = self.sessions.write().await;
        purge_idle(&mut sessions, SESSION_TTL);

        if let Some(cookie) = jar.get(cookies::SESSION_COOKIE_NAME) {
            if let Some(session) = sessions.get_mut(cookie.value()) {
                session.last_seen = Instant::now();
                return (cookie.value().to_string(), None);
            }
        }

        let sid = generate_session_id();
        sessions.insert(sid.clone(), Session::default());
        let header = cookies::build_session_cookie(&sid);
        (sid, Some(header))
    }

    pub async fn set_pending(&self, sid: &str, pending: PendingPost) {
        if let Some(session) = self.sessions.write().await.get_mut(sid) {
            session.pending = Some(pending);
        }
    }

    pub async fn pending(&self, sid: &str) -> Option<PendingPost> {
        self.sessions.read().await.get(sid)?.pending.clone()
    }

    pub async fn set_token(&self, sid: &str, platform: Platform, token: String) {
        if let Some(session) = self.sessions.write().await.get_mut(sid) {
            session.tokens.insert(platform, token);
        }
    }

    pub async fn token(&self, sid: &str, platform: Platform) -> Option<String> {
        self.sessions
            .read()
            .await
            .get(sid)?
            .tokens
            .get(&platform)
            .cloned()
    }

    /// Drop one platform's credential, e.g. after the provider reported it
    /// expired. Other platforms and the pending post are untouched.
    pub async fn clear_token(&self, sid: &str, platform: Platform) {
        if let Some(session) = self.sessions.write().await.get_mut(sid) {
            session.tokens.remove(&platform);
        }
    }

    pub async fn authenticated(&self, sid: &str, platform: Platform) -> bool {
        self.token(sid, platform).await.is_some()
    }

    pub async fn push_posted(&self, sid: &str, record: PostedRecord) {
        if let Some(session) = self.sessions.write().await.get_mut(sid) {
            session.posted.push(record);
        }
    }

    pub async fn posted(&self, sid: &str) -> Vec<PostedRecord> {
        self.sessions
            .read()
            .await
            .get(sid)
            .map(|s| s.posted.clone())
            .unwrap_or_default()
    }

    pub async fn flash_error(&self, sid: &str, message: impl Into<String>) {
        if let Some(session) = self.sessions.write().await.get_mut(sid) {
            session.flash.error = Some(message.into());
        }
    }

    pub async fn flash_success(&self, sid: &str, message: impl Into<String>) {
        if let Some(session) = self.sessions.write().await.get_mut(sid) {
            session.flash.success = Some(message.into());
        }
    }

    pub async fn flash_warning(&self, sid: &str, message: impl Into<String>) {
        if let Some(session) = self.sessions.write().await.get_mut(sid) {
            session.flash.warning = Some(message.into());
        }
    }

    /// Read and clear the flash messages (they render exactly once).
    pub async fn take_flash(&self, sid: &str) -> Flash {
        self.sessions
            .write()
            .await
            .get_mut(sid)
            .map(|s| std::mem::take(&mut s.flash))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_session() -> (SessionStore, String) {
        let store = SessionStore::new();
        let (sid, header) = store.resolve(&CookieJar::new()).await;
        assert!(header.is_some());
        (store, sid)
    }

    fn pending(text: &str) -> PendingPost {
        PendingPost {
            transcript_text: text.to_string(),
            draft_text: format!("draft of {}", text),
            image_web_url: None,
            image_local_path: None,
            video_title: None,
        }
    }

    #[tokio::test]
    async fn upload_overwrites_pending_post() {
        let (store, sid) = store_with_session().await;
        store.set_pending(&sid, pending("first")).await;
        store.set_pending(&sid, pending("second")).await;
        assert_eq!(store.pending(&sid).await.unwrap().transcript_text, "second");
    }

    #[tokio::test]
    async fn clearing_a_token_leaves_pending_and_other_tokens() {
        let (store, sid) = store_with_session().await;
        store.set_pending(&sid, pending("kept")).await;
        store.set_token(&sid, Platform::LinkedIn, "li".into()).await;
        store.set_token(&sid, Platform::Facebook, "fb".into()).await;

        store.clear_token(&sid, Platform::LinkedIn).await;

        assert!(!store.authenticated(&sid, Platform::LinkedIn).await);
        assert_eq!(
            store.token(&sid, Platform::Facebook).await.as_deref(),
            Some("fb")
        );
        assert!(store.pending(&sid).await.is_some());
    }

    #[tokio::test]
    async fn flash_renders_once() {
        let (store, sid) = store_with_session().await;
        store.flash_error(&sid, "boom").await;
        assert_eq!(store.take_flash(&sid).await.error.as_deref(), Some("boom"));
        assert!(store.take_flash(&sid).await.error.is_none());
    }

    #[tokio::test]
    async fn idle_sessions_are_purged() {
        let store = SessionStore::new();
        let (old_sid, _) = store.resolve(&CookieJar::new()).await;
        let (fresh_sid, _) = store.resolve(&CookieJar::new()).await;
        store.set_token(&old_sid, Platform::LinkedIn, "li".into()).await;

        let mut sessions = store.sessions.write().await;
        // Backdate one session past the test TTL.
        sessions.get_mut(&old_sid).unwrap().last_seen =
            Instant::now().checked_sub(Duration::from_secs(2)).unwrap();
        purge_idle(&mut sessions, Duration::from_secs(1));

        assert!(!sessions.contains_key(&old_sid));
        assert!(sessions.contains_key(&fresh_sid));
    }

    #[tokio::test]
    async fn active_sessions_survive_the_purge() {
        let store = SessionStore::new();
        let (sid, _) = store.resolve(&CookieJar::new()).await;
        let jar = CookieJar::new().add(axum_extra::extract::cookie::Cookie::new(
            cookies::SESSION_COOKIE_NAME,
            sid.clone(),
        ));

        let (resolved, header) = store.resolve(&jar).await;
        assert_eq!(resolved, sid);
        assert!(header.is_none());
    }

    #[tokio::test]
    async fn unknown_cookie_gets_a_fresh_session() {
        let store = SessionStore::new();
        let jar = CookieJar::new().add(axum_extra::extract::cookie::Cookie::new(
            cookies::SESSION_COOKIE_NAME,
            "stale-id",
        ));
        let (sid, header) = store.resolve(&jar).await;
        assert_ne!(sid, "stale-id");
        assert!(header.is_some());
    }
}
