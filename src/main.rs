mod config;
mod drafter;
mod extract;
mod platforms;
mod routes;
mod services;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;

use config::Config;
use drafter::Drafter;
use extract::TranscriptExtractor;
use platforms::facebook::FacebookClient;
use platforms::instagram::InstagramClient;
use platforms::linkedin::LinkedInClient;
use platforms::{Platform, SocialClient};
use services::session::SessionStore;

const MAX_VIDEO_UPLOAD_SIZE: usize = 200 * 1024 * 1024; // 200 MB limit for uploads

pub struct AppState {
    pub config: Config,
    pub sessions: SessionStore,
    pub extractor: TranscriptExtractor,
    pub drafter: Drafter,
    pub clients: HashMap<Platform, Arc<dyn SocialClient>>,
}

impl AppState {
    pub fn client(&self, platform: Platform) -> Option<Arc<dyn SocialClient>> {
        self.clients.get(&platform).cloned()
    }
}

fn build_clients(config: &Config) -> HashMap<Platform, Arc<dyn SocialClient>> {
    let mut clients: HashMap<Platform, Arc<dyn SocialClient>> = HashMap::new();

    if let Some(linkedin) = &config.linkedin {
        clients.insert(
            Platform::LinkedIn,
            Arc::new(LinkedInClient::new(
                &linkedin.client_id,
                &linkedin.client_secret,
                &linkedin.redirect_uri,
            )),
        );
    }

    // Facebook and Instagram share one app registration; the Instagram
    // client swaps the redirect path segment and scope list.
    if let Some(facebook) = &config.facebook {
        clients.insert(
            Platform::Facebook,
            Arc::new(FacebookClient::new(
                &facebook.client_id,
                &facebook.client_secret,
                &facebook.redirect_uri,
            )),
        );
        clients.insert(
            Platform::Instagram,
            Arc::new(InstagramClient::new(
                &facebook.client_id,
                &facebook.client_secret,
                &facebook.redirect_uri,
            )),
        );
    }

    clients
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    config.report();

    std::fs::create_dir_all(&config.upload_dir)
        .unwrap_or_else(|e| panic!("Failed to create {}: {}", config.upload_dir.display(), e));
    std::fs::create_dir_all(&config.images_dir)
        .unwrap_or_else(|e| panic!("Failed to create {}: {}", config.images_dir.display(), e));

    let extractor = TranscriptExtractor::new(config.openai_api_key.clone());
    let drafter = Drafter::new(config.openai_api_key.clone(), config.images_dir.clone());
    let clients = build_clients(&config);

    let images_dir = config.images_dir.clone();
    let port = config.port;

    let state = Arc::new(AppState {
        config,
        sessions: SessionStore::new(),
        extractor,
        drafter,
        clients,
    });

    let app = routes::build_routes(&images_dir)
        .layer(DefaultBodyLimit::max(MAX_VIDEO_UPLOAD_SIZE))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", addr, e));

    println!("Listening on http://{}", addr);
    axum::serve(listener, app).await.expect("Server failed");
}
