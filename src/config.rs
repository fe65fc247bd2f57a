//! Environment-driven configuration loaded once at startup.
//!
//! Platform credential groups are optional: a missing group disables that
//! platform's OAuth routes rather than failing startup.

use std::path::PathBuf;

/// OAuth app registration for one provider.
#[derive(Clone)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Clone)]
pub struct Config {
    pub linkedin: Option<OAuthApp>,
    /// Shared by Facebook and Instagram (one Meta app handles both).
    pub facebook: Option<OAuthApp>,
    pub openai_api_key: Option<String>,
    pub upload_dir: PathBuf,
    pub images_dir: PathBuf,
    pub port: u16,
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn oauth_app(id_var: &str, secret_var: &str, redirect_var: &str) -> Option<OAuthApp> {
    Some(OAuthApp {
        client_id: env_opt(id_var)?,
        client_secret: env_opt(secret_var)?,
        redirect_uri: env_opt(redirect_var)?,
    })
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            linkedin: oauth_app(
                "LINKEDIN_CLIENT_ID",
                "LINKEDIN_CLIENT_SECRET",
                "LINKEDIN_REDIRECT_URI",
            ),
            facebook: oauth_app(
                "FACEBOOK_APP_ID",
                "FACEBOOK_APP_SECRET",
                "FACEBOOK_REDIRECT_URI",
            ),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            upload_dir: env_opt("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            images_dir: env_opt("IMAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("images")),
            port: env_opt("PORT").and_then(|p| p.parse().ok()).unwrap_or(3000),
        }
    }

    /// Print what is and isn't configured so a misconfigured deploy is
    /// obvious from the first lines of output.
    pub fn report(&self) {
        if self.openai_api_key.is_none() {
            eprintln!("OPENAI_API_KEY not set: drafting falls back to the keyword template");
        }
        if self.linkedin.is_none() {
            eprintln!("LinkedIn credentials not set: LinkedIn posting disabled");
        }
        if self.facebook.is_none() {
            eprintln!("Facebook app credentials not set: Facebook/Instagram posting disabled");
        }
        if self.openai_api_key.is_some() && self.linkedin.is_some() && self.facebook.is_some() {
            println!("All platform credentials loaded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_oauth_group_is_dropped() {
        // All three variables must be present for a group to activate.
        unsafe {
            std::env::set_var("LINKEDIN_CLIENT_ID", "id");
            std::env::remove_var("LINKEDIN_CLIENT_SECRET");
            std::env::remove_var("LINKEDIN_REDIRECT_URI");
        }
        assert!(
            oauth_app(
                "LINKEDIN_CLIENT_ID",
                "LINKEDIN_CLIENT_SECRET",
                "LINKEDIN_REDIRECT_URI"
            )
            .is_none()
        );
    }
}
