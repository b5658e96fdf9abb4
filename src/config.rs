//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default Botnoi Voice developer API endpoint (JSON or HTML page).
pub const DEFAULT_BOTNOI_API_KEY_URL: &str = "https://voice.botnoi.ai/tts/api-developer-v2";
/// Default Botnoi Voice login endpoint.
pub const DEFAULT_BOTNOI_LOGIN_URL: &str = "https://voice.botnoi.ai/api/login";
/// Default workflow workspace users are sent to after sign-in.
pub const DEFAULT_WORKFLOW_URL: &str = "http://localhost:5678/workflow/3itcopY4xzxL7s0z";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Server port
    pub port: u16,
    /// Frontend URL for post-sign-in redirects
    pub frontend_url: String,
    /// Public URL of this service (used for the OAuth callback)
    pub api_url: String,
    /// Botnoi login endpoint
    pub botnoi_login_url: String,
    /// Botnoi API key endpoint
    pub botnoi_api_key_url: String,
    /// Local storage file; `None` keeps everything in memory
    pub storage_path: Option<PathBuf>,
    /// External workflow workspace
    pub workflow_url: String,
    /// Send users straight to the workflow after sign-in
    pub auto_redirect_to_workflow: bool,
    /// Absolute identity session lifetime, if any
    pub session_timeout: Option<Duration>,
    /// Google OAuth client ID (public)
    pub google_client_id: String,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// HMAC key for signing the OAuth state parameter
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            api_url: "http://localhost:8080".to_string(),
            botnoi_login_url: "http://127.0.0.1:9/login".to_string(),
            botnoi_api_key_url: "http://127.0.0.1:9/api-key".to_string(),
            storage_path: None,
            workflow_url: DEFAULT_WORKFLOW_URL.to_string(),
            auto_redirect_to_workflow: false,
            session_timeout: None,
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            google_client_secret: "test_secret".to_string(),
            oauth_state_key: b"test_oauth_state_key_32_bytes!!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = match env::var("PORT") {
            Ok(v) => v
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", v.clone()))?,
            Err(_) => 8080,
        };

        let session_timeout = match env::var("SESSION_TIMEOUT_SECS") {
            Ok(v) if v.trim().is_empty() => None,
            Ok(v) => {
                let secs: u64 = v
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("SESSION_TIMEOUT_SECS", v.clone()))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            Err(_) => None,
        };

        Ok(Self {
            port,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            api_url: env::var("API_URL").unwrap_or_else(|_| format!("http://localhost:{}", port)),
            botnoi_login_url: env::var("BOTNOI_LOGIN_URL")
                .unwrap_or_else(|_| DEFAULT_BOTNOI_LOGIN_URL.to_string()),
            botnoi_api_key_url: env::var("BOTNOI_API_KEY_URL")
                .unwrap_or_else(|_| DEFAULT_BOTNOI_API_KEY_URL.to_string()),
            // Set STORAGE_PATH to an empty string to keep state in memory only
            storage_path: match env::var("STORAGE_PATH") {
                Ok(v) if v.trim().is_empty() => None,
                Ok(v) => Some(v.into()),
                Err(_) => Some(PathBuf::from("data/portal_storage.json")),
            },
            workflow_url: env::var("WORKFLOW_URL")
                .unwrap_or_else(|_| DEFAULT_WORKFLOW_URL.to_string()),
            auto_redirect_to_workflow: env::var("AUTO_REDIRECT_TO_WORKFLOW")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
            session_timeout,
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,

            // Secrets
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
        })
    }

    /// OAuth redirect URI registered with Google.
    pub fn google_redirect_uri(&self) -> String {
        format!(
            "{}/auth/google/callback",
            self.api_url.trim_end_matches('/')
        )
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("GOOGLE_CLIENT_ID", "test_id");
        env::set_var("GOOGLE_CLIENT_SECRET", " test_secret ");
        env::set_var("OAUTH_STATE_KEY", "test_state_key");
        env::set_var("SESSION_TIMEOUT_SECS", "900");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.google_client_id, "test_id");
        assert_eq!(config.google_client_secret, "test_secret");
        assert_eq!(config.session_timeout, Some(Duration::from_secs(900)));
        assert_eq!(config.botnoi_api_key_url, DEFAULT_BOTNOI_API_KEY_URL);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool(" YES "));
        assert!(parse_bool("1"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_google_redirect_uri() {
        let mut config = Config::test_default();
        config.api_url = "https://portal.example.com/".to_string();
        assert_eq!(
            config.google_redirect_uri(),
            "https://portal.example.com/auth/google/callback"
        );
    }
}
