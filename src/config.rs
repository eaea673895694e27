//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup; a `.env` file is honored for local
//! development.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::env;
use std::time::Duration;

use crate::services::cipher::KEY_SIZE;

/// Where credentials and vitals are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    /// Process-local maps; data is lost on restart
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Clone)]
pub struct Config {
    // --- Fitbit OAuth / API ---
    /// Fitbit OAuth client ID (public)
    pub client_id: String,
    /// Redirect URI registered with Fitbit
    pub redirect_uri: String,
    /// Fitbit authorization page
    pub authorization_url: String,
    /// Fitbit OAuth token endpoint
    pub token_url: String,
    /// Fitbit Web API base URL
    pub fitbit_api_url: String,
    /// Space-separated OAuth scopes requested at connect time
    pub oauth_scope: String,

    // --- Storage ---
    pub storage_backend: StorageBackend,
    /// GCP project ID
    pub gcp_project_id: String,
    pub users_collection: String,
    pub vitals_collection: String,

    // --- Server ---
    /// Server port
    pub port: u16,
    /// Timeout for each outbound Fitbit request
    pub request_timeout: Duration,
    /// Maximum Fitbit requests in flight across the process
    pub max_concurrent_requests: usize,
    /// Users processed concurrently by bulk jobs
    pub bulk_concurrency: usize,

    // --- Secrets ---
    /// Fitbit OAuth client secret
    pub client_secret: String,
    /// AES-256 key for credential fields (32 raw bytes)
    pub cipher_key: Vec<u8>,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
    /// Shared secret required on `/tasks/*` routes when set
    pub scheduler_token: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("fitbit_api_url", &self.fitbit_api_url)
            .field("storage_backend", &self.storage_backend)
            .field("gcp_project_id", &self.gcp_project_id)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Config for tests only. Uses an all-zero cipher key.
    pub fn test_default() -> Self {
        Self {
            client_id: "test_client_id".to_string(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            authorization_url: "https://www.fitbit.com/oauth2/authorize".to_string(),
            token_url: "http://127.0.0.1:9/oauth2/token".to_string(),
            fitbit_api_url: "http://127.0.0.1:9".to_string(),
            oauth_scope: DEFAULT_SCOPE.to_string(),
            storage_backend: StorageBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            users_collection: "users".to_string(),
            vitals_collection: "vitals".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(5),
            max_concurrent_requests: 8,
            bulk_concurrency: 4,
            client_secret: "test_secret".to_string(),
            cipher_key: vec![0u8; KEY_SIZE],
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
            scheduler_token: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let storage_backend = match env::var("STORAGE_BACKEND").as_deref() {
            Ok("memory") => StorageBackend::Memory,
            Ok("firestore") | Err(_) => StorageBackend::Firestore,
            Ok(_) => {
                return Err(ConfigError::Invalid {
                    var: "STORAGE_BACKEND",
                    reason: "expected 'firestore' or 'memory'".to_string(),
                })
            }
        };

        Ok(Self {
            client_id: required("CLIENT_ID")?,
            redirect_uri: env::var("REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8080/callback".to_string()),
            authorization_url: env::var("AUTHORIZATION_URL")
                .unwrap_or_else(|_| "https://www.fitbit.com/oauth2/authorize".to_string()),
            token_url: env::var("TOKEN_URL")
                .unwrap_or_else(|_| "https://api.fitbit.com/oauth2/token".to_string()),
            fitbit_api_url: env::var("FITBIT_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "https://api.fitbit.com".to_string()),
            oauth_scope: env::var("SCOPE").unwrap_or_else(|_| DEFAULT_SCOPE.to_string()),

            storage_backend,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            users_collection: env::var("COLLECTION_NAME")
                .unwrap_or_else(|_| crate::db::collections::USERS.to_string()),
            vitals_collection: env::var("VITALS_COLLECTION")
                .unwrap_or_else(|_| crate::db::collections::VITALS.to_string()),

            port: parse_or("PORT", 8080)?,
            request_timeout: Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 30)?),
            max_concurrent_requests: parse_or("MAX_CONCURRENT_REQUESTS", 8)?,
            bulk_concurrency: parse_or("BULK_CONCURRENCY", 4)?,

            client_secret: required("CLIENT_SECRET")?,
            cipher_key: decode_cipher_key(&required("CIPHER_KEY")?)?,
            oauth_state_key: required("OAUTH_STATE_KEY")?.into_bytes(),
            scheduler_token: env::var("SCHEDULER_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }
}

/// OAuth scopes covering every data scope we fetch.
const DEFAULT_SCOPE: &str =
    "activity heartrate location nutrition oxygen_saturation profile respiratory_rate settings sleep social temperature weight";

fn required(var: &'static str) -> Result<String, ConfigError> {
    env::var(var)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(var))
}

fn parse_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            reason: format!("cannot parse '{}'", v),
        }),
        Err(_) => Ok(default),
    }
}

/// Decode the base64 cipher key and check it is 256 bits.
pub fn decode_cipher_key(encoded: &str) -> Result<Vec<u8>, ConfigError> {
    let key = BASE64
        .decode(encoded.trim())
        .map_err(|e| ConfigError::Invalid {
            var: "CIPHER_KEY",
            reason: format!("invalid base64: {}", e),
        })?;

    if key.len() != KEY_SIZE {
        return Err(ConfigError::Invalid {
            var: "CIPHER_KEY",
            reason: format!("expected {} bytes, got {}", KEY_SIZE, key.len()),
        });
    }

    Ok(key)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
