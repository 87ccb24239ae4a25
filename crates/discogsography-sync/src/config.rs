//! Environment configuration for the sync engine's token cipher key and
//! the Discogs client's declared User-Agent.

use discogsography_core::error::AppError;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub database_url: String,
    pub redis_url: String,
    pub graph_path: String,
    pub token_encryption_key: [u8; 32],
    pub discogs_user_agent: String,
    pub cooldown_seconds: u64,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let key_hex = require_env("TOKEN_ENCRYPTION_KEY")?;
        let key_bytes = hex::decode(&key_hex).map_err(|e| AppError::ConfigurationError {
            message: format!("TOKEN_ENCRYPTION_KEY is not valid hex: {e}"),
        })?;
        let token_encryption_key: [u8; 32] = key_bytes.try_into().map_err(|_| AppError::ConfigurationError {
            message: "TOKEN_ENCRYPTION_KEY must decode to exactly 32 bytes".into(),
        })?;

        Ok(Self {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            graph_path: require_env("GRAPH_DB_PATH")?,
            token_encryption_key,
            discogs_user_agent: std::env::var("DISCOGS_USER_AGENT")
                .unwrap_or_else(|_| "discogsography/0.1 +https://github.com".to_string()),
            cooldown_seconds: std::env::var("SYNC_COOLDOWN_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
        })
    }
}

fn require_env(key: &str) -> Result<String, AppError> {
    std::env::var(key).map_err(|_| AppError::ConfigurationError {
        message: format!("missing required environment variable {key}"),
    })
}
