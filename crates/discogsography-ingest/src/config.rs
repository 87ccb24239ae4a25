//! Environment configuration for the sink binaries.

use discogsography_core::error::AppError;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub amqp_url: String,
    pub database_url: String,
    pub graph_path: String,
    pub prefetch: u16,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            amqp_url: require_env("AMQP_URL")?,
            database_url: require_env("DATABASE_URL")?,
            graph_path: require_env("GRAPH_DB_PATH")?,
            prefetch: std::env::var("BUS_PREFETCH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        })
    }
}

fn require_env(key: &str) -> Result<String, AppError> {
    std::env::var(key).map_err(|_| AppError::ConfigurationError {
        message: format!("missing required environment variable {key}"),
    })
}
