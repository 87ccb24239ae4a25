//! Minimal env loading for the one-shot schema bootstrap.

use discogsography_core::error::AppError;

pub struct SchemaConfig {
    pub database_url: String,
    pub graph_path: String,
}

impl SchemaConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            database_url: require_env("DATABASE_URL")?,
            graph_path: require_env("GRAPH_DB_PATH")?,
        })
    }
}

fn require_env(key: &str) -> Result<String, AppError> {
    std::env::var(key).map_err(|_| AppError::ConfigurationError {
        message: format!("missing required environment variable {key}"),
    })
}
