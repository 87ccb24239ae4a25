//! Environment-sourced application configuration, following the teacher's
//! `from_env()` / production-validation pattern (grounded in the original
//! `ConfigError`/`Environment`/`AppConfig` shape) but scoped to what the
//! Read API needs: server bind address, the relational/graph/redis
//! connection settings, JWT secret, and the autocomplete cache + webhook
//! knobs from spec §11.

use std::env;

use discogsography_core::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        match env::var("ENVIRONMENT").unwrap_or_default().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct GraphSettings {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct RedisSettings {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub autocomplete_capacity: usize,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub cooldown_seconds: u64,
    pub discogs_user_agent: String,
    pub token_encryption_key: [u8; 32],
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub graph: GraphSettings,
    pub redis: RedisSettings,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub sync: SyncSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let environment = Environment::from_env();

        let key_hex = require_env("TOKEN_ENCRYPTION_KEY")?;
        let key_bytes = hex::decode(&key_hex).map_err(|e| AppError::ConfigurationError {
            message: format!("TOKEN_ENCRYPTION_KEY is not valid hex: {e}"),
        })?;
        let token_encryption_key: [u8; 32] =
            key_bytes.try_into().map_err(|_| AppError::ConfigurationError {
                message: "TOKEN_ENCRYPTION_KEY must decode to exactly 32 bytes".into(),
            })?;

        let config = Self {
            environment,
            server: ServerConfig {
                host: env_or_default("SERVER_HOST", "0.0.0.0"),
                port: env_or_default("SERVER_PORT", "8000")
                    .parse()
                    .map_err(|_| AppError::ConfigurationError {
                        message: "SERVER_PORT is not a valid port number".into(),
                    })?,
                request_timeout_secs: env_or_default("REQUEST_TIMEOUT_SECS", "30")
                    .parse()
                    .unwrap_or(30),
            },
            database: DatabaseSettings {
                url: require_env("DATABASE_URL")?,
                min_connections: env_or_default("DATABASE_MIN_CONNECTIONS", "2")
                    .parse()
                    .unwrap_or(2),
                max_connections: env_or_default("DATABASE_MAX_CONNECTIONS", "20")
                    .parse()
                    .unwrap_or(20),
            },
            graph: GraphSettings {
                path: require_env("GRAPH_DB_PATH")?,
            },
            redis: RedisSettings {
                url: env_or_default("REDIS_URL", "redis://127.0.0.1:6379"),
            },
            auth: AuthConfig {
                jwt_secret: require_env("JWT_SECRET")?,
                access_token_ttl_seconds: env_or_default("ACCESS_TOKEN_TTL_SECONDS", "1800")
                    .parse()
                    .unwrap_or(1800),
            },
            cache: CacheConfig {
                autocomplete_capacity: env_or_default("AUTOCOMPLETE_CACHE_CAPACITY", "512")
                    .parse()
                    .unwrap_or(512),
                cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok().map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                }),
                webhook_secret: env::var("CACHE_WEBHOOK_SECRET").ok(),
            },
            sync: SyncSettings {
                cooldown_seconds: env_or_default("SYNC_COOLDOWN_SECONDS", "600")
                    .parse()
                    .unwrap_or(600),
                discogs_user_agent: env_or_default(
                    "DISCOGS_USER_AGENT",
                    "discogsography/0.1 +https://github.com",
                ),
                token_encryption_key,
            },
        };

        if config.environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    fn validate_production(&self) -> Result<(), AppError> {
        if self.auth.jwt_secret.len() < 32 {
            return Err(AppError::ConfigurationError {
                message: "JWT_SECRET must be at least 32 characters in production".into(),
            });
        }
        if self.database.url.contains("localhost") || self.database.url.contains("127.0.0.1") {
            return Err(AppError::ConfigurationError {
                message: "DATABASE_URL must not point at localhost in production".into(),
            });
        }
        Ok(())
    }
}

fn require_env(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::ConfigurationError {
        message: format!("missing required environment variable {key}"),
    })
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_minimal_env() {
        env::set_var("TOKEN_ENCRYPTION_KEY", hex::encode([7u8; 32]));
        env::set_var("DATABASE_URL", "postgres://localhost/discogsography");
        env::set_var("GRAPH_DB_PATH", "/tmp/graph");
        env::set_var("JWT_SECRET", "a-test-secret-that-is-long-enough-12345");
        env::remove_var("ENVIRONMENT");
    }

    #[test]
    #[serial]
    fn loads_with_defaults() {
        set_minimal_env();
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.cache.autocomplete_capacity, 512);
        assert_eq!(config.sync.cooldown_seconds, 600);
    }

    #[test]
    #[serial]
    fn production_rejects_localhost_database() {
        set_minimal_env();
        env::set_var("ENVIRONMENT", "production");
        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, AppError::ConfigurationError { .. }));
        env::remove_var("ENVIRONMENT");
    }

    #[test]
    #[serial]
    fn missing_required_var_fails() {
        set_minimal_env();
        env::remove_var("JWT_SECRET");
        assert!(AppConfig::from_env().is_err());
        env::set_var("JWT_SECRET", "a-test-secret-that-is-long-enough-12345");
    }
}
