//! Environment-gated CORS, adapted from the teacher's `create_cors_layer`
//! but threaded explicitly from `AppConfig` rather than re-reading env vars
//! at request-routing time.

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use tower_http::cors::CorsLayer;

use crate::config::{AppConfig, Environment};

pub fn create_cors_layer(config: &AppConfig) -> CorsLayer {
    match config.environment {
        Environment::Development => create_development_cors(config),
        Environment::Staging => create_staging_cors(config),
        Environment::Production => create_production_cors(config),
    }
}

fn build_layer(origins: Vec<String>, max_age_secs: u64, include_requested_with: bool) -> CorsLayer {
    let mut headers = vec![ACCEPT, AUTHORIZATION, CONTENT_TYPE];
    if include_requested_with {
        headers.push("x-requested-with".parse().unwrap());
    }
    headers.push("x-correlation-id".parse().unwrap());

    CorsLayer::new()
        .allow_origin(
            origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(headers)
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(max_age_secs))
}

fn create_development_cors(config: &AppConfig) -> CorsLayer {
    let origins = config.cache.cors_allowed_origins.clone().unwrap_or_else(|| {
        vec![
            "http://localhost:3000".to_string(),
            "http://127.0.0.1:3000".to_string(),
        ]
    });
    build_layer(origins, 3600, true)
}

fn create_staging_cors(config: &AppConfig) -> CorsLayer {
    let origins = config.cache.cors_allowed_origins.clone().unwrap_or_default();
    build_layer(origins, 1800, true)
}

fn create_production_cors(config: &AppConfig) -> CorsLayer {
    let origins = config.cache.cors_allowed_origins.clone().unwrap_or_default();
    build_layer(origins, 600, false)
}

/// Validate CORS configuration at startup; called from `main` before serving.
pub fn validate_cors_config(config: &AppConfig) -> Result<(), String> {
    if !config.environment.is_production() {
        return Ok(());
    }

    let Some(origins) = &config.cache.cors_allowed_origins else {
        tracing::warn!("no CORS_ALLOWED_ORIGINS set for production, allowing no cross-origin callers");
        return Ok(());
    };

    for origin in origins {
        if !origin.starts_with("https://") {
            return Err(format!("production CORS origin must use HTTPS: {origin}"));
        }
        if origin.contains("localhost") || origin.contains("127.0.0.1") {
            return Err(format!("production CORS should not allow localhost: {origin}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, CacheConfig, DatabaseSettings, GraphSettings, RedisSettings, ServerConfig, SyncSettings};

    fn base_config(environment: Environment, origins: Option<Vec<String>>) -> AppConfig {
        AppConfig {
            environment,
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8000,
                request_timeout_secs: 30,
            },
            database: DatabaseSettings {
                url: "postgres://db/discogsography".into(),
                min_connections: 2,
                max_connections: 20,
            },
            graph: GraphSettings { path: "/tmp/graph".into() },
            redis: RedisSettings {
                url: "redis://127.0.0.1:6379".into(),
            },
            auth: AuthConfig {
                jwt_secret: "a-test-secret-that-is-long-enough-12345".into(),
                access_token_ttl_seconds: 1800,
            },
            cache: CacheConfig {
                autocomplete_capacity: 512,
                cors_allowed_origins: origins,
                webhook_secret: None,
            },
            sync: SyncSettings {
                cooldown_seconds: 600,
                discogs_user_agent: "discogsography/0.1".into(),
                token_encryption_key: [0u8; 32],
            },
        }
    }

    #[test]
    fn production_rejects_http_origin() {
        let config = base_config(Environment::Production, Some(vec!["http://example.com".into()]));
        assert!(validate_cors_config(&config).is_err());
    }

    #[test]
    fn production_rejects_localhost() {
        let config = base_config(Environment::Production, Some(vec!["https://localhost:3000".into()]));
        assert!(validate_cors_config(&config).is_err());
    }

    #[test]
    fn production_accepts_https_origin() {
        let config = base_config(Environment::Production, Some(vec!["https://example.com".into()]));
        assert!(validate_cors_config(&config).is_ok());
    }

    #[test]
    fn development_skips_validation() {
        let config = base_config(Environment::Development, Some(vec!["http://example.com".into()]));
        assert!(validate_cors_config(&config).is_ok());
    }
}
