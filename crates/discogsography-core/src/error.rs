//! Application-wide error type and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, AppError>;

/// Error response body returned to HTTP clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub correlation_id: String,
    pub timestamp: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    // Authentication
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication token required")]
    TokenRequired,

    #[error("Authentication token expired")]
    TokenExpired,

    #[error("Authentication token invalid")]
    TokenInvalid,

    // Validation / input
    #[error("Invalid request format: {0}")]
    InvalidRequestFormat(String),

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    // Resource
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Resource already exists: {resource}")]
    AlreadyExists { resource: String },

    #[error("Resource conflict: {message}")]
    Conflict { message: String },

    // Rate limiting / concurrency
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: Option<u64> },

    #[error("Sync already running for this user")]
    SyncAlreadyRunning,

    #[error("Sync is cooling down, try again in {retry_after} seconds")]
    SyncCooldown { retry_after: u64 },

    // Relational store
    #[error("Database connection failed")]
    DatabaseConnectionFailed,

    #[error("Database query failed")]
    DatabaseQueryFailed(#[source] sqlx::Error),

    #[error("Database constraint violation: {0}")]
    DatabaseConstraintViolation(String),

    // Redis
    #[error("Redis connection failed")]
    RedisConnectionFailed,

    #[error("Redis operation failed: {0}")]
    RedisOperationFailed(String),

    // Graph store
    #[error("Graph store transient failure: {0}")]
    GraphTransient(String),

    #[error("Graph store fatal failure: {0}")]
    GraphFatal(String),

    // Message bus
    #[error("Message bus transient failure: {0}")]
    BusTransient(String),

    #[error("Message bus fatal failure: {0}")]
    BusFatal(String),

    // Discogs upstream API
    #[error("Discogs API rate limited")]
    DiscogsRateLimited,

    #[error("Discogs API error: {status} {message}")]
    DiscogsApiError { status: u16, message: String },

    #[error("Discogs account not connected")]
    DiscogsNotConnected,

    // System
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal server error")]
    Internal { message: Option<String> },

    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequestFormat(_) | AppError::MissingField { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidCredentials
            | AppError::TokenRequired
            | AppError::TokenExpired
            | AppError::TokenInvalid => StatusCode::UNAUTHORIZED,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::AlreadyExists { .. }
            | AppError::Conflict { .. }
            | AppError::DatabaseConstraintViolation(_)
            | AppError::SyncAlreadyRunning => StatusCode::CONFLICT,
            AppError::RateLimitExceeded { .. }
            | AppError::SyncCooldown { .. }
            | AppError::DiscogsRateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::DiscogsNotConnected => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DiscogsApiError { .. } => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable
            | AppError::DatabaseConnectionFailed
            | AppError::RedisConnectionFailed
            | AppError::GraphTransient(_)
            | AppError::BusTransient(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "AUTH_INVALID_CREDENTIALS",
            AppError::TokenRequired => "AUTH_TOKEN_REQUIRED",
            AppError::TokenExpired => "AUTH_TOKEN_EXPIRED",
            AppError::TokenInvalid => "AUTH_TOKEN_INVALID",
            AppError::InvalidRequestFormat(_) => "INVALID_REQUEST_FORMAT",
            AppError::MissingField { .. } => "MISSING_FIELD",
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::NotFound { .. } => "RESOURCE_NOT_FOUND",
            AppError::AlreadyExists { .. } => "RESOURCE_ALREADY_EXISTS",
            AppError::Conflict { .. } => "RESOURCE_CONFLICT",
            AppError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            AppError::SyncAlreadyRunning => "SYNC_ALREADY_RUNNING",
            AppError::SyncCooldown { .. } => "SYNC_COOLDOWN",
            AppError::DatabaseConnectionFailed => "DATABASE_CONNECTION_FAILED",
            AppError::DatabaseQueryFailed(_) => "DATABASE_QUERY_FAILED",
            AppError::DatabaseConstraintViolation(_) => "DATABASE_CONSTRAINT_VIOLATION",
            AppError::RedisConnectionFailed => "REDIS_CONNECTION_FAILED",
            AppError::RedisOperationFailed(_) => "REDIS_OPERATION_FAILED",
            AppError::GraphTransient(_) => "GRAPH_TRANSIENT",
            AppError::GraphFatal(_) => "GRAPH_FATAL",
            AppError::BusTransient(_) => "BUS_TRANSIENT",
            AppError::BusFatal(_) => "BUS_FATAL",
            AppError::DiscogsRateLimited => "DISCOGS_RATE_LIMITED",
            AppError::DiscogsApiError { .. } => "DISCOGS_API_ERROR",
            AppError::DiscogsNotConnected => "DISCOGS_NOT_CONNECTED",
            AppError::ConfigurationError { .. } => "CONFIGURATION_ERROR",
            AppError::Internal { .. } => "INTERNAL_SERVER_ERROR",
            AppError::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidCredentials => "Invalid email or password".to_string(),
            AppError::TokenRequired => "Authentication required".to_string(),
            AppError::TokenExpired => "Session expired, please log in again".to_string(),
            AppError::TokenInvalid => "Invalid authentication token".to_string(),
            AppError::InvalidRequestFormat(msg) => format!("Invalid request format: {msg}"),
            AppError::MissingField { field } => format!("Missing required field: {field}"),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound { resource } => format!("{resource} not found"),
            AppError::AlreadyExists { resource } => format!("{resource} already exists"),
            AppError::Conflict { message } => message.clone(),
            AppError::RateLimitExceeded { .. } => {
                "Too many requests, please try again later".to_string()
            }
            AppError::SyncAlreadyRunning => "A sync is already running for this user".to_string(),
            AppError::SyncCooldown { retry_after } => {
                format!("Please wait {retry_after} seconds before syncing again")
            }
            AppError::DiscogsRateLimited => "Discogs rate limit reached, retrying".to_string(),
            AppError::DiscogsNotConnected => {
                "No Discogs account connected for this user".to_string()
            }
            _ => "An unexpected error occurred".to_string(),
        }
    }

    pub fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::RateLimitExceeded { retry_after } => {
                Some(json!({ "retry_after_seconds": retry_after }))
            }
            AppError::SyncCooldown { retry_after } => {
                Some(json!({ "retry_after_seconds": retry_after }))
            }
            AppError::DatabaseQueryFailed(e) => Some(json!({ "database_error": e.to_string() })),
            AppError::DiscogsApiError { status, message } => {
                Some(json!({ "status": status, "message": message }))
            }
            _ => None,
        }
    }

    /// True if a bus/graph consumer should NACK-with-requeue rather than shunt to the dead letter queue.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::BusTransient(_)
                | AppError::GraphTransient(_)
                | AppError::DatabaseConnectionFailed
                | AppError::RedisConnectionFailed
                | AppError::ServiceUnavailable
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let correlation_id = Uuid::new_v4().to_string();
        let status = self.status_code();
        let error_code = self.error_code();
        let user_message = self.user_message();
        let details = self.error_details();

        match &self {
            AppError::Internal { .. }
            | AppError::DatabaseConnectionFailed
            | AppError::DatabaseQueryFailed(_)
            | AppError::RedisConnectionFailed
            | AppError::GraphFatal(_)
            | AppError::BusFatal(_)
            | AppError::ConfigurationError { .. }
            | AppError::ServiceUnavailable => {
                tracing::error!(
                    correlation_id = %correlation_id,
                    error_code = %error_code,
                    error = %self,
                    "server error"
                );
            }
            AppError::DiscogsApiError { .. } | AppError::DiscogsRateLimited => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    error_code = %error_code,
                    error = %self,
                    "upstream discogs error"
                );
            }
            _ => {
                tracing::info!(
                    correlation_id = %correlation_id,
                    error_code = %error_code,
                    error = %self,
                    "client error"
                );
            }
        }

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            message: user_message,
            details,
            correlation_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    AppError::DatabaseConstraintViolation("unique constraint violation".into())
                } else if db_err.is_foreign_key_violation() {
                    AppError::DatabaseConstraintViolation(
                        "foreign key constraint violation".into(),
                    )
                } else {
                    AppError::DatabaseQueryFailed(err)
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                AppError::DatabaseConnectionFailed
            }
            _ => AppError::DatabaseQueryFailed(err),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError => AppError::RedisConnectionFailed,
            redis::ErrorKind::AuthenticationFailed => AppError::RedisConnectionFailed,
            _ => AppError::RedisOperationFailed(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal {
            message: Some(err.to_string()),
        }
    }
}
