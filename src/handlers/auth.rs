//! Register / login / me — the thin account surface this package owns
//! directly (everything else authenticates against a JWT issued here).

use axum::{extract::State, http::StatusCode, Extension, Json};
use discogsography_core::error::{AppError, Result};
use discogsography_core::jwt::{self, Claims};
use discogsography_core::models::{User, UserResponse};
use discogsography_core::password::{hash_password, verify_password};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

fn validate_credentials(credentials: &Credentials) -> Result<()> {
    if credentials.email.trim().is_empty() {
        return Err(AppError::MissingField { field: "email".into() });
    }
    if !credentials.email.contains('@') {
        return Err(AppError::InvalidRequestFormat("email is not a valid address".into()));
    }
    if credentials.password.len() < 8 {
        return Err(AppError::InvalidRequestFormat(
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    validate_credentials(&credentials)?;

    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&credentials.email)
        .fetch_optional(state.relational.pool())
        .await?;
    if existing.is_some() {
        return Err(AppError::AlreadyExists { resource: "Email address".into() });
    }

    let hashed_password = hash_password(&credentials.password);

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, hashed_password, is_active, created_at)
        VALUES ($1, $2, $3, true, now())
        RETURNING id, email, hashed_password, is_active, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&credentials.email)
    .bind(&hashed_password)
    .fetch_one(state.relational.pool())
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<TokenResponse>> {
    let user: Option<User> =
        sqlx::query_as("SELECT id, email, hashed_password, is_active, created_at FROM users WHERE email = $1")
            .bind(&credentials.email)
            .fetch_optional(state.relational.pool())
            .await?;

    let user = user.ok_or(AppError::InvalidCredentials)?;
    if !user.is_active || !verify_password(&credentials.password, &user.hashed_password) {
        return Err(AppError::InvalidCredentials);
    }

    let ttl = state.config.auth.access_token_ttl_seconds;
    let access_token = jwt::issue(state.config.auth.jwt_secret.as_bytes(), user.id, ttl);

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: ttl,
    }))
}

pub async fn me(State(state): State<AppState>, Extension(claims): Extension<Claims>) -> Result<Json<UserResponse>> {
    let user: User = sqlx::query_as("SELECT id, email, hashed_password, is_active, created_at FROM users WHERE id = $1")
        .bind(claims.sub)
        .fetch_optional(state.relational.pool())
        .await?
        .ok_or(AppError::TokenInvalid)?;

    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials { email: email.to_string(), password: password.to_string() }
    }

    #[test]
    fn rejects_empty_email() {
        let err = validate_credentials(&creds("", "longenoughpassword")).unwrap_err();
        assert!(matches!(err, AppError::MissingField { .. }));
    }

    #[test]
    fn rejects_email_without_at_sign() {
        let err = validate_credentials(&creds("not-an-email", "longenoughpassword")).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequestFormat(_)));
    }

    #[test]
    fn rejects_short_password() {
        let err = validate_credentials(&creds("a@b.com", "short")).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequestFormat(_)));
    }

    #[test]
    fn accepts_valid_credentials() {
        assert!(validate_credentials(&creds("a@b.com", "longenoughpassword")).is_ok());
    }
}
