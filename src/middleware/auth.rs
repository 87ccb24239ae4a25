//! JWT gate middleware, grounded in the teacher's `auth_middleware` /
//! `optional_auth_middleware` pair but built directly on
//! `discogsography_core::jwt::verify` instead of an `AuthService` — this
//! package never stores users itself beyond the thin register/login surface.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use discogsography_core::jwt::{self, Claims};

use crate::AppState;

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
}

/// Required-auth gate: rejects with 401 unless the bearer token is a valid,
/// unexpired JWT signed with this instance's secret.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => return StatusCode::UNAUTHORIZED.into_response(),
    };

    match jwt::verify(state.config.auth.jwt_secret.as_bytes(), token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(_) => StatusCode::UNAUTHORIZED.into_response(),
    }
}

/// Optional-auth gate: attaches `Claims` to the request if the bearer token
/// verifies, but never rejects — handlers decide how to behave for anonymous
/// callers (e.g. the status-check endpoint defaults every id to "not owned").
pub async fn optional_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(token) = bearer_token(&request) {
        if let Ok(claims) = jwt::verify(state.config.auth.jwt_secret.as_bytes(), token) {
            request.extensions_mut().insert(claims);
        }
    }
    next.run(request).await
}

/// Pull the verified claims a prior auth gate attached to the request.
pub fn current_user(request: &Request) -> Option<&Claims> {
    request.extensions().get::<Claims>()
}
