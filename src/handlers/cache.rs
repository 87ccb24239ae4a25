//! `POST /api/cache/invalidate` — webhook-secret-gated Redis key sweep.

use axum::extract::State;
use axum::Json;
use discogsography_core::error::Result;
use serde::{Deserialize, Serialize};

use crate::services::cache_invalidation;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    pub pattern: String,
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub deleted_count: u64,
}

pub async fn invalidate(
    State(state): State<AppState>,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    cache_invalidation::check_secret(state.config.cache.webhook_secret.as_deref(), &request.secret)?;
    state.cache_invalidation_limiter.check().await?;
    let deleted_count = cache_invalidation::invalidate_pattern(&state.redis_pool, &request.pattern).await?;
    Ok(Json(InvalidateResponse { deleted_count }))
}
