//! `POST /api/sync` and `GET /api/sync/status` — trigger and observe a
//! user's Discogs sync.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{http::StatusCode, Extension, Json};
use discogsography_core::error::{AppError, Result};
use discogsography_core::jwt::Claims;
use discogsography_core::models::SyncHistoryResponse;
use serde::Serialize;
use serde_json::json;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SyncStartedResponse {
    pub sync_id: uuid::Uuid,
    pub status: &'static str,
}

/// Mirrors the `already_running` path's literal `status` field: the cooldown
/// case also gets its own `{"status":"cooldown"}` body rather than the
/// generic error envelope.
pub async fn trigger_sync(State(state): State<AppState>, Extension(claims): Extension<Claims>) -> Result<Response> {
    match state.sync_trigger.trigger(claims.sub).await {
        Ok(result) => {
            let status = if result.already_running { "already_running" } else { "started" };
            state.metrics.record_sync_triggered(status);
            Ok((
                StatusCode::ACCEPTED,
                Json(SyncStartedResponse { sync_id: result.sync_id, status }),
            )
                .into_response())
        }
        Err(AppError::SyncCooldown { .. }) => {
            state.metrics.record_sync_triggered("cooldown");
            Ok((StatusCode::TOO_MANY_REQUESTS, Json(json!({ "status": "cooldown" }))).into_response())
        }
        Err(err) => Err(err),
    }
}

pub async fn sync_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Option<SyncHistoryResponse>>> {
    let history: Option<discogsography_core::models::SyncHistory> = sqlx::query_as(
        r#"
        SELECT id, user_id, sync_type, status, items_synced, error_message, started_at, completed_at
        FROM sync_history
        WHERE user_id = $1
        ORDER BY started_at DESC
        LIMIT 1
        "#,
    )
    .bind(claims.sub)
    .fetch_optional(state.relational.pool())
    .await?;

    Ok(Json(history.map(Into::into)))
}
