//! `GET /api/explore` — a center node plus its synthetic category counts.

use axum::extract::{Query, State};
use axum::Json;
use discogsography_core::error::{AppError, Result};
use discogsography_core::models::{ExploreResult, QueryKind};
use serde::Deserialize;

use crate::services::graph_queries;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExploreParams {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: QueryKind,
}

pub async fn explore(State(state): State<AppState>, Query(params): Query<ExploreParams>) -> Result<Json<ExploreResult>> {
    let Some((center, categories)) = graph_queries::explore(&state.graph, params.kind, &params.name).await? else {
        return Err(AppError::NotFound {
            resource: format!("{} '{}'", params.kind.as_str(), params.name),
        });
    };

    Ok(Json(ExploreResult { center, categories }))
}
