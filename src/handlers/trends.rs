//! `GET /api/trends` — release-count-by-year time series for a node.

use axum::extract::{Query, State};
use axum::Json;
use discogsography_core::error::{AppError, Result};
use discogsography_core::models::{QueryKind, TrendPoint};
use serde::Deserialize;

use crate::services::graph_queries;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TrendsParams {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: QueryKind,
}

pub async fn trends(State(state): State<AppState>, Query(params): Query<TrendsParams>) -> Result<Json<Vec<TrendPoint>>> {
    let points = graph_queries::trends(&state.graph, params.kind, &params.name)
        .await?
        .ok_or(AppError::NotFound {
            resource: format!("{} '{}'", params.kind.as_str(), params.name),
        })?;

    Ok(Json(points))
}
