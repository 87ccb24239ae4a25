//! `GET /api/node/{id}` — one rich record per node kind.

use axum::extract::{Path, Query, State};
use axum::Json;
use discogsography_core::error::{AppError, Result};
use discogsography_core::models::{GraphNode, QueryKind};
use serde::Deserialize;

use crate::services::graph_queries;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NodeParams {
    #[serde(rename = "type")]
    pub kind: QueryKind,
}

pub async fn node_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<NodeParams>,
) -> Result<Json<GraphNode>> {
    let node = graph_queries::find_by_id(&state.graph, params.kind, &id)
        .await?
        .ok_or(AppError::NotFound { resource: format!("{} '{id}'", params.kind.as_str()) })?;

    Ok(Json(node))
}
