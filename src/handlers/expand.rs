//! `GET /api/expand` — a single category's children, paginated.

use axum::extract::{Query, State};
use axum::Json;
use discogsography_core::error::{AppError, Result};
use discogsography_core::models::{ExpandResult, QueryKind};
use serde::Deserialize;

use crate::services::graph_queries;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExpandParams {
    pub node_id: String,
    #[serde(rename = "type")]
    pub kind: QueryKind,
    pub category: String,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn expand(State(state): State<AppState>, Query(params): Query<ExpandParams>) -> Result<Json<ExpandResult>> {
    let limit = params.limit.unwrap_or(20);
    if limit == 0 || limit > 200 {
        return Err(AppError::InvalidRequestFormat("limit must be between 1 and 200".into()));
    }
    let offset = params.offset.unwrap_or(0);

    let (total, children) = tokio::try_join!(
        graph_queries::category_count(&state.graph, params.kind, &params.node_id, &params.category),
        graph_queries::category_children(&state.graph, params.kind, &params.node_id, &params.category, limit, offset),
    )?;

    let has_more = offset + children.len() < total as usize;

    Ok(Json(ExpandResult {
        children,
        total,
        offset,
        limit,
        has_more,
    }))
}
