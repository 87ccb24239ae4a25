//! `GET /api/autocomplete` — Lucene-escaped full-text lookup, cached.

use axum::extract::{Query, State};
use axum::Json;
use discogsography_core::error::{AppError, Result};
use discogsography_core::models::{AutocompleteQuery, AutocompleteSuggestion};

use crate::services::{graph_queries, lucene};
use crate::AppState;

pub async fn autocomplete(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteQuery>,
) -> Result<Json<Vec<AutocompleteSuggestion>>> {
    if params.q.trim().chars().count() < 2 {
        return Err(AppError::Validation("q must be at least 2 characters".into()));
    }
    let limit = params.limit.unwrap_or(10);
    if limit == 0 || limit > 50 {
        return Err(AppError::Validation("limit must be between 1 and 50".into()));
    }

    if let Some(cached) = state
        .autocomplete_cache
        .get(&params.q, params.kind, limit, &state.metrics)
        .await
    {
        return Ok(Json(cached));
    }

    let lucene_query = lucene::build_query(&params.q);
    let suggestions = graph_queries::autocomplete(&state.graph, params.kind, &params.q, &lucene_query, limit).await?;

    state
        .autocomplete_cache
        .insert(&params.q, params.kind, limit, suggestions.clone(), &state.metrics)
        .await;

    Ok(Json(suggestions))
}
