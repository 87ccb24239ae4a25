//! Auth-gated user-centric views: collection, wantlist, recommendations,
//! collection stats — plus the optional-auth collection/wantlist status
//! lookup.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::{Extension, Json};
use discogsography_core::cursor;
use discogsography_core::error::Result;
use discogsography_core::jwt::Claims;
use discogsography_core::models::{CollectionItem, CollectionStats, ReleaseStatus, WantlistItem};
use serde::Deserialize;

use crate::services::{graph_queries, recommendations};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

pub async fn collection(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.cursor.as_deref().map(cursor::decode).unwrap_or(0);

    let items: Vec<CollectionItem> = sqlx::query_as(
        r#"
        SELECT user_id, release_id, instance_id, folder, artist, title, year, formats, label, rating, date_added, metadata, updated_at
        FROM user_collections
        WHERE user_id = $1
        ORDER BY date_added DESC, instance_id
        OFFSET $2 LIMIT $3
        "#,
    )
    .bind(claims.sub)
    .bind(offset as i64)
    .bind(limit as i64)
    .fetch_all(state.relational.pool())
    .await?;

    let next = cursor::next_cursor(offset, limit, items.len());
    Ok(Json(serde_json::json!({ "items": items, "next_cursor": next })))
}

pub async fn wantlist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.cursor.as_deref().map(cursor::decode).unwrap_or(0);

    let items: Vec<WantlistItem> = sqlx::query_as(
        r#"
        SELECT user_id, release_id, artist, title, year, format, rating, notes, date_added, updated_at
        FROM user_wantlists
        WHERE user_id = $1
        ORDER BY date_added DESC, release_id
        OFFSET $2 LIMIT $3
        "#,
    )
    .bind(claims.sub)
    .bind(offset as i64)
    .bind(limit as i64)
    .fetch_all(state.relational.pool())
    .await?;

    let next = cursor::next_cursor(offset, limit, items.len());
    Ok(Json(serde_json::json!({ "items": items, "next_cursor": next })))
}

pub async fn recommendations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<discogsography_core::models::RecommendedRelease>>> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let recs = recommendations::recommend(&state.graph, &state.relational, claims.sub, limit).await?;
    Ok(Json(recs))
}

pub async fn collection_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CollectionStats>> {
    let (total_releases, total_artists, total_labels): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(DISTINCT release_id),
            COUNT(DISTINCT artist),
            COUNT(DISTINCT label)
        FROM user_collections
        WHERE user_id = $1
        "#,
    )
    .bind(claims.sub)
    .fetch_one(state.relational.pool())
    .await?;

    let genre_rows = graph_queries::collection_genre_counts(&state.graph, &claims.sub.to_string()).await?;

    Ok(Json(CollectionStats {
        total_releases,
        total_artists,
        total_labels,
        genres: genre_rows,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    pub ids: String,
}

pub async fn status(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Query(params): Query<StatusParams>,
) -> Result<Json<HashMap<i64, ReleaseStatus>>> {
    let release_ids: Vec<i64> = params.ids.split(',').filter_map(|s| s.trim().parse().ok()).collect();

    let Some(Extension(claims)) = claims else {
        let unauthenticated = release_ids
            .into_iter()
            .map(|id| (id, ReleaseStatus { in_collection: false, in_wantlist: false }))
            .collect();
        return Ok(Json(unauthenticated));
    };

    let collected: Vec<i64> = sqlx::query_scalar(
        "SELECT release_id FROM user_collections WHERE user_id = $1 AND release_id = ANY($2)",
    )
    .bind(claims.sub)
    .bind(&release_ids)
    .fetch_all(state.relational.pool())
    .await?;

    let wanted: Vec<i64> =
        sqlx::query_scalar("SELECT release_id FROM user_wantlists WHERE user_id = $1 AND release_id = ANY($2)")
            .bind(claims.sub)
            .bind(&release_ids)
            .fetch_all(state.relational.pool())
            .await?;

    let result = release_ids
        .into_iter()
        .map(|id| {
            (
                id,
                ReleaseStatus {
                    in_collection: collected.contains(&id),
                    in_wantlist: wanted.contains(&id),
                },
            )
        })
        .collect();

    Ok(Json(result))
}
