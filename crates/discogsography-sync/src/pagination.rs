//! Paginated collection/wantlist fetch + per-page upsert (spec §4.D.2).
//!
//! The collection and wantlist endpoints disagree about where a release id
//! lives in the response (`item.basic_information.id` vs top-level
//! `item.id`) and about the response's top-level array key (`releases` vs
//! `wants`). This is the asymmetry the reference implementation's module
//! doc calls out, and it must survive verbatim here.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use discogsography_core::error::{AppError, Result};
use discogsography_db::GraphStore;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::client::{DiscogsClient, PageOutcome};

pub const PAGE_SIZE: u32 = 100;
const SOFT_RATE_LIMIT_DELAY: Duration = Duration::from_millis(500);
const RATE_LIMIT_SLEEP: Duration = Duration::from_secs(60);

/// Fetch and upsert every page of the user's collection (folder 0, all
/// items). Returns the number of items synced.
pub async fn sync_collection(
    client: &DiscogsClient,
    username: &str,
    user_uuid: Uuid,
    pool: &PgPool,
    graph: &GraphStore,
) -> Result<u64> {
    let base_url = format!("https://api.discogs.com/users/{username}/collection/folders/0/releases");
    let mut total = 0u64;
    let mut page = 1u32;

    loop {
        let mut params = BTreeMap::new();
        params.insert("per_page".to_string(), PAGE_SIZE.to_string());
        params.insert("page".to_string(), page.to_string());
        params.insert("sort".to_string(), "added".to_string());
        params.insert("sort_order".to_string(), "desc".to_string());

        let body = match client.get(&base_url, &params).await? {
            PageOutcome::Ok(body) => body,
            PageOutcome::RateLimited => {
                tracing::warn!("discogs rate limited us, sleeping 60s");
                tokio::time::sleep(RATE_LIMIT_SLEEP).await;
                continue;
            }
            PageOutcome::Failed { status } => {
                tracing::error!(status, page, "collection API error, ending sync with partial data");
                break;
            }
        };

        let items = body.get("releases").and_then(Value::as_array).cloned().unwrap_or_default();
        let synced_here = upsert_collection_page(user_uuid, &items, pool, graph).await?;
        total += synced_here;

        let pages = body
            .get("pagination")
            .and_then(|p| p.get("pages"))
            .and_then(Value::as_u64)
            .unwrap_or(1) as u32;
        if pages <= page {
            break;
        }
        page += 1;
        tokio::time::sleep(SOFT_RATE_LIMIT_DELAY).await;
    }

    Ok(total)
}

pub async fn sync_wantlist(
    client: &DiscogsClient,
    username: &str,
    user_uuid: Uuid,
    pool: &PgPool,
    graph: &GraphStore,
) -> Result<u64> {
    let base_url = format!("https://api.discogs.com/users/{username}/wants");
    let mut total = 0u64;
    let mut page = 1u32;

    loop {
        let mut params = BTreeMap::new();
        params.insert("per_page".to_string(), PAGE_SIZE.to_string());
        params.insert("page".to_string(), page.to_string());

        let body = match client.get(&base_url, &params).await? {
            PageOutcome::Ok(body) => body,
            PageOutcome::RateLimited => {
                tracing::warn!("discogs rate limited us, sleeping 60s");
                tokio::time::sleep(RATE_LIMIT_SLEEP).await;
                continue;
            }
            PageOutcome::Failed { status } => {
                tracing::error!(status, page, "wantlist API error, ending sync with partial data");
                break;
            }
        };

        let items = body.get("wants").and_then(Value::as_array).cloned().unwrap_or_default();
        let synced_here = upsert_wantlist_page(user_uuid, &items, pool, graph).await?;
        total += synced_here;

        let pages = body
            .get("pagination")
            .and_then(|p| p.get("pages"))
            .and_then(Value::as_u64)
            .unwrap_or(1) as u32;
        if pages <= page {
            break;
        }
        page += 1;
        tokio::time::sleep(SOFT_RATE_LIMIT_DELAY).await;
    }

    Ok(total)
}

async fn upsert_collection_page(user_uuid: Uuid, items: &[Value], pool: &PgPool, graph: &GraphStore) -> Result<u64> {
    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let mut release_ids = Vec::new();
    let mut count = 0u64;

    for item in items {
        let basic = item.get("basic_information");
        let Some(release_id) = basic.and_then(|b| b.get("id")).and_then(Value::as_i64) else {
            continue;
        };
        let instance_id = item.get("instance_id").and_then(Value::as_i64).unwrap_or(0);
        let folder = item.get("folder_id").and_then(Value::as_i64).map(|n| n.to_string());
        let artist = basic
            .and_then(|b| b.get("artists"))
            .and_then(Value::as_array)
            .and_then(|a| a.first())
            .and_then(|a| a.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let title = basic.and_then(|b| b.get("title")).and_then(Value::as_str).map(str::to_string);
        let year = basic.and_then(|b| b.get("year")).and_then(Value::as_i64).map(|n| n as i32);
        let formats = basic.and_then(|b| b.get("formats")).cloned().unwrap_or_else(|| Value::Array(vec![]));
        let label = basic
            .and_then(|b| b.get("labels"))
            .and_then(Value::as_array)
            .and_then(|l| l.first())
            .and_then(|l| l.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let rating = item.get("rating").and_then(Value::as_i64).map(|n| n as i32);
        let date_added = item
            .get("date_added")
            .and_then(Value::as_str)
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        sqlx::query(
            "INSERT INTO user_collections (
                 user_id, release_id, instance_id, folder, artist, title, year, formats, label,
                 rating, date_added, metadata, updated_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, '{}'::jsonb, now())
             ON CONFLICT (user_id, release_id, instance_id) DO UPDATE SET
                 folder = EXCLUDED.folder, artist = EXCLUDED.artist, title = EXCLUDED.title,
                 year = EXCLUDED.year, formats = EXCLUDED.formats, label = EXCLUDED.label,
                 rating = EXCLUDED.rating, date_added = EXCLUDED.date_added, updated_at = now()",
        )
        .bind(user_uuid)
        .bind(release_id)
        .bind(instance_id)
        .bind(folder)
        .bind(artist)
        .bind(title)
        .bind(year)
        .bind(formats)
        .bind(label)
        .bind(rating)
        .bind(date_added)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        release_ids.push((release_id, instance_id, rating.unwrap_or(0)));
        count += 1;
    }

    tx.commit().await.map_err(AppError::from)?;

    for (release_id, instance_id, rating) in release_ids {
        // MATCH-gated: if the Release node hasn't been imported by the
        // catalog side yet, this MERGE is a no-op instead of creating a
        // bare stub node. The next full sync after the catalog catches up
        // creates the edge — convergence, not a transactional guarantee.
        let gated = format!(
            "MATCH (r:Release {{id: '{release_id}'}}) \
             MERGE (u:User {{id: '{user_uuid}'}}) \
             MERGE (u)-[c:COLLECTED {{instance_id: {instance_id}}}]->(r) \
             SET c.rating = {rating}"
        );
        if let Err(err) = graph.execute(gated).await {
            tracing::debug!(error = %err, release_id, "skipping COLLECTED edge, release not yet in catalog");
        }
    }

    Ok(count)
}

async fn upsert_wantlist_page(user_uuid: Uuid, items: &[Value], pool: &PgPool, graph: &GraphStore) -> Result<u64> {
    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let mut release_ids = Vec::new();
    let mut count = 0u64;

    for item in items {
        // CRITICAL: the wantlist id is top-level, unlike the collection's
        // nested `basic_information.id`.
        let Some(release_id) = item.get("id").and_then(Value::as_i64) else {
            continue;
        };
        let basic = item.get("basic_information");
        let artist = basic
            .and_then(|b| b.get("artists"))
            .and_then(Value::as_array)
            .and_then(|a| a.first())
            .and_then(|a| a.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let title = basic.and_then(|b| b.get("title")).and_then(Value::as_str).map(str::to_string);
        let year = basic.and_then(|b| b.get("year")).and_then(Value::as_i64).map(|n| n as i32);
        let format = basic
            .and_then(|b| b.get("formats"))
            .and_then(Value::as_array)
            .and_then(|f| f.first())
            .and_then(|f| f.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let rating = item.get("rating").and_then(Value::as_i64).map(|n| n as i32);
        let notes = item.get("notes").and_then(Value::as_str).map(str::to_string);
        let date_added = item
            .get("date_added")
            .and_then(Value::as_str)
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        sqlx::query(
            "INSERT INTO user_wantlists (
                 user_id, release_id, artist, title, year, format, rating, notes, date_added, updated_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
             ON CONFLICT (user_id, release_id) DO UPDATE SET
                 artist = EXCLUDED.artist, title = EXCLUDED.title, year = EXCLUDED.year,
                 format = EXCLUDED.format, rating = EXCLUDED.rating, notes = EXCLUDED.notes,
                 date_added = EXCLUDED.date_added, updated_at = now()",
        )
        .bind(user_uuid)
        .bind(release_id)
        .bind(artist)
        .bind(title)
        .bind(year)
        .bind(format)
        .bind(rating)
        .bind(notes)
        .bind(date_added)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        release_ids.push((release_id, rating.unwrap_or(0)));
        count += 1;
    }

    tx.commit().await.map_err(AppError::from)?;

    for (release_id, rating) in release_ids {
        let gated = format!(
            "MATCH (r:Release {{id: '{release_id}'}}) \
             MERGE (u:User {{id: '{user_uuid}'}}) \
             MERGE (u)-[w:WANTS]->(r) SET w.rating = {rating}"
        );
        if let Err(err) = graph.execute(gated).await {
            tracing::debug!(error = %err, release_id, "skipping WANTS edge, release not yet in catalog");
        }
    }

    Ok(count)
}
