//! Recommendation scoring: top-10 artists by collected-release count, then
//! score every other release by those artists by how many releases of its
//! artist the user has collected. No ML — this is the entire algorithm.

use discogsography_core::error::Result;
use discogsography_core::models::RecommendedRelease;
use discogsography_db::{GraphStore, RelationalStore};
use uuid::Uuid;

pub async fn recommend(
    graph: &GraphStore,
    relational: &RelationalStore,
    user_id: Uuid,
    limit: usize,
) -> Result<Vec<RecommendedRelease>> {
    let top_artists: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT artist, COUNT(*) AS collected_count
        FROM user_collections
        WHERE user_id = $1 AND artist IS NOT NULL
        GROUP BY artist
        ORDER BY collected_count DESC
        LIMIT 10
        "#,
    )
    .bind(user_id)
    .fetch_all(relational.pool())
    .await?;

    if top_artists.is_empty() {
        return Ok(Vec::new());
    }

    let mut scored: Vec<RecommendedRelease> = Vec::new();

    for (name, collected_count) in &top_artists {
        let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");

        let cypher = format!(
            "MATCH (a:Artist) WHERE a.name = '{escaped}' MATCH (a)<-[:BY]-(r:Release) RETURN r.id AS id, r.title AS title"
        );
        let rows = graph.query(cypher).await?;

        for row in rows {
            let release_id: i64 = row
                .get("id")
                .and_then(serde_json::Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            if release_id == 0 {
                continue;
            }

            let already_owned: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM user_collections WHERE user_id = $1 AND release_id = $2
                    UNION
                    SELECT 1 FROM user_wantlists WHERE user_id = $1 AND release_id = $2
                )
                "#,
            )
            .bind(user_id)
            .bind(release_id)
            .fetch_one(relational.pool())
            .await?;

            if already_owned {
                continue;
            }

            let title = row
                .get("title")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string();

            if let Some(existing) = scored.iter_mut().find(|r| r.release_id == release_id) {
                existing.score += collected_count;
            } else {
                scored.push(RecommendedRelease {
                    release_id,
                    title,
                    score: *collected_count,
                });
            }
        }
    }

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(limit);
    Ok(scored)
}
