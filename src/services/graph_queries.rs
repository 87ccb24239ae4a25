//! Cypher query construction for the explore/expand/node/trends endpoint
//! families. `GraphStore::query` takes a plain string (no bind parameters),
//! so every value interpolated here goes through [`escape`] first.

use discogsography_core::error::{AppError, Result};
use discogsography_core::models::{AutocompleteSuggestion, ExploreCategory, GraphNode, QueryKind, TrendPoint};
use discogsography_db::GraphStore;
use serde_json::Value;

/// Escape a value for interpolation into a single-quoted Cypher string
/// literal. There is no parameterized-query support in the driver, so this
/// is the only thing standing between a search term and a syntax break.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn row_str(row: &Value, key: &str) -> String {
    row.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn row_i64(row: &Value, key: &str) -> i64 {
    row.get(key).and_then(Value::as_i64).unwrap_or_default()
}

fn node_from_row(row: &Value, kind: QueryKind, id_key: &str, title_key: &str) -> GraphNode {
    let id = row_str(row, id_key);
    let title = row_str(row, title_key);
    GraphNode {
        discogs_id: id.parse().unwrap_or(0),
        id,
        kind,
        title,
        data: row.clone(),
    }
}

/// Look up a node by name (Artist/Label) or by its name-as-primary-key
/// (Genre/Style).
pub async fn find_by_name(graph: &GraphStore, kind: QueryKind, name: &str) -> Result<Option<GraphNode>> {
    let label = kind.graph_label();
    let escaped = escape(name);

    let cypher = match kind {
        QueryKind::Artist => format!(
            "MATCH (n:{label}) WHERE n.name = '{escaped}' RETURN n.id AS id, n.name AS name, n.profile AS profile, n.real_name AS real_name LIMIT 1"
        ),
        QueryKind::Label => format!(
            "MATCH (n:{label}) WHERE n.name = '{escaped}' RETURN n.id AS id, n.name AS name, n.profile AS profile, n.contact_info AS contact_info LIMIT 1"
        ),
        QueryKind::Genre | QueryKind::Style => {
            format!("MATCH (n:{label}) WHERE n.name = '{escaped}' RETURN n.name AS name LIMIT 1")
        }
    };

    let rows = graph.query(cypher).await?;
    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let node = match kind {
        QueryKind::Artist | QueryKind::Label => node_from_row(row, kind, "id", "name"),
        QueryKind::Genre | QueryKind::Style => GraphNode {
            id: row_str(row, "name"),
            kind,
            discogs_id: 0,
            title: row_str(row, "name"),
            data: row.clone(),
        },
    };
    Ok(Some(node))
}

/// Look up a node by its own id (Artist/Label) or name-as-id (Genre/Style),
/// for the node-details endpoint.
pub async fn find_by_id(graph: &GraphStore, kind: QueryKind, node_id: &str) -> Result<Option<GraphNode>> {
    let label = kind.graph_label();
    let escaped = escape(node_id);

    let cypher = match kind {
        QueryKind::Artist => format!(
            "MATCH (n:{label}) WHERE n.id = '{escaped}' RETURN n.id AS id, n.name AS name, n.profile AS profile, n.real_name AS real_name, n.namevariations AS namevariations LIMIT 1"
        ),
        QueryKind::Label => format!(
            "MATCH (n:{label}) WHERE n.id = '{escaped}' RETURN n.id AS id, n.name AS name, n.profile AS profile, n.contact_info AS contact_info LIMIT 1"
        ),
        QueryKind::Genre | QueryKind::Style => {
            format!("MATCH (n:{label}) WHERE n.name = '{escaped}' RETURN n.name AS name LIMIT 1")
        }
    };

    let rows = graph.query(cypher).await?;
    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let node = match kind {
        QueryKind::Artist | QueryKind::Label => node_from_row(row, kind, "id", "name"),
        QueryKind::Genre | QueryKind::Style => GraphNode {
            id: row_str(row, "name"),
            kind,
            discogs_id: 0,
            title: row_str(row, "name"),
            data: row.clone(),
        },
    };
    Ok(Some(node))
}

/// The synthetic category names each node kind exposes via explore/expand.
/// Not every relationship the catalog carries is surfaced this way — these
/// are the ones judged useful as a browse surface.
pub fn categories_for(kind: QueryKind) -> &'static [&'static str] {
    match kind {
        QueryKind::Artist => &["releases", "labels", "aliases"],
        QueryKind::Genre => &["releases", "artists", "labels", "styles"],
        QueryKind::Label => &["releases", "artists", "sublabels"],
        QueryKind::Style => &["releases", "artists", "genres"],
    }
}

fn center_match(kind: QueryKind, center_id: &str) -> String {
    let label = kind.graph_label();
    let escaped = escape(center_id);
    match kind {
        QueryKind::Artist | QueryKind::Label => format!("MATCH (center:{label}) WHERE center.id = '{escaped}'"),
        QueryKind::Genre | QueryKind::Style => format!("MATCH (center:{label}) WHERE center.name = '{escaped}'"),
    }
}

/// Build the `MATCH` clause connecting `center` to the node kind backing
/// `category`, returning the pattern and the bound variable name.
fn category_pattern(kind: QueryKind, category: &str) -> Result<(&'static str, &'static str)> {
    let pattern = match (kind, category) {
        (QueryKind::Artist, "releases") => "(center)<-[:BY]-(child:Release)",
        (QueryKind::Artist, "labels") => "(center)<-[:BY]-(:Release)-[:ON]->(child:Label)",
        (QueryKind::Artist, "aliases") => "(center)<-[:ALIAS_OF*1..2]-(child:Artist)",
        (QueryKind::Genre, "releases") => "(center)<-[:IS]-(child:Release)",
        (QueryKind::Genre, "artists") => "(center)<-[:IS]-(child:Artist)",
        (QueryKind::Genre, "labels") => "(center)<-[:IS]-(:Release)-[:ON]->(child:Label)",
        (QueryKind::Genre, "styles") => "(center)<-[:IS]-(:Release)-[:IS]->(child:Style)",
        (QueryKind::Label, "releases") => "(center)<-[:ON]-(child:Release)",
        (QueryKind::Label, "artists") => "(center)<-[:ON]-(:Release)-[:BY]->(child:Artist)",
        (QueryKind::Label, "sublabels") => "(child:Label)-[:SUBLABEL_OF]->(center)",
        (QueryKind::Style, "releases") => "(center)<-[:IS]-(child:Release)",
        (QueryKind::Style, "artists") => "(center)<-[:IS]-(child:Artist)",
        (QueryKind::Style, "genres") => "(center)<-[:IS]-(:Release)-[:IS]->(child:Genre)",
        _ => {
            return Err(AppError::NotFound {
                resource: format!("category '{category}' for {kind}"),
            })
        }
    };

    let child_id_key = match category {
        "releases" | "labels" | "artists" | "aliases" | "sublabels" => "id",
        "styles" | "genres" => "name",
        _ => "id",
    };

    Ok((pattern, child_id_key))
}

fn child_title_key(category: &str) -> &'static str {
    match category {
        "releases" => "title",
        _ => "name",
    }
}

/// `count(child)` for a `type×category` pair, used by the explore envelope
/// and the expand endpoint's total.
pub async fn category_count(graph: &GraphStore, kind: QueryKind, center_id: &str, category: &str) -> Result<i64> {
    let (pattern, _) = category_pattern(kind, category)?;
    let cypher = format!("{} {pattern} RETURN count(DISTINCT child) AS total", center_match(kind, center_id));
    let rows = graph.query(cypher).await?;
    Ok(rows.first().map(|r| row_i64(r, "total")).unwrap_or(0))
}

/// The children of a `type×category` pair, paginated by offset/limit.
pub async fn category_children(
    graph: &GraphStore,
    kind: QueryKind,
    center_id: &str,
    category: &str,
    limit: usize,
    offset: usize,
) -> Result<Vec<GraphNode>> {
    let (pattern, id_key) = category_pattern(kind, category)?;
    let title_key = child_title_key(category);
    let child_label_for_kind = child_kind_for(kind, category);

    let select_fields = if id_key == "name" {
        format!("child.name AS {id_key}, child.name AS {title_key}")
    } else {
        format!("child.{id_key} AS {id_key}, child.{title_key} AS {title_key}")
    };

    let cypher = format!(
        "{} {pattern} RETURN DISTINCT {select_fields} SKIP {offset} LIMIT {limit}",
        center_match(kind, center_id)
    );

    let rows = graph.query(cypher).await?;
    Ok(rows
        .iter()
        .map(|row| node_from_row(row, child_label_for_kind, id_key, title_key))
        .collect())
}

fn child_kind_for(kind: QueryKind, category: &str) -> QueryKind {
    match (kind, category) {
        (_, "labels") | (_, "sublabels") => QueryKind::Label,
        (_, "artists") | (QueryKind::Artist, "aliases") => QueryKind::Artist,
        (_, "genres") => QueryKind::Genre,
        (_, "styles") => QueryKind::Style,
        _ => kind,
    }
}

/// Build the explore envelope: the center node plus one count per synthetic
/// category.
pub async fn explore(graph: &GraphStore, kind: QueryKind, name: &str) -> Result<Option<(GraphNode, Vec<ExploreCategory>)>> {
    let Some(center) = find_by_name(graph, kind, name).await? else {
        return Ok(None);
    };

    let mut categories = Vec::new();
    for category in categories_for(kind) {
        let count = category_count(graph, kind, &center.id, category).await?;
        categories.push(ExploreCategory {
            category: category.to_string(),
            count,
        });
    }

    Ok(Some((center, categories)))
}

/// Release-count-by-year time series for the node's releases.
pub async fn trends(graph: &GraphStore, kind: QueryKind, name: &str) -> Result<Option<Vec<TrendPoint>>> {
    let Some(center) = find_by_name(graph, kind, name).await? else {
        return Ok(None);
    };

    let release_pattern = match kind {
        QueryKind::Artist => "(center)<-[:BY]-(r:Release)",
        QueryKind::Label => "(center)<-[:ON]-(r:Release)",
        QueryKind::Genre | QueryKind::Style => "(center)<-[:IS]-(r:Release)",
    };

    let cypher = format!(
        "{} {release_pattern} WHERE r.year IS NOT NULL RETURN r.year AS year, count(r) AS release_count ORDER BY year",
        center_match(kind, &center.id)
    );

    let rows = graph.query(cypher).await?;
    let points = rows
        .iter()
        .map(|row| TrendPoint {
            year: row.get("year").and_then(Value::as_i64).unwrap_or_default() as i32,
            release_count: row_i64(row, "release_count"),
        })
        .collect();
    Ok(Some(points))
}

/// Resolve autocomplete suggestions. Artist/Label go through the graph
/// store's full-text index with the already Lucene-escaped `lucene_query`;
/// Genre/Style have no FTS index (small, flat vocabulary) so they fall back
/// to a case-insensitive substring match on the raw, unescaped term.
pub async fn autocomplete(
    graph: &GraphStore,
    kind: QueryKind,
    raw_q: &str,
    lucene_query: &str,
    limit: usize,
) -> Result<Vec<AutocompleteSuggestion>> {
    match kind {
        QueryKind::Artist => fts_autocomplete(graph, "Artist", "artist_name_fulltext", lucene_query, limit, kind).await,
        QueryKind::Label => fts_autocomplete(graph, "Label", "label_name_fulltext", lucene_query, limit, kind).await,
        QueryKind::Genre => prefix_autocomplete(graph, "Genre", raw_q, limit, kind).await,
        QueryKind::Style => prefix_autocomplete(graph, "Style", raw_q, limit, kind).await,
    }
}

async fn fts_autocomplete(
    graph: &GraphStore,
    label: &str,
    index: &str,
    lucene_query: &str,
    limit: usize,
    kind: QueryKind,
) -> Result<Vec<AutocompleteSuggestion>> {
    let escaped = escape(lucene_query);
    let cypher = format!(
        "CALL QUERY_FTS_INDEX('{label}', '{index}', '{escaped}') RETURN node.id AS id, node.name AS name, score ORDER BY score DESC LIMIT {limit}"
    );
    let rows = graph.query(cypher).await?;
    Ok(rows
        .iter()
        .map(|row| AutocompleteSuggestion {
            id: row_str(row, "id"),
            kind,
            name: row_str(row, "name"),
            score: row.get("score").and_then(Value::as_f64).unwrap_or(0.0),
        })
        .collect())
}

async fn prefix_autocomplete(
    graph: &GraphStore,
    label: &str,
    raw_q: &str,
    limit: usize,
    kind: QueryKind,
) -> Result<Vec<AutocompleteSuggestion>> {
    let escaped = escape(&raw_q.to_lowercase());
    let cypher =
        format!("MATCH (n:{label}) WHERE n.name CONTAINS '{escaped}' RETURN n.name AS name LIMIT {limit}");
    let rows = graph.query(cypher).await?;
    Ok(rows
        .iter()
        .map(|row| AutocompleteSuggestion {
            id: row_str(row, "name"),
            kind,
            name: row_str(row, "name"),
            score: 1.0,
        })
        .collect())
}

/// Genre breakdown across a user's collected releases, via the `COLLECTED`
/// edge the sync engine writes and the catalog's `Release -[:IS]-> Genre`
/// edge. Ordered most-common first.
pub async fn collection_genre_counts(graph: &GraphStore, user_id: &str) -> Result<Vec<(String, i64)>> {
    let escaped = escape(user_id);
    let cypher = format!(
        "MATCH (:User {{id: '{escaped}'}})-[:COLLECTED]->(:Release)-[:IS]->(g:Genre) \
         RETURN g.name AS name, count(*) AS count ORDER BY count DESC"
    );
    let rows = graph.query(cypher).await?;
    Ok(rows.iter().map(|row| (row_str(row, "name"), row_i64(row, "count"))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_single_quotes() {
        assert_eq!(escape("O'Brien"), "O\\'Brien");
    }

    #[test]
    fn artist_categories_match_spec_example() {
        assert_eq!(categories_for(QueryKind::Artist), &["releases", "labels", "aliases"]);
    }

    #[test]
    fn unknown_category_pattern_is_not_found() {
        let err = category_pattern(QueryKind::Artist, "bogus").unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
