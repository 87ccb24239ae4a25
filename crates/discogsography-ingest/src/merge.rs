//! Per-type MERGE graph policy (spec §4.B) and table upsert SQL (spec §4.C).

use discogsography_core::models::EntityKind;
use serde_json::Value;

/// Escape a string for embedding in a Cypher string literal. kuzu's Rust
/// binding builds queries as plain strings, so untrusted content must never
/// reach this function un-escaped from any boundary other than our own
/// catalog payload.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn opt_str(payload: &Value, field: &str) -> Option<String> {
    payload.get(field).and_then(Value::as_str).map(str::to_string)
}

fn str_array(payload: &Value, field: &str) -> Vec<String> {
    payload
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Build the sequence of Cypher statements that applies one catalog
/// message's descriptive properties and edges to the graph, per the
/// per-type MERGE policy. Each statement MERGEs by natural key, so
/// out-of-order arrival across types is safe (spec §4.B "Ordering").
pub fn build_merge_statements(kind: EntityKind, discogs_id: i64, payload: &Value) -> Vec<String> {
    match kind {
        EntityKind::Artist => build_artist(discogs_id, payload),
        EntityKind::Label => build_label(discogs_id, payload),
        EntityKind::Master => build_master(discogs_id, payload),
        EntityKind::Release => build_release(discogs_id, payload),
    }
}

fn build_artist(id: i64, payload: &Value) -> Vec<String> {
    let mut statements = Vec::new();
    let name = opt_str(payload, "name").unwrap_or_default();
    let profile = opt_str(payload, "profile").unwrap_or_default();
    let real_name = opt_str(payload, "realname").unwrap_or_default();
    let namevariations = str_array(payload, "namevariations");

    statements.push(format!(
        "MERGE (a:Artist {{id: '{id}'}}) \
         SET a.name = '{}', a.profile = '{}', a.real_name = '{}', a.namevariations = {}",
        escape(&name),
        escape(&profile),
        escape(&real_name),
        string_list_literal(&namevariations),
    ));

    if let Some(aliases) = payload.get("aliases").and_then(Value::as_array) {
        for alias in aliases {
            if let Some(alias_id) = alias.get("id").and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))) {
                statements.push(format!(
                    "MERGE (a:Artist {{id: '{id}'}}) MERGE (b:Artist {{id: '{alias_id}'}}) \
                     MERGE (a)-[:ALIAS_OF]->(b) MERGE (b)-[:ALIAS_OF]->(a)"
                ));
            }
        }
    }

    if let Some(groups) = payload.get("groups").and_then(Value::as_array) {
        for group in groups {
            if let Some(group_id) = group.get("id").and_then(|v| v.as_i64()) {
                statements.push(format!(
                    "MERGE (a:Artist {{id: '{id}'}}) MERGE (g:Artist {{id: '{group_id}'}}) \
                     MERGE (a)-[:MEMBER_OF]->(g)"
                ));
            }
        }
    }

    for genre in str_array(payload, "genres") {
        statements.push(is_edge_statement("Artist", id, "Genre", &genre));
    }
    for style in str_array(payload, "styles") {
        statements.push(is_edge_statement("Artist", id, "Style", &style));
    }

    statements
}

fn build_label(id: i64, payload: &Value) -> Vec<String> {
    let mut statements = Vec::new();
    let name = opt_str(payload, "name").unwrap_or_default();
    let profile = opt_str(payload, "profile").unwrap_or_default();
    let contact_info = opt_str(payload, "contact_info").unwrap_or_default();

    statements.push(format!(
        "MERGE (l:Label {{id: '{id}'}}) SET l.name = '{}', l.profile = '{}', l.contact_info = '{}'",
        escape(&name),
        escape(&profile),
        escape(&contact_info),
    ));

    if let Some(parent_id) = payload
        .get("parentLabel")
        .and_then(|v| v.get("id"))
        .and_then(Value::as_i64)
    {
        statements.push(format!(
            "MERGE (l:Label {{id: '{id}'}}) MERGE (p:Label {{id: '{parent_id}'}}) \
             MERGE (l)-[:SUBLABEL_OF]->(p)"
        ));
    }

    if let Some(sublabels) = payload.get("sublabels").and_then(Value::as_array) {
        for sublabel in sublabels {
            if let Some(sub_id) = sublabel.get("id").and_then(Value::as_i64) {
                statements.push(format!(
                    "MERGE (l:Label {{id: '{id}'}}) MERGE (s:Label {{id: '{sub_id}'}}) \
                     MERGE (s)-[:SUBLABEL_OF]->(l)"
                ));
            }
        }
    }

    statements
}

fn build_master(id: i64, payload: &Value) -> Vec<String> {
    let mut statements = Vec::new();
    let title = opt_str(payload, "title").unwrap_or_default();
    let year = payload.get("year").and_then(Value::as_i64).unwrap_or(0);

    statements.push(format!(
        "MERGE (m:Master {{id: '{id}'}}) SET m.title = '{}', m.year = {year}",
        escape(&title),
    ));

    if let Some(artists) = payload.get("artists").and_then(Value::as_array) {
        for artist in artists {
            if let Some(artist_id) = artist.get("id").and_then(Value::as_i64) {
                statements.push(format!(
                    "MERGE (m:Master {{id: '{id}'}}) MERGE (a:Artist {{id: '{artist_id}'}}) \
                     MERGE (m)-[:BY]->(a)"
                ));
            }
        }
    }

    for genre in str_array(payload, "genres") {
        statements.push(is_edge_statement("Master", id, "Genre", &genre));
    }
    for style in str_array(payload, "styles") {
        statements.push(is_edge_statement("Master", id, "Style", &style));
    }

    statements
}

fn build_release(id: i64, payload: &Value) -> Vec<String> {
    let mut statements = Vec::new();
    let title = opt_str(payload, "title").unwrap_or_default();
    let year = payload.get("year").and_then(Value::as_i64).unwrap_or(0);
    let country = opt_str(payload, "country").unwrap_or_default();
    let format = payload
        .get("formats")
        .and_then(Value::as_array)
        .and_then(|formats| formats.first())
        .and_then(|f| f.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    statements.push(format!(
        "MERGE (r:Release {{id: '{id}'}}) \
         SET r.title = '{}', r.year = {year}, r.country = '{}', r.format = '{}'",
        escape(&title),
        escape(&country),
        escape(format),
    ));

    if let Some(artists) = payload.get("artists").and_then(Value::as_array) {
        for artist in artists {
            if let Some(artist_id) = artist.get("id").and_then(Value::as_i64) {
                statements.push(format!(
                    "MERGE (r:Release {{id: '{id}'}}) MERGE (a:Artist {{id: '{artist_id}'}}) \
                     MERGE (r)-[:BY]->(a)"
                ));
            }
        }
    }

    if let Some(labels) = payload.get("labels").and_then(Value::as_array) {
        for label in labels {
            if let Some(label_id) = label.get("id").and_then(Value::as_i64) {
                statements.push(format!(
                    "MERGE (r:Release {{id: '{id}'}}) MERGE (l:Label {{id: '{label_id}'}}) \
                     MERGE (r)-[:ON]->(l)"
                ));
            }
        }
    }

    if let Some(master_id) = payload.get("master_id").and_then(Value::as_i64) {
        statements.push(format!(
            "MERGE (r:Release {{id: '{id}'}}) MERGE (m:Master {{id: '{master_id}'}}) \
             MERGE (r)-[:VERSION_OF]->(m)"
        ));
    }

    for genre in str_array(payload, "genres") {
        statements.push(is_edge_statement("Release", id, "Genre", &genre));
    }
    for style in str_array(payload, "styles") {
        statements.push(is_edge_statement("Release", id, "Style", &style));
    }

    statements
}

fn is_edge_statement(from_label: &str, from_id: i64, to_label: &str, name: &str) -> String {
    let escaped_name = escape(name);
    format!(
        "MERGE (n:{from_label} {{id: '{from_id}'}}) MERGE (t:{to_label} {{name: '{escaped_name}'}}) \
         MERGE (n)-[:IS]->(t)"
    )
}

fn string_list_literal(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| format!("'{}'", escape(s))).collect();
    format!("[{}]", quoted.join(", "))
}

/// Upsert SQL for the Table Sink's per-type document table.
pub fn table_upsert_sql(kind: EntityKind) -> String {
    format!(
        "INSERT INTO {table} (id, data, hash) VALUES ($1, $2, $3) \
         ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, hash = EXCLUDED.hash",
        table = kind.table_name(),
    )
}

pub fn table_select_hash_sql(kind: EntityKind) -> String {
    format!("SELECT hash FROM {} WHERE id = $1", kind.table_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn artist_merge_sets_descriptive_properties() {
        let payload = json!({"name": "Radiohead", "profile": "English band", "genres": ["Rock"]});
        let statements = build_merge_statements(EntityKind::Artist, 123, &payload);
        assert!(statements[0].contains("MERGE (a:Artist {id: '123'})"));
        assert!(statements[0].contains("Radiohead"));
        assert!(statements.iter().any(|s| s.contains("Genre {name: 'Rock'}")));
    }

    #[test]
    fn escapes_quotes_in_names() {
        let payload = json!({"name": "O'Brien"});
        let statements = build_merge_statements(EntityKind::Artist, 1, &payload);
        assert!(statements[0].contains("O\\'Brien"));
    }

    #[test]
    fn release_links_master_when_present() {
        let payload = json!({"title": "OK Computer", "master_id": 999});
        let statements = build_merge_statements(EntityKind::Release, 1, &payload);
        assert!(statements.iter().any(|s| s.contains("VERSION_OF")));
    }

    #[test]
    fn table_upsert_sql_targets_correct_table() {
        assert!(table_upsert_sql(EntityKind::Artist).contains("INTO artists"));
        assert!(table_upsert_sql(EntityKind::Release).contains("INTO releases"));
    }
}
