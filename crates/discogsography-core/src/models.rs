//! Catalog and account data model shared by the ingest, sync, and API crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The four catalog types carried on the message bus and stored under their
/// own label in the graph and their own table in the relational store.
///
/// Mirrors the `{type}` segment of a bus routing key (`artist.<run_id>`,
/// `release.changes`, ...). Dispatch on this tag rather than on the raw
/// string so a typo in a routing key is a compile error, not a silently
/// dropped message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Artist,
    Label,
    Master,
    Release,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Artist,
        EntityKind::Label,
        EntityKind::Master,
        EntityKind::Release,
    ];

    /// The routing-key / queue-name segment for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Artist => "artist",
            EntityKind::Label => "label",
            EntityKind::Master => "master",
            EntityKind::Release => "release",
        }
    }

    /// Node label this kind maps to in the graph store.
    pub fn graph_label(&self) -> &'static str {
        match self {
            EntityKind::Artist => "Artist",
            EntityKind::Label => "Label",
            EntityKind::Master => "Master",
            EntityKind::Release => "Release",
        }
    }

    /// Relational table this kind's JSON documents land in.
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Artist => "artists",
            EntityKind::Label => "labels",
            EntityKind::Master => "masters",
            EntityKind::Release => "releases",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<EntityKind> {
        match s.to_ascii_lowercase().as_str() {
            "artist" => Some(EntityKind::Artist),
            "label" => Some(EntityKind::Label),
            "master" => Some(EntityKind::Master),
            "release" => Some(EntityKind::Release),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four node kinds the Read API can query by name: note this differs
/// from [`EntityKind`] by including `Genre`/`Style`, which are name-only
/// graph nodes with no bus topic or table of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Artist,
    Genre,
    Label,
    Style,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Artist => "artist",
            QueryKind::Genre => "genre",
            QueryKind::Label => "label",
            QueryKind::Style => "style",
        }
    }

    pub fn graph_label(&self) -> &'static str {
        match self {
            QueryKind::Artist => "Artist",
            QueryKind::Genre => "Genre",
            QueryKind::Label => "Label",
            QueryKind::Style => "Style",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<QueryKind> {
        match s.to_ascii_lowercase().as_str() {
            "artist" => Some(QueryKind::Artist),
            "genre" => Some(QueryKind::Genre),
            "label" => Some(QueryKind::Label),
            "style" => Some(QueryKind::Style),
            _ => None,
        }
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw catalog record as consumed off the bus, prior to hash-compare and write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogMessage {
    pub kind: EntityKind,
    pub discogs_id: i64,
    pub processing_run_id: String,
    pub payload: serde_json::Value,
}

/// Change hook published after a non-skip sink write (`{type}.changes`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeMessage {
    pub data_type: EntityKind,
    pub record_id: String,
    pub change_type: ChangeType,
    pub processing_run_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Directed edge kinds between catalog nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    By,
    On,
    VersionOf,
    Is,
    MemberOf,
    AliasOf,
    SublabelOf,
    Collected,
    Wants,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::By => "BY",
            EdgeKind::On => "ON",
            EdgeKind::VersionOf => "VERSION_OF",
            EdgeKind::Is => "IS",
            EdgeKind::MemberOf => "MEMBER_OF",
            EdgeKind::AliasOf => "ALIAS_OF",
            EdgeKind::SublabelOf => "SUBLABEL_OF",
            EdgeKind::Collected => "COLLECTED",
            EdgeKind::Wants => "WANTS",
        }
    }
}

/// Graph node projection returned by node/expand/explore endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: QueryKind,
    pub discogs_id: i64,
    pub title: String,
    pub data: serde_json::Value,
}

/// One synthetic category child offered by the explore endpoint, e.g.
/// "releases" under an artist, with its count.
#[derive(Debug, Clone, Serialize)]
pub struct ExploreCategory {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExploreResult {
    pub center: GraphNode,
    pub categories: Vec<ExploreCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpandResult {
    pub children: Vec<GraphNode>,
    pub total: i64,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub year: i32,
    pub release_count: i64,
}

/// An application user able to authenticate against the Read API and link a
/// Discogs account for personal sync. Authoritative in the relational store;
/// a shadow `User{id}` graph node exists only to anchor COLLECTED/WANTS edges.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Encrypted OAuth 1.0a access credentials for a user's linked Discogs account.
/// One row per `(user_id, "discogs")`; secrets are AES-GCM-encrypted under an
/// at-rest key distinct from any request-signing key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OAuthToken {
    pub user_id: Uuid,
    pub provider: String,
    pub access_token_encrypted: Vec<u8>,
    pub access_secret_encrypted: Vec<u8>,
    pub nonce: Vec<u8>,
    pub provider_username: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum SyncType {
    Full,
    Collection,
    Wantlist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum SyncStatus {
    Running,
    Completed,
    Failed,
}

/// Append-only record of one sync attempt for a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sync_type: SyncType,
    pub status: SyncStatus,
    pub items_synced: i32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct SyncHistoryResponse {
    pub id: Uuid,
    pub sync_type: SyncType,
    pub status: SyncStatus,
    pub items_synced: i32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<SyncHistory> for SyncHistoryResponse {
    fn from(h: SyncHistory) -> Self {
        SyncHistoryResponse {
            id: h.id,
            sync_type: h.sync_type,
            status: h.status,
            items_synced: h.items_synced,
            error_message: h.error_message,
            started_at: h.started_at,
            completed_at: h.completed_at,
        }
    }
}

/// One row per `(user_id, release_id, instance_id)` — `instance_id` is the
/// Discogs-assigned per-copy identifier, so a user may own several copies of
/// the same release.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CollectionItem {
    pub user_id: Uuid,
    pub release_id: i64,
    pub instance_id: i64,
    pub folder: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub formats: serde_json::Value,
    pub label: Option<String>,
    pub rating: Option<i32>,
    pub date_added: DateTime<Utc>,
    pub metadata: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// One row per `(user_id, release_id)` — at most one, unlike collection
/// items, since a release is either wanted or not.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WantlistItem {
    pub user_id: Uuid,
    pub release_id: i64,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub format: Option<String>,
    pub rating: Option<i32>,
    pub notes: Option<String>,
    pub date_added: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    pub q: String,
    #[serde(rename = "type")]
    pub kind: QueryKind,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutocompleteSuggestion {
    pub id: String,
    pub kind: QueryKind,
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendedRelease {
    pub release_id: i64,
    pub title: String,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub total_releases: i64,
    pub total_artists: i64,
    pub total_labels: i64,
    pub genres: Vec<(String, i64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseStatus {
    pub in_collection: bool,
    pub in_wantlist: bool,
}
