//! One-shot schema bootstrap: creates the graph store's node/relationship
//! tables, uniqueness constraints, and full-text indexes (spec §6), then
//! runs the relational store's migrations. Idempotent — every statement
//! either uses `IF NOT EXISTS` or is itself a no-op on a second run.

mod config;

use config::SchemaConfig;
use discogsography_db::relational::RelationalStoreConfig;
use discogsography_db::{GraphStore, RelationalStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const NODE_TABLES: &[&str] = &[
    "CREATE NODE TABLE IF NOT EXISTS Artist(id STRING, name STRING, profile STRING, real_name STRING, namevariations STRING[], hash STRING, PRIMARY KEY(id))",
    "CREATE NODE TABLE IF NOT EXISTS Label(id STRING, name STRING, profile STRING, contact_info STRING, hash STRING, PRIMARY KEY(id))",
    "CREATE NODE TABLE IF NOT EXISTS Master(id STRING, title STRING, year INT64, hash STRING, PRIMARY KEY(id))",
    "CREATE NODE TABLE IF NOT EXISTS Release(id STRING, title STRING, year INT64, country STRING, format STRING, hash STRING, PRIMARY KEY(id))",
    "CREATE NODE TABLE IF NOT EXISTS Genre(name STRING, PRIMARY KEY(name))",
    "CREATE NODE TABLE IF NOT EXISTS Style(name STRING, PRIMARY KEY(name))",
    "CREATE NODE TABLE IF NOT EXISTS User(id STRING, PRIMARY KEY(id))",
];

const REL_TABLES: &[&str] = &[
    "CREATE REL TABLE IF NOT EXISTS BY(FROM Release TO Artist, FROM Master TO Artist)",
    "CREATE REL TABLE IF NOT EXISTS ON(FROM Release TO Label)",
    "CREATE REL TABLE IF NOT EXISTS VERSION_OF(FROM Release TO Master)",
    "CREATE REL TABLE IF NOT EXISTS IS(FROM Artist TO Genre, FROM Artist TO Style, FROM Release TO Genre, FROM Release TO Style, FROM Master TO Genre, FROM Master TO Style)",
    "CREATE REL TABLE IF NOT EXISTS MEMBER_OF(FROM Artist TO Artist)",
    "CREATE REL TABLE IF NOT EXISTS ALIAS_OF(FROM Artist TO Artist)",
    "CREATE REL TABLE IF NOT EXISTS SUBLABEL_OF(FROM Label TO Label)",
    "CREATE REL TABLE IF NOT EXISTS COLLECTED(FROM User TO Release, instance_id INT64, rating INT64, folder_id STRING, date_added TIMESTAMP, synced_at TIMESTAMP)",
    "CREATE REL TABLE IF NOT EXISTS WANTS(FROM User TO Release, rating INT64, date_added TIMESTAMP, synced_at TIMESTAMP)",
];

/// kuzu's full-text-search extension; indexes named per spec.md §6.
const FULLTEXT_INDEXES: &[&str] = &[
    "CALL CREATE_FTS_INDEX('Artist', 'artist_name_fulltext', ['name'])",
    "CALL CREATE_FTS_INDEX('Release', 'release_title_fulltext', ['title'])",
    "CALL CREATE_FTS_INDEX('Label', 'label_name_fulltext', ['name'])",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "discogsography_schema=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SchemaConfig::from_env()?;

    tracing::info!("ensuring relational schema");
    let relational = RelationalStore::connect(&config.database_url, RelationalStoreConfig::default()).await?;
    relational.run_migrations().await?;

    tracing::info!("ensuring graph schema");
    let (graph, graph_handle) = GraphStore::open(&config.graph_path)?;

    for statement in NODE_TABLES.iter().chain(REL_TABLES).chain(FULLTEXT_INDEXES) {
        if let Err(err) = graph.execute(*statement).await {
            tracing::warn!(statement, error = %err, "schema statement failed, assuming already applied");
        }
    }

    graph.shutdown().await;
    drop(graph_handle);

    tracing::info!("schema initialization complete");
    Ok(())
}
