//! Graph Sink: consumes the four catalog topics and applies each record's
//! MERGE statements to the embedded graph store (spec §4.B).

use std::sync::Arc;

use discogsography_core::error::{AppError, Result};
use discogsography_core::models::EntityKind;
use discogsography_db::GraphStore;
use discogsography_ingest::{bus::Bus, merge, sink, BusConfig, IngestConfig};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SINK_NAME: &str = "graph";

struct GraphSinkStore {
    graph: GraphStore,
}

#[async_trait::async_trait]
impl sink::SinkStore for GraphSinkStore {
    async fn existing_hash(&self, kind: EntityKind, discogs_id: i64) -> Result<Option<String>> {
        let label = kind.graph_label();
        let rows = self
            .graph
            .query(format!(
                "MATCH (n:{label} {{id: '{discogs_id}'}}) RETURN n.hash AS hash"
            ))
            .await?;

        Ok(rows
            .first()
            .and_then(|row| row.get("hash"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn write(&self, kind: EntityKind, discogs_id: i64, hash: &str, payload: &Value) -> Result<()> {
        for statement in merge::build_merge_statements(kind, discogs_id, payload) {
            self.graph.execute(statement).await?;
        }

        let label = kind.graph_label();
        self.graph
            .execute(format!(
                "MATCH (n:{label} {{id: '{discogs_id}'}}) SET n.hash = '{hash}'"
            ))
            .await
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "discogsography_ingest=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = IngestConfig::from_env()?;

    let (graph, graph_handle) = GraphStore::open(&config.graph_path)?;
    let shutdown_graph = graph.clone();
    let store = Arc::new(GraphSinkStore { graph });

    let bus = Arc::new(
        Bus::connect(&BusConfig {
            amqp_url: config.amqp_url.clone(),
            prefetch: config.prefetch,
        })
        .await?,
    );

    tracing::info!("graph sink starting, consuming {} catalog types", EntityKind::ALL.len());

    let mut tasks = Vec::new();
    for kind in EntityKind::ALL {
        let bus = Arc::clone(&bus);
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            let mut counters = sink::SinkCounters::default();
            loop {
                match sink::run(&bus, SINK_NAME, kind, store.as_ref(), &mut counters).await {
                    Ok(()) => break,
                    Err(AppError::BusTransient(reason)) => {
                        tracing::warn!(kind = %kind, reason, "consumer loop ended, retrying shortly");
                        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                    }
                    Err(err) => {
                        tracing::error!(kind = %kind, error = %err, "consumer loop failed fatally");
                        break;
                    }
                }
            }
            tracing::info!(kind = %kind, ?counters, "consumer loop stopped");
        }));
    }

    let shutdown = shutdown_signal();
    tokio::select! {
        _ = futures::future::join_all(tasks) => {}
        _ = shutdown => {
            tracing::info!("shutdown signal received, draining consumers");
        }
    }

    shutdown_graph.shutdown().await;
    drop(graph_handle);

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
