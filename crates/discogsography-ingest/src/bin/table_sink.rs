//! Table Sink: consumes the four catalog topics and upserts each record's
//! raw JSON document into its relational table (spec §4.C).

use std::sync::Arc;

use discogsography_core::error::{AppError, Result};
use discogsography_core::models::EntityKind;
use discogsography_db::relational::RelationalStoreConfig;
use discogsography_db::RelationalStore;
use discogsography_ingest::{bus::Bus, merge, sink, BusConfig, IngestConfig};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SINK_NAME: &str = "table";

struct TableSinkStore {
    store: RelationalStore,
}

#[async_trait::async_trait]
impl sink::SinkStore for TableSinkStore {
    async fn existing_hash(&self, kind: EntityKind, discogs_id: i64) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(&merge::table_select_hash_sql(kind))
            .bind(discogs_id.to_string())
            .fetch_optional(self.store.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.map(|(hash,)| hash))
    }

    async fn write(&self, kind: EntityKind, discogs_id: i64, hash: &str, payload: &Value) -> Result<()> {
        sqlx::query(&merge::table_upsert_sql(kind))
            .bind(discogs_id.to_string())
            .bind(payload)
            .bind(hash)
            .execute(self.store.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "discogsography_ingest=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = IngestConfig::from_env()?;

    let relational = RelationalStore::connect(&config.database_url, RelationalStoreConfig::default()).await?;
    relational.run_migrations().await?;
    let store = Arc::new(TableSinkStore { store: relational });

    let bus = Arc::new(
        Bus::connect(&BusConfig {
            amqp_url: config.amqp_url.clone(),
            prefetch: config.prefetch,
        })
        .await?,
    );

    tracing::info!("table sink starting, consuming {} catalog types", EntityKind::ALL.len());

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
