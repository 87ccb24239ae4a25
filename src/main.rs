//! Binary entrypoint: load config, open the stores, build `AppState`, serve.

use std::sync::Arc;
use std::time::Instant;

use discogsography_api::{
    config::AppConfig,
    create_router,
    health::{HealthCheckConfig, HealthChecker},
    metrics::MetricsCollector,
    middleware::cors::validate_cors_config,
    services::{AutocompleteCache, CacheInvalidationRateLimiter},
    AppState,
};
use discogsography_db::{relational::RelationalStoreConfig, GraphStore, RelationalStore};
use discogsography_sync::{crypto::TokenCipher, SyncTrigger};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "discogsography_api=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    validate_cors_config(&config).map_err(anyhow::Error::msg)?;

    let (graph, graph_handle) = GraphStore::open(&config.graph.path)?;
    // The background thread owning the kuzu connection outlives this
    // handle; leaking it here is deliberate — it runs for the process
    // lifetime and is torn down by process exit, not by AppState drop.
    std::mem::forget(graph_handle);

    let relational = Arc::new(
        RelationalStore::connect(
            &config.database.url,
            RelationalStoreConfig {
                max_connections: config.database.max_connections,
                ..Default::default()
            },
        )
        .await?,
    );
    relational.run_migrations().await?;

    let redis_pool = deadpool_redis::Config::from_url(&config.redis.url)
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))?;

    let cipher = TokenCipher::new(&config.sync.token_encryption_key)?;
    let sync_trigger = Arc::new(SyncTrigger::new(
        relational.pool().clone(),
        graph.clone(),
        redis_pool.clone(),
        cipher,
        config.sync.discogs_user_agent.clone(),
        config.sync.cooldown_seconds,
    ));

    let metrics = Arc::new(MetricsCollector::new()?);
    let health_checker = Arc::new(HealthChecker::new(HealthCheckConfig::default()));
    let autocomplete_cache = Arc::new(AutocompleteCache::new(config.cache.autocomplete_capacity));
    let cache_invalidation_limiter = Arc::new(CacheInvalidationRateLimiter::new());

    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        relational,
        graph,
        redis_pool,
        config: Arc::new(config),
        autocomplete_cache,
        sync_trigger,
        metrics,
        health_checker,
        cache_invalidation_limiter,
        start_time: Instant::now(),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %bind_address, "discogsography-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    Ok(())
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    tracing::info!("shutdown signal received");
}
