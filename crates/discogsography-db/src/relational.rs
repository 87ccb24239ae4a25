//! Table store driver: a bounded `sqlx` connection pool with a background
//! health-check sweep and retry-on-transient-failure for callers.

use std::time::Duration;

use discogsography_core::error::{AppError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::recovery::{retry_with_backoff, RetryConfig};

#[derive(Debug, Clone)]
pub struct RelationalStoreConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub health_check_interval: Duration,
}

impl Default for RelationalStoreConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            acquire_timeout: Duration::from_secs(30),
            health_check_interval: Duration::from_secs(30),
        }
    }
}

/// Owns the Postgres pool and a background task that periodically issues
/// `SELECT 1` so connection loss is detected before a request needs it.
pub struct RelationalStore {
    pool: PgPool,
    health_task: Option<JoinHandle<()>>,
}

impl RelationalStore {
    pub async fn connect(database_url: &str, config: RelationalStoreConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(database_url)
            .await?;

        let health_pool = pool.clone();
        let interval = config.health_check_interval;
        let health_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(err) = sqlx::query("SELECT 1").execute(&health_pool).await {
                    warn!(error = %err, "relational store health check failed");
                }
            }
        });

        Ok(Self {
            pool,
            health_task: Some(health_task),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Run `SELECT 1` with retry-with-backoff, used by the HTTP health endpoint.
    pub async fn health_check(&self) -> Result<()> {
        let pool = self.pool.clone();
        retry_with_backoff(
            || {
                let pool = pool.clone();
                async move {
                    sqlx::query("SELECT 1")
                        .execute(&pool)
                        .await
                        .map_err(AppError::from)?;
                    Ok(())
                }
            },
            RetryConfig::default(),
            "relational_health_check",
        )
        .await
    }
}

impl Drop for RelationalStore {
    fn drop(&mut self) {
        if let Some(task) = self.health_task.take() {
            task.abort();
        }
        info!("relational store health sweep stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_bounds() {
        let config = RelationalStoreConfig::default();
        assert!(config.max_connections > 0);
        assert!(config.acquire_timeout.as_secs() > 0);
    }
}
