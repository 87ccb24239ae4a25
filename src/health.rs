//! Health/readiness/liveness checks, grounded in the teacher's `HealthChecker`
//! shape but calling straight into `discogsography_db`'s store wrappers
//! (which already carry their own retry/circuit-breaker policy) instead of a
//! parallel recovery layer.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use discogsography_db::{GraphStore, RelationalStore};
use serde::{Deserialize, Serialize};
use sysinfo::System;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: HealthStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub correlation_id: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub services: HashMap<String, ServiceHealthInfo>,
    pub system_info: SystemInfo,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceHealthInfo {
    pub status: HealthStatus,
    pub response_time_ms: u64,
    pub last_check: chrono::DateTime<chrono::Utc>,
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemInfo {
    pub memory_usage_mb: u64,
    pub cpu_usage_percent: f32,
}

#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    pub include_system_info: bool,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            include_system_info: true,
        }
    }
}

pub struct HealthChecker {
    config: HealthCheckConfig,
    start_time: Instant,
}

impl HealthChecker {
    pub fn new(config: HealthCheckConfig) -> Self {
        Self {
            config,
            start_time: Instant::now(),
        }
    }

    pub async fn check_health(
        &self,
        relational: &RelationalStore,
        graph: &GraphStore,
        redis_pool: &deadpool_redis::Pool,
    ) -> HealthCheckResponse {
        let correlation_id = Uuid::new_v4().to_string();
        let mut services = HashMap::new();

        services.insert(
            "relational".to_string(),
            Self::check_one("relational store", || relational.health_check()).await,
        );
        services.insert(
            "graph".to_string(),
            Self::check_one("graph store", || graph.health_check()).await,
        );
        services.insert("redis".to_string(), self.check_redis_health(redis_pool).await);

        let overall_status = Self::determine_overall_status(&services);

        let system_info = if self.config.include_system_info {
            Self::get_system_info()
        } else {
            SystemInfo {
                memory_usage_mb: 0,
                cpu_usage_percent: 0.0,
            }
        };

        HealthCheckResponse {
            status: overall_status,
            timestamp: chrono::Utc::now(),
            correlation_id,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            services,
            system_info,
        }
    }

    async fn check_one<F, Fut>(_name: &str, check: F) -> ServiceHealthInfo
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = discogsography_core::error::Result<()>>,
    {
        let start = Instant::now();
        let last_check = chrono::Utc::now();
        match check().await {
            Ok(()) => ServiceHealthInfo {
                status: HealthStatus::Healthy,
                response_time_ms: start.elapsed().as_millis() as u64,
                last_check,
                error_message: None,
            },
            Err(err) => {
                tracing::error!(error = %err, "health check failed");
                ServiceHealthInfo {
                    status: HealthStatus::Unhealthy,
                    response_time_ms: start.elapsed().as_millis() as u64,
                    last_check,
                    error_message: Some(err.to_string()),
                }
            }
        }
    }

    async fn check_redis_health(&self, redis_pool: &deadpool_redis::Pool) -> ServiceHealthInfo {
        let start = Instant::now();
        let last_check = chrono::Utc::now();

        let result = tokio::time::timeout(Duration::from_secs(5), async {
            let mut conn = redis_pool
                .get()
                .await
                .map_err(|e| discogsography_core::error::AppError::RedisOperationFailed(e.to_string()))?;
            deadpool_redis::redis::cmd("PING")
                .query_async::<_, String>(&mut conn)
                .await
                .map_err(discogsography_core::error::AppError::from)
        })
        .await;

        match result {
            Ok(Ok(_)) => ServiceHealthInfo {
                status: HealthStatus::Healthy,
                response_time_ms: start.elapsed().as_millis() as u64,
                last_check,
                error_message: None,
            },
            Ok(Err(err)) => ServiceHealthInfo {
                status: HealthStatus::Unhealthy,
                response_time_ms: start.elapsed().as_millis() as u64,
                last_check,
                error_message: Some(err.to_string()),
            },
            Err(_) => ServiceHealthInfo {
                status: HealthStatus::Unhealthy,
                response_time_ms: start.elapsed().as_millis() as u64,
                last_check,
                error_message: Some("redis ping timed out".to_string()),
            },
        }
    }

    fn determine_overall_status(services: &HashMap<String, ServiceHealthInfo>) -> HealthStatus {
        let unhealthy = services.values().any(|s| s.status == HealthStatus::Unhealthy);
        if unhealthy {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Healthy
        }
    }

    fn get_system_info() -> SystemInfo {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let cpu_usage_percent = if sys.cpus().is_empty() {
            0.0
        } else {
            sys.cpus().iter().map(|c| c.cpu_usage()).sum::<f32>() / sys.cpus().len() as f32
        };

        SystemInfo {
            memory_usage_mb: sys.used_memory() / 1024 / 1024,
            cpu_usage_percent,
        }
    }
}

/// Liveness: only fails if the process itself cannot respond.
pub async fn liveness_check() -> discogsography_core::error::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_status_is_unhealthy_if_any_service_is() {
        let mut services = HashMap::new();
        services.insert(
            "redis".to_string(),
            ServiceHealthInfo {
                status: HealthStatus::Healthy,
                response_time_ms: 1,
                last_check: chrono::Utc::now(),
                error_message: None,
            },
        );
        services.insert(
            "relational".to_string(),
            ServiceHealthInfo {
                status: HealthStatus::Unhealthy,
                response_time_ms: 1,
                last_check: chrono::Utc::now(),
                error_message: Some("down".into()),
            },
        );
        assert_eq!(
            HealthChecker::determine_overall_status(&services),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn overall_status_is_healthy_when_all_services_are() {
        let mut services = HashMap::new();
        services.insert(
            "redis".to_string(),
            ServiceHealthInfo {
                status: HealthStatus::Healthy,
                response_time_ms: 1,
                last_check: chrono::Utc::now(),
                error_message: None,
            },
        );
        assert_eq!(
            HealthChecker::determine_overall_status(&services),
            HealthStatus::Healthy
        );
    }
}
