//! Prometheus metrics collection, trimmed and re-pointed from the teacher's
//! `MetricsCollector` (DNP/auth/token-refresh business metrics dropped, sync
//! and autocomplete-cache metrics added) under a domain-specific namespace.

use axum::{
    body::Body,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use sysinfo::System;

const NAMESPACE: &str = "discogsography";

#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    http_requests_total: CounterVec,
    http_request_duration: HistogramVec,
    http_requests_in_flight: Gauge,
    http_request_latency: HistogramVec,

    db_connections_active: Gauge,
    db_connections_idle: Gauge,

    redis_connections_active: Gauge,
    redis_operations_total: CounterVec,

    autocomplete_cache_hits: Counter,
    autocomplete_cache_misses: Counter,
    autocomplete_cache_evictions: Counter,

    syncs_triggered_total: CounterVec,
    sync_completions_total: CounterVec,

    memory_usage_bytes: Gauge,
    cpu_usage_percent: Gauge,
    uptime_seconds: Gauge,
}

impl MetricsCollector {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Arc::new(Registry::new());

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests")
                .namespace(NAMESPACE)
                .subsystem("http"),
            &["method", "endpoint", "status_code"],
        )?;

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .namespace(NAMESPACE)
            .subsystem("http")
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "endpoint"],
        )?;

        let http_requests_in_flight = Gauge::new(
            format!("{NAMESPACE}_http_requests_in_flight"),
            "Number of HTTP requests currently being processed",
        )?;

        let http_request_latency = HistogramVec::new(
            HistogramOpts::new(
                "http_request_latency_seconds",
                "HTTP request latency in seconds for P50/P90/P99 calculations",
            )
            .namespace(NAMESPACE)
            .subsystem("http")
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
            &["method", "path", "status_code"],
        )?;

        let db_connections_active = Gauge::new(
            format!("{NAMESPACE}_db_connections_active"),
            "Number of active relational pool connections",
        )?;
        let db_connections_idle = Gauge::new(
            format!("{NAMESPACE}_db_connections_idle"),
            "Number of idle relational pool connections",
        )?;

        let redis_connections_active = Gauge::new(
            format!("{NAMESPACE}_redis_connections_active"),
            "Number of active Redis pool connections",
        )?;
        let redis_operations_total = CounterVec::new(
            Opts::new("redis_operations_total", "Total number of Redis operations")
                .namespace(NAMESPACE)
                .subsystem("redis"),
            &["operation", "status"],
        )?;

        let autocomplete_cache_hits = Counter::new(
            format!("{NAMESPACE}_autocomplete_cache_hits_total"),
            "Total autocomplete cache hits",
        )?;
        let autocomplete_cache_misses = Counter::new(
            format!("{NAMESPACE}_autocomplete_cache_misses_total"),
            "Total autocomplete cache misses",
        )?;
        let autocomplete_cache_evictions = Counter::new(
            format!("{NAMESPACE}_autocomplete_cache_evictions_total"),
            "Total autocomplete cache entries evicted for capacity",
        )?;

        let syncs_triggered_total = CounterVec::new(
            Opts::new("syncs_triggered_total", "Total sync trigger requests by outcome")
                .namespace(NAMESPACE)
                .subsystem("sync"),
            &["outcome"],
        )?;
        let sync_completions_total = CounterVec::new(
            Opts::new("sync_completions_total", "Total completed background syncs by status")
                .namespace(NAMESPACE)
                .subsystem("sync"),
            &["status"],
        )?;

        let memory_usage_bytes = Gauge::new(
            format!("{NAMESPACE}_memory_usage_bytes"),
            "Current total memory usage in bytes",
        )?;
        let cpu_usage_percent = Gauge::new(
            format!("{NAMESPACE}_cpu_usage_percent"),
            "Current CPU usage percentage",
        )?;
        let uptime_seconds = Gauge::new(
            format!("{NAMESPACE}_uptime_seconds"),
            "Application uptime in seconds",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(http_request_latency.clone()))?;
        registry.register(Box::new(db_connections_active.clone()))?;
        registry.register(Box::new(db_connections_idle.clone()))?;
        registry.register(Box::new(redis_connections_active.clone()))?;
        registry.register(Box::new(redis_operations_total.clone()))?;
        registry.register(Box::new(autocomplete_cache_hits.clone()))?;
        registry.register(Box::new(autocomplete_cache_misses.clone()))?;
        registry.register(Box::new(autocomplete_cache_evictions.clone()))?;
        registry.register(Box::new(syncs_triggered_total.clone()))?;
        registry.register(Box::new(sync_completions_total.clone()))?;
        registry.register(Box::new(memory_usage_bytes.clone()))?;
        registry.register(Box::new(cpu_usage_percent.clone()))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration,
            http_requests_in_flight,
            http_request_latency,
            db_connections_active,
            db_connections_idle,
            redis_connections_active,
            redis_operations_total,
            autocomplete_cache_hits,
            autocomplete_cache_misses,
            autocomplete_cache_evictions,
            syncs_triggered_total,
            sync_completions_total,
            memory_usage_bytes,
            cpu_usage_percent,
            uptime_seconds,
        })
    }

    pub fn record_http_request(
        &self,
        method: &Method,
        endpoint: &str,
        status_code: StatusCode,
        duration: std::time::Duration,
    ) {
        let status_str = status_code.as_u16().to_string();
        self.http_requests_total
            .with_label_values(&[method.as_str(), endpoint, &status_str])
            .inc();
        self.http_request_duration
            .with_label_values(&[method.as_str(), endpoint])
            .observe(duration.as_secs_f64());
    }

    pub fn record_request_latency(
        &self,
        method: &str,
        path: &str,
        status_code: u16,
        duration: std::time::Duration,
    ) {
        self.http_request_latency
            .with_label_values(&[method, path, &status_code.to_string()])
            .observe(duration.as_secs_f64());
    }

    pub fn increment_in_flight_requests(&self) {
        self.http_requests_in_flight.inc();
    }

    pub fn decrement_in_flight_requests(&self) {
        self.http_requests_in_flight.dec();
    }

    pub fn update_db_connections(&self, active: u32, idle: u32) {
        self.db_connections_active.set(active as f64);
        self.db_connections_idle.set(idle as f64);
    }

    pub fn update_redis_connections(&self, active: u32) {
        self.redis_connections_active.set(active as f64);
    }

    pub fn record_redis_operation(&self, operation: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.redis_operations_total
            .with_label_values(&[operation, status])
            .inc();
    }

    pub fn record_autocomplete_cache_hit(&self) {
        self.autocomplete_cache_hits.inc();
    }

    pub fn record_autocomplete_cache_miss(&self) {
        self.autocomplete_cache_misses.inc();
    }

    pub fn record_autocomplete_cache_eviction(&self, count: u64) {
        self.autocomplete_cache_evictions.inc_by(count as f64);
    }

    pub fn record_sync_triggered(&self, outcome: &str) {
        self.syncs_triggered_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_sync_completed(&self, status: &str) {
        self.sync_completions_total.with_label_values(&[status]).inc();
    }

    /// Refresh process-wide system gauges; cheap enough to call on every
    /// `/metrics` scrape (mirrors the teacher's `collect_real_system_metrics`
    /// minus the disk/job-queue gauges this domain has no use for).
    pub fn refresh_system_metrics(&self, uptime_secs: u64) {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let cpu_percent = if sys.cpus().is_empty() {
            0.0
        } else {
            sys.cpus().iter().map(|cpu| cpu.cpu_usage()).sum::<f32>() / sys.cpus().len() as f32
        };
        self.cpu_usage_percent.set(cpu_percent as f64);
        self.memory_usage_bytes.set(sys.used_memory() as f64);
        self.uptime_seconds.set(uptime_secs as f64);
    }

    pub fn get_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

/// HTTP request timer; increments in-flight on creation, records + decrements on `finish`.
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<MetricsCollector>,
    method: Method,
    endpoint: String,
}

impl RequestTimer {
    pub fn new(metrics: Arc<MetricsCollector>, method: Method, endpoint: String) -> Self {
        metrics.increment_in_flight_requests();
        Self {
            start: Instant::now(),
            metrics,
            method,
            endpoint,
        }
    }

    pub fn finish(self, status_code: StatusCode) {
        let duration = self.start.elapsed();
        self.metrics.decrement_in_flight_requests();
        self.metrics
            .record_http_request(&self.method, &self.endpoint, status_code, duration);
    }
}

pub async fn metrics_handler(State(metrics): State<Arc<MetricsCollector>>) -> impl IntoResponse {
    match metrics.get_metrics() {
        Ok(metrics_text) => Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
            .body(Body::from(metrics_text))
            .unwrap(),
        Err(err) => {
            tracing::error!("failed to generate metrics: {}", err);
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "error": "failed to generate metrics", "details": err.to_string() })
                        .to_string(),
                ))
                .unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_creation_registers_without_error() {
        let metrics = MetricsCollector::new().expect("collector should construct");
        let text = metrics.get_metrics().expect("should encode");
        assert!(!text.is_empty());
    }

    #[test]
    fn http_metrics_use_domain_namespace() {
        let metrics = MetricsCollector::new().unwrap();
        metrics.record_http_request(
            &Method::GET,
            "/api/node/1",
            StatusCode::OK,
            std::time::Duration::from_millis(10),
        );
        let text = metrics.get_metrics().unwrap();
        assert!(text.contains("discogsography_http_requests_total"));
    }

    #[test]
    fn autocomplete_cache_counters_increment() {
        let metrics = MetricsCollector::new().unwrap();
        metrics.record_autocomplete_cache_hit();
        metrics.record_autocomplete_cache_miss();
        metrics.record_autocomplete_cache_eviction(3);
        let text = metrics.get_metrics().unwrap();
        assert!(text.contains("discogsography_autocomplete_cache_hits_total 1"));
        assert!(text.contains("discogsography_autocomplete_cache_evictions_total 3"));
    }

    #[test]
    fn sync_counters_split_by_label() {
        let metrics = MetricsCollector::new().unwrap();
        metrics.record_sync_triggered("started");
        metrics.record_sync_triggered("cooldown");
        let text = metrics.get_metrics().unwrap();
        assert!(text.contains("outcome=\"started\""));
        assert!(text.contains("outcome=\"cooldown\""));
    }
}
