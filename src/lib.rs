//! discogsography-api — the JWT-gated Read API over the catalog graph and
//! relational stores, plus the per-user Discogs sync trigger.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use discogsography_db::{GraphStore, RelationalStore};
use discogsography_sync::SyncTrigger;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod services;

pub use config::AppConfig;
pub use health::{HealthCheckConfig, HealthCheckResponse, HealthChecker, HealthStatus};
pub use metrics::{metrics_handler, MetricsCollector};

use services::{AutocompleteCache, CacheInvalidationRateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub relational: Arc<RelationalStore>,
    pub graph: GraphStore,
    pub redis_pool: deadpool_redis::Pool,
    pub config: Arc<AppConfig>,
    pub autocomplete_cache: Arc<AutocompleteCache>,
    pub sync_trigger: Arc<SyncTrigger>,
    pub metrics: Arc<MetricsCollector>,
    pub health_checker: Arc<HealthChecker>,
    pub cache_invalidation_limiter: Arc<CacheInvalidationRateLimiter>,
    pub start_time: Instant,
}

pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/autocomplete", get(handlers::autocomplete::autocomplete))
        .route("/explore", get(handlers::explore::explore))
        .route("/expand", get(handlers::expand::expand))
        .route("/node/:id", get(handlers::node::node_details))
        .route("/trends", get(handlers::trends::trends))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login));

    let optional_auth_routes = Router::new()
        .route("/status", get(handlers::user::status))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::optional_auth,
        ));

    let required_auth_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route("/collection", get(handlers::user::collection))
        .route("/wantlist", get(handlers::user::wantlist))
        .route("/collection/stats", get(handlers::user::collection_stats))
        .route("/recommendations", get(handlers::user::recommendations))
        .route("/sync", post(handlers::sync::trigger_sync))
        .route("/sync/status", get(handlers::sync::sync_status))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(optional_auth_routes)
        .merge(required_auth_routes)
        .route("/cache/invalidate", post(handlers::cache::invalidate));

    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check_endpoint))
        .route("/health/live", get(liveness_check_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::tracing::tracing_middleware))
                .layer(axum::middleware::from_fn(middleware::security::security_headers_middleware))
                .layer(axum::middleware::from_fn_with_state(
                    state.metrics.clone(),
                    middleware::latency::latency_middleware,
                ))
                .layer(middleware::cors::create_cors_layer(&state.config)),
        )
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let response = state
        .health_checker
        .check_health(&state.relational, &state.graph, &state.redis_pool)
        .await;
    Json(response)
}

async fn readiness_check_endpoint(State(state): State<AppState>) -> Json<serde_json::Value> {
    let response = state
        .health_checker
        .check_health(&state.relational, &state.graph, &state.redis_pool)
        .await;
    let ready = response.status != HealthStatus::Unhealthy;
    Json(serde_json::json!({ "ready": ready }))
}

async fn liveness_check_endpoint() -> Json<serde_json::Value> {
    let _ = health::liveness_check().await;
    Json(serde_json::json!({ "status": "alive" }))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    metrics::metrics_handler(State(state.metrics)).await
}
