//! Correlation-id middleware, trimmed from the teacher's `tracing_middleware`
//! down to what doesn't depend on a `MonitoringService`: generate or forward
//! an `x-correlation-id`, span the request, and log one line per response.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

static CORRELATION_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

pub async fn tracing_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(&CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(correlation_id.clone());

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = tracing::info_span!("http_request", %method, %path, correlation_id = %correlation_id);
    let _entered = span.enter();

    let start = Instant::now();
    let mut response = next.run(request).await;
    let elapsed = start.elapsed();

    if let Ok(header_value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_HEADER.clone(), header_value);
    }

    let status = response.status();
    if status.is_server_error() {
        tracing::error!(%method, %path, %status, elapsed_ms = elapsed.as_millis() as u64, "request failed");
    } else if status.is_client_error() {
        tracing::warn!(%method, %path, %status, elapsed_ms = elapsed.as_millis() as u64, "request rejected");
    } else {
        tracing::info!(%method, %path, %status, elapsed_ms = elapsed.as_millis() as u64, "request completed");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, routing::get, Router};
    use tower::ServiceExt;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    #[tokio::test]
    async fn injects_correlation_id_header_when_absent() {
        let app = Router::new()
            .route("/", get(ok_handler))
            .layer(axum::middleware::from_fn(tracing_middleware));

        let response = app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.headers().get("x-correlation-id").is_some());
    }

    #[tokio::test]
    async fn echoes_incoming_correlation_id() {
        let app = Router::new()
            .route("/", get(ok_handler))
            .layer(axum::middleware::from_fn(tracing_middleware));

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header("x-correlation-id", "fixed-id-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get("x-correlation-id").unwrap(), "fixed-id-123");
    }
}
