//! Health and metrics endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health and scrape pipeline metrics.

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, MethodRouter},
};
use railyard_runtime::metrics::MetricsRecorder;
use std::sync::Arc;

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
/// This endpoint does NOT check backing stores.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Route serving the Prometheus scrape payload of `recorder`.
///
/// # Status Codes
///
/// - 200 OK: text exposition format
/// - 503 Service Unavailable: the recorder was installed elsewhere
///
/// # Endpoint
///
/// ```text
/// GET /metrics
/// ```
pub fn metrics_route<S>(recorder: Arc<MetricsRecorder>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    get(move || {
        let recorder = Arc::clone(&recorder);
        async move {
            match recorder.render() {
                Some(body) => (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
                    body,
                )
                    .into_response(),
                None => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "metrics recorder not installed here",
                )
                    .into_response(),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
