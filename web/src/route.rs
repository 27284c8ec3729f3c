//! Mounting pipelines on Axum routes.

use crate::extractors::Envelope;
use crate::response::HttpResponse;
use axum::routing::{any, MethodRouter};
use railyard_runtime::Pipeline;
use std::sync::Arc;
use std::time::Instant;

/// Serve `pipeline` with `env` for every method on a route.
///
/// Each request is extracted as an [`Envelope`], run through the pipeline
/// and rendered with [`HttpResponse`]. Extraction failures answer 400
/// without running any stage.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .route("/accounts/:id", pipeline_route(accounts_pipeline, env.clone()))
///     .route("/ping", pipeline_route(ping_pipeline, env));
/// ```
pub fn pipeline_route<S, Env>(pipeline: Pipeline<Env>, env: Arc<Env>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
    Env: Send + Sync + 'static,
{
    let pipeline = Arc::new(pipeline);
    any(move |Envelope(request): Envelope| {
        let pipeline = Arc::clone(&pipeline);
        let env = Arc::clone(&env);
        async move {
            let start = Instant::now();
            let outcome = pipeline.run(request, &env).await;
            let response = HttpResponse::from_outcome(outcome);

            metrics::counter!(
                "http_requests_total",
                "pipeline" => pipeline.config().name.clone(),
                "status" => response.status().as_u16().to_string()
            )
            .increment(1);
            metrics::histogram!(
                "http_request_duration_seconds",
                "pipeline" => pipeline.config().name.clone()
            )
            .record(start.elapsed().as_secs_f64());

            response
        }
    })
}
