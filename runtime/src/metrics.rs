//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for the runtime:
//! - Pipeline runs, short-circuits and stage latency
//! - Saga rollbacks and compensation failures
//!
//! Metrics go through the `metrics` facade; nothing is recorded until a
//! recorder is installed, for example with [`MetricsRecorder::install`].
//!
//! # Example
//!
//! ```rust,no_run
//! use railyard_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder for the process.
///
/// Installs the Prometheus recorder and renders the scrape payload. It opens
/// no socket: serving the payload is the transport's job (see
/// `railyard_web::metrics_route`).
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRecorder")
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

impl MetricsRecorder {
    /// A recorder that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests), this logs a
    /// warning and succeeds without a handle.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this recorder did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Pipeline Metrics
    describe_counter!(
        "pipeline_requests_total",
        "Total number of requests run through a pipeline"
    );
    describe_counter!(
        "pipeline_short_circuits_total",
        "Total number of runs halted by a middleware response"
    );
    describe_counter!(
        "pipeline_unhandled_total",
        "Total number of runs where no stage produced a response"
    );
    describe_histogram!(
        "pipeline_run_duration_seconds",
        "Time taken by a whole pipeline run"
    );
    describe_histogram!(
        "pipeline_stage_duration_seconds",
        "Time taken by a single stage"
    );

    // Saga Metrics
    describe_counter!(
        "saga_rollbacks_total",
        "Total number of saga rollbacks"
    );
    describe_counter!(
        "saga_compensations_total",
        "Total number of compensating operations applied"
    );
    describe_counter!(
        "saga_compensation_failures_total",
        "Total number of compensating operations that failed"
    );
}

/// Pipeline metrics recorder.
pub struct PipelineMetrics;

impl PipelineMetrics {
    /// Record the start of a run.
    pub fn record_request(pipeline: &str) {
        counter!("pipeline_requests_total", "pipeline" => pipeline.to_string()).increment(1);
    }

    /// Record a middleware short-circuit.
    pub fn record_short_circuit(pipeline: &str, stage: &str) {
        counter!(
            "pipeline_short_circuits_total",
            "pipeline" => pipeline.to_string(),
            "stage" => stage.to_string()
        )
        .increment(1);
    }

    /// Record a run that ended without a response.
    pub fn record_unhandled(pipeline: &str) {
        counter!("pipeline_unhandled_total", "pipeline" => pipeline.to_string()).increment(1);
    }

    /// Record the duration of one stage.
    pub fn record_stage(pipeline: &str, stage: &str, duration: Duration) {
        histogram!(
            "pipeline_stage_duration_seconds",
            "pipeline" => pipeline.to_string(),
            "stage" => stage.to_string()
        )
        .record(duration.as_secs_f64());
    }

    /// Record the duration of a whole run.
    pub fn record_run(pipeline: &str, duration: Duration) {
        histogram!("pipeline_run_duration_seconds", "pipeline" => pipeline.to_string())
            .record(duration.as_secs_f64());
    }
}

/// Saga metrics recorder.
pub struct SagaMetrics;

impl SagaMetrics {
    /// Record a rollback and how its compensations went.
    pub fn record_rollback(compensated: usize, failed: usize) {
        counter!("saga_rollbacks_total").increment(1);
        counter!("saga_compensations_total").increment(compensated as u64);
        counter!("saga_compensation_failures_total").increment(failed as u64);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recorder_starts_uninstalled() {
        let recorder = MetricsRecorder::new();
        assert!(recorder.handle().is_none());
        assert!(recorder.render().is_none());
    }

    #[tokio::test]
    async fn test_recorder_renders_recorded_metrics() {
        let mut recorder = MetricsRecorder::new();
        recorder.install().unwrap();

        PipelineMetrics::record_request("accounts");
        PipelineMetrics::record_short_circuit("accounts", "guardian");
        SagaMetrics::record_rollback(2, 1);

        // If another test installed the recorder first, handle is None.
        if let Some(rendered) = recorder.render() {
            assert!(rendered.contains("pipeline_requests_total"));
            assert!(rendered.contains("pipeline_short_circuits_total"));
            assert!(rendered.contains("saga_compensation_failures_total"));
        }
    }
}
