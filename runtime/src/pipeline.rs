//! Ordered stage execution with short-circuit semantics.
//!
//! A [`Pipeline`] holds middleware and handlers in declaration order plus a
//! list of postprocessors. Running it threads one request through the
//! stages:
//!
//! 1. Each stage receives the request produced by the previous one.
//! 2. A middleware that returns a response stops the run; that response is
//!    returned as-is and postprocessors do not run.
//! 3. A handler that returns a response stops the run; postprocessors then
//!    transform it in declaration order, each receiving the previous one's
//!    output.
//! 4. If every stage yields `Next`, the run returns the final `Next` and the
//!    transport decides what that means.
//!
//! # Example
//!
//! ```
//! use railyard_core::envelope::{Outcome, Request, Response};
//! use railyard_runtime::adapters::{handler_fn, middleware_fn};
//! use railyard_runtime::pipeline::Pipeline;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let pipeline = Pipeline::<()>::builder()
//!     .middleware(middleware_fn("stamp", |request: Request, _env: &()| {
//!         Box::pin(async move { Outcome::next(request.with_meta("stamped", json!(true))) })
//!     }))
//!     .handler(handler_fn("echo", |request: Request, _env: &()| {
//!         Box::pin(async move { Outcome::from(Response::json(request.metadata().clone())) })
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let response = pipeline.run(Request::empty(), &()).await.into_response().unwrap();
//! assert_eq!(response.data()["stamped"], json!(true));
//! # });
//! ```

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;
use railyard_core::envelope::{Outcome, Request, Response};
use railyard_core::stage::{Handler, Middleware, Postprocessor};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// A middleware or handler in a pipeline.
pub enum Stage<Env> {
    /// Pre-processing stage; its response skips postprocessing.
    Middleware(Arc<dyn Middleware<Env>>),
    /// Business stage; its response is postprocessed.
    Handler(Arc<dyn Handler<Env>>),
}

impl<Env> Stage<Env> {
    /// Stage name used in logs and metrics.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Middleware(middleware) => middleware.name(),
            Self::Handler(handler) => handler.name(),
        }
    }

    /// `"middleware"` or `"handler"`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Middleware(_) => "middleware",
            Self::Handler(_) => "handler",
        }
    }

    async fn call(&self, request: Request, env: &Env) -> Outcome {
        match self {
            Self::Middleware(middleware) => middleware.call(request, env).await,
            Self::Handler(handler) => handler.call(request, env).await,
        }
    }
}

impl<Env> Clone for Stage<Env> {
    fn clone(&self) -> Self {
        match self {
            Self::Middleware(middleware) => Self::Middleware(Arc::clone(middleware)),
            Self::Handler(handler) => Self::Handler(Arc::clone(handler)),
        }
    }
}

impl<Env> fmt::Debug for Stage<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.name())
    }
}

/// An immutable, reusable sequence of stages.
///
/// Pipelines are cheap to clone and safe to share across tasks; every run
/// gets its own request and borrows the caller's environment.
pub struct Pipeline<Env> {
    config: PipelineConfig,
    stages: Vec<Stage<Env>>,
    postprocessors: Vec<Arc<dyn Postprocessor<Env>>>,
}

impl<Env> Pipeline<Env> {
    /// Start building a pipeline with default configuration.
    #[must_use]
    pub fn builder() -> PipelineBuilder<Env> {
        PipelineBuilder::new()
    }

    /// The configuration this pipeline was built with.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Middleware and handler names in declaration order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Postprocessor names in declaration order.
    #[must_use]
    pub fn postprocessor_names(&self) -> Vec<&str> {
        self.postprocessors.iter().map(|p| p.name()).collect()
    }
}

impl<Env: Sync> Pipeline<Env> {
    /// Run `request` through the pipeline.
    ///
    /// Returns the first response produced by a stage (postprocessed when a
    /// handler produced it), or the last `Next` when no stage responded.
    #[tracing::instrument(skip_all, name = "pipeline_run", fields(pipeline = %self.config.name))]
    pub async fn run(&self, request: Request, env: &Env) -> Outcome {
        let started = Instant::now();
        let pipeline = self.config.name.as_str();
        PipelineMetrics::record_request(pipeline);

        let mut request = request;
        for stage in &self.stages {
            match self.timed(stage.name(), stage.call(request, env)).await {
                Outcome::Next(next) => request = next.into_request(),
                Outcome::Response(response) => {
                    let response = match stage {
                        Stage::Middleware(_) => {
                            tracing::debug!(
                                stage = stage.name(),
                                status = response.status(),
                                "Middleware short-circuited the pipeline"
                            );
                            PipelineMetrics::record_short_circuit(pipeline, stage.name());
                            response
                        }
                        Stage::Handler(_) => {
                            tracing::debug!(stage = stage.name(), "Handler responded");
                            self.postprocess(response, env).await
                        }
                    };
                    PipelineMetrics::record_run(pipeline, started.elapsed());
                    return Outcome::Response(response);
                }
            }
        }

        tracing::warn!("No stage produced a response");
        PipelineMetrics::record_unhandled(pipeline);
        PipelineMetrics::record_run(pipeline, started.elapsed());
        Outcome::next(request)
    }

    async fn postprocess(&self, mut response: Response, env: &Env) -> Response {
        for postprocessor in &self.postprocessors {
            response = self
                .timed(postprocessor.name(), postprocessor.call(response, env))
                .await;
        }
        response
    }

    async fn timed<T>(&self, stage: &str, future: impl Future<Output = T>) -> T {
        let started = Instant::now();
        let output = future.await;
        let elapsed = started.elapsed();

        PipelineMetrics::record_stage(&self.config.name, stage, elapsed);
        if elapsed > self.config.slow_stage_threshold() {
            tracing::warn!(
                stage,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "Slow pipeline stage"
            );
        }
        output
    }
}

impl<Env> Clone for Pipeline<Env> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            stages: self.stages.clone(),
            postprocessors: self.postprocessors.clone(),
        }
    }
}

impl<Env> fmt::Debug for Pipeline<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("stages", &self.stages)
            .field("postprocessors", &self.postprocessor_names())
            .finish()
    }
}

/// Builder for [`Pipeline`].
///
/// Stages run in the order they are added. `build` fails unless at least
/// one handler was added.
pub struct PipelineBuilder<Env> {
    config: PipelineConfig,
    stages: Vec<Stage<Env>>,
    postprocessors: Vec<Arc<dyn Postprocessor<Env>>>,
}

impl<Env> PipelineBuilder<Env> {
    /// An empty builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            stages: Vec::new(),
            postprocessors: Vec::new(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the pipeline name used in spans and metric labels.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.with_name(name);
        self
    }

    /// Append a middleware stage.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware<Env> + 'static) -> Self {
        self.stages.push(Stage::Middleware(Arc::new(middleware)));
        self
    }

    /// Append a handler stage.
    #[must_use]
    pub fn handler(mut self, handler: impl Handler<Env> + 'static) -> Self {
        self.stages.push(Stage::Handler(Arc::new(handler)));
        self
    }

    /// Append an already shared stage.
    #[must_use]
    pub fn stage(mut self, stage: Stage<Env>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append a postprocessor.
    #[must_use]
    pub fn postprocessor(mut self, postprocessor: impl Postprocessor<Env> + 'static) -> Self {
        self.postprocessors.push(Arc::new(postprocessor));
        self
    }

    /// Finish the pipeline.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NoHandler`] when no handler stage was added.
    pub fn build(self) -> Result<Pipeline<Env>, PipelineError> {
        if !self
            .stages
            .iter()
            .any(|stage| matches!(stage, Stage::Handler(_)))
        {
            return Err(PipelineError::NoHandler {
                pipeline: self.config.name,
            });
        }

        tracing::debug!(
            pipeline = %self.config.name,
            stages = self.stages.len(),
            postprocessors = self.postprocessors.len(),
            "Pipeline built"
        );

        Ok(Pipeline {
            config: self.config,
            stages: self.stages,
            postprocessors: self.postprocessors,
        })
    }
}

impl<Env> Default for PipelineBuilder<Env> {
    fn default() -> Self {
        Self::new()
    }
}
