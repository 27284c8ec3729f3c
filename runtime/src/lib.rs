//! # Railyard Runtime
//!
//! Execution layer for the Railyard request-processing substrate.
//!
//! This crate runs pipelines built from `railyard-core` stages and provides
//! compensation-based atomicity across repositories.
//!
//! ## Core Components
//!
//! - **Pipeline**: ordered middleware and handlers with short-circuit
//!   semantics, followed by postprocessors
//! - **Guardian**: validation middleware rejecting bad requests with a 400
//! - **Adapters**: closure-backed stages
//! - **Saga**: unit of work logging inverse operations for rollback
//!
//! ## Example
//!
//! ```
//! use railyard_core::either::Either;
//! use railyard_core::envelope::{Outcome, Request, Response};
//! use railyard_core::validation::{validator_fn, ValidationFailure};
//! use railyard_runtime::adapters::handler_fn;
//! use railyard_runtime::guardian::guardian;
//! use railyard_runtime::pipeline::Pipeline;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let pipeline = Pipeline::<()>::builder()
//!     .name("greet")
//!     .middleware(guardian(validator_fn(|request: Request| {
//!         if request.data().get("name").is_some() {
//!             Either::Right(request)
//!         } else {
//!             Either::Left(ValidationFailure::new(["name is required"]))
//!         }
//!     })))
//!     .handler(handler_fn("hello", |request: Request, _env: &()| {
//!         Box::pin(async move {
//!             Outcome::from(Response::json(json!({"hello": request.data()["name"]})))
//!         })
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let rejected = pipeline.run(Request::empty(), &()).await.into_response().unwrap();
//! assert_eq!(rejected.status(), 400);
//! # });
//! ```

/// Closure-backed stages
pub mod adapters;

/// Pipeline configuration
pub mod config;

/// Validation middleware
pub mod guardian;

/// Prometheus metrics for observability
pub mod metrics;

/// Pipeline builder and runner
pub mod pipeline;

/// Unit of work and compensating repository proxy
pub mod saga;

pub use config::PipelineConfig;
pub use guardian::{guardian, Guardian};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use saga::{SagaAborted, SagaError, SagaRepository, UnitOfWork};

/// Error types for pipeline construction
pub mod error {
    use thiserror::Error;

    /// Errors raised while building a pipeline
    ///
    /// Running a pipeline never fails: stage outcomes are values, and
    /// infrastructure failures are handled by the stages themselves.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum PipelineError {
        /// The pipeline declares no handler stage
        ///
        /// A pipeline without a handler could only ever short-circuit or
        /// fall through.
        #[error("Pipeline `{pipeline}` declares no handler")]
        NoHandler {
            /// Name of the offending pipeline
            pipeline: String,
        },
    }
}

pub use error::PipelineError;
