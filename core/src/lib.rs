//! # Railyard Core
//!
//! Core types and traits for the Railyard request-processing substrate.
//!
//! This crate holds the vocabulary every service shares. Execution lives in
//! `railyard-runtime`; in-memory doubles live in `railyard-testing`.
//!
//! ## Core Concepts
//!
//! - **Either**: two-branch result for expected failures
//! - **Envelopes**: `Request`, `Response`, `Next`
//! - **Stages**: `Middleware`, `Handler`, `Postprocessor`
//! - **Capabilities**: `Readable`, `Queryable`, `Batchable`, `Setter`, `Remover`
//! - **Query DSL**: backend-agnostic conjunctive filters
//! - **Environment**: per-request dependencies injected into every stage
//!
//! ## Architecture Principles
//!
//! - Expected failures are values (`Either::Left`), never panics
//! - A stage's environment type is its permission boundary
//! - Pipelines are explicit values, not captured closures
//!
//! ## Example
//!
//! ```
//! use railyard_core::envelope::{Outcome, Request, Response};
//! use railyard_core::stage::{BoxFuture, Handler};
//! use serde_json::json;
//!
//! struct Ping;
//!
//! impl Handler<()> for Ping {
//!     fn name(&self) -> &str {
//!         "ping"
//!     }
//!
//!     fn call<'a>(&'a self, _request: Request, _env: &'a ()) -> BoxFuture<'a, Outcome> {
//!         Box::pin(async { Outcome::from(Response::json(json!({"pong": true}))) })
//!     }
//! }
//! ```

pub use chrono::{DateTime, Utc};

pub mod batch;
pub mod either;
pub mod entity;
pub mod envelope;
pub mod provider;
pub mod query;
pub mod repository;
pub mod stage;
pub mod validation;

pub use batch::{Batch, BatchItem, BatchResult, BatchStatus};
pub use either::Either;
pub use entity::{Entity, EntityHeader, EntityId, ResourceTag, SchemaVersion};
pub use envelope::{Next, Outcome, Request, Response};
pub use provider::{MediaTranscoder, ProviderError, Signer, TextGenerator};
pub use query::{Clause, Direction, Operator, Query, QueryError};
pub use repository::{
    Batchable, MutableRepository, Queryable, ReadOnly, ReadOnlyRepository, Readable, Remover,
    Repository, RepositoryError, RepositoryResult, Setter,
};
pub use stage::{BoxFuture, Handler, Middleware, Postprocessor};
pub use validation::{ValidationFailure, Validator};

/// Environment module - Dependency injection traits
///
/// Stages receive their dependencies through an environment value. The
/// traits here cover dependencies the substrate itself needs.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use railyard_core::environment::{Clock, SystemClock};
    ///
    /// let now = SystemClock.now();
    /// assert!(now.timestamp() > 0);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
