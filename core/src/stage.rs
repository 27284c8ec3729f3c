//! Pipeline stage contracts.
//!
//! Three kinds of stage make up a pipeline:
//!
//! - [`Middleware`]: cross-cutting pre-processing (validation, auth). Yields
//!   [`Outcome::Next`] to continue or [`Outcome::Response`] to short-circuit.
//! - [`Handler`]: the business operation. Same shape as middleware; its
//!   response is the one postprocessors see.
//! - [`Postprocessor`]: transforms a handler's response.
//!
//! Every stage receives the per-request environment by reference. The
//! environment type a stage is implemented for is its permission boundary:
//! a handler implemented for an environment that only holds read-only
//! repositories cannot reach a mutation method.
//!
//! # Dyn Compatibility
//!
//! Stage methods return [`BoxFuture`] so pipelines can store stages as
//! `Arc<dyn Middleware<Env>>`.

use crate::envelope::{Outcome, Request, Response};

pub use futures::future::BoxFuture;

/// Pre-processing stage.
pub trait Middleware<Env>: Send + Sync {
    /// Stage name used in logs and metrics.
    fn name(&self) -> &str;

    /// Inspect `request` and either continue or stop.
    fn call<'a>(&'a self, request: Request, env: &'a Env) -> BoxFuture<'a, Outcome>;
}

/// Business-logic stage.
///
/// Returning [`Outcome::Next`] hands the (possibly rewritten) request to the
/// next declared handler.
pub trait Handler<Env>: Send + Sync {
    /// Stage name used in logs and metrics.
    fn name(&self) -> &str;

    /// Execute the operation.
    fn call<'a>(&'a self, request: Request, env: &'a Env) -> BoxFuture<'a, Outcome>;
}

/// Response-enrichment stage, run after a handler responded.
pub trait Postprocessor<Env>: Send + Sync {
    /// Stage name used in logs and metrics.
    fn name(&self) -> &str;

    /// Transform the response.
    fn call<'a>(&'a self, response: Response, env: &'a Env) -> BoxFuture<'a, Response>;
}
