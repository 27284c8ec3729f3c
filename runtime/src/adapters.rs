//! Closure adapters for stages.
//!
//! Small stages rarely deserve their own type. These adapters wrap an async
//! closure and a name:
//!
//! ```
//! use railyard_core::envelope::{Outcome, Request};
//! use railyard_runtime::adapters::middleware_fn;
//! use serde_json::json;
//!
//! let tag = middleware_fn("tag", |request: Request, _env: &()| {
//!     Box::pin(async move { Outcome::next(request.with_meta("tagged", json!(true))) })
//! });
//! ```

use railyard_core::envelope::{Outcome, Request, Response};
use railyard_core::stage::{BoxFuture, Handler, Middleware, Postprocessor};
use std::fmt;

/// A [`Middleware`] backed by a closure.
pub struct FnMiddleware<F> {
    name: String,
    func: F,
}

/// A [`Handler`] backed by a closure.
pub struct FnHandler<F> {
    name: String,
    func: F,
}

/// A [`Postprocessor`] backed by a closure.
pub struct FnPostprocessor<F> {
    name: String,
    func: F,
}

/// Wrap `func` as a middleware named `name`.
pub fn middleware_fn<Env, F>(name: impl Into<String>, func: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(Request, &'a Env) -> BoxFuture<'a, Outcome> + Send + Sync,
{
    FnMiddleware {
        name: name.into(),
        func,
    }
}

/// Wrap `func` as a handler named `name`.
pub fn handler_fn<Env, F>(name: impl Into<String>, func: F) -> FnHandler<F>
where
    F: for<'a> Fn(Request, &'a Env) -> BoxFuture<'a, Outcome> + Send + Sync,
{
    FnHandler {
        name: name.into(),
        func,
    }
}

/// Wrap `func` as a postprocessor named `name`.
pub fn postprocessor_fn<Env, F>(name: impl Into<String>, func: F) -> FnPostprocessor<F>
where
    F: for<'a> Fn(Response, &'a Env) -> BoxFuture<'a, Response> + Send + Sync,
{
    FnPostprocessor {
        name: name.into(),
        func,
    }
}

impl<Env, F> Middleware<Env> for FnMiddleware<F>
where
    F: for<'a> Fn(Request, &'a Env) -> BoxFuture<'a, Outcome> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call<'a>(&'a self, request: Request, env: &'a Env) -> BoxFuture<'a, Outcome> {
        (self.func)(request, env)
    }
}

impl<Env, F> Handler<Env> for FnHandler<F>
where
    F: for<'a> Fn(Request, &'a Env) -> BoxFuture<'a, Outcome> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call<'a>(&'a self, request: Request, env: &'a Env) -> BoxFuture<'a, Outcome> {
        (self.func)(request, env)
    }
}

impl<Env, F> Postprocessor<Env> for FnPostprocessor<F>
where
    F: for<'a> Fn(Response, &'a Env) -> BoxFuture<'a, Response> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call<'a>(&'a self, response: Response, env: &'a Env) -> BoxFuture<'a, Response> {
        (self.func)(response, env)
    }
}

macro_rules! impl_debug {
    ($($ty:ident),*) => {$(
        impl<F> fmt::Debug for $ty<F> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty)).field("name", &self.name).finish_non_exhaustive()
            }
        }
    )*};
}

impl_debug!(FnMiddleware, FnHandler, FnPostprocessor);
