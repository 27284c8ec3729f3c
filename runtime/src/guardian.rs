//! Validation middleware.
//!
//! A [`Guardian`] runs a [`Validator`] against the incoming request. A valid
//! request continues down the pipeline in its validated (possibly
//! normalized) form. An invalid one short-circuits with a response carrying
//! the validation errors and status 400:
//!
//! ```text
//! Response { data: { "errors": [...], "message"?: ... }, metadata: { "headers": { "status": 400 } } }
//! ```

use railyard_core::either::Either;
use railyard_core::envelope::{Outcome, Request, Response};
use railyard_core::stage::{BoxFuture, Middleware};
use railyard_core::validation::{ValidationFailure, Validator};
use serde_json::{Map, Value};

/// Status carried by a rejection response unless overridden.
pub const REJECTION_STATUS: u16 = 400;

/// Middleware that admits only requests its validator accepts.
#[derive(Debug, Clone)]
pub struct Guardian<V> {
    validator: V,
    status: u16,
}

impl<V: Validator> Guardian<V> {
    /// Guard with `validator`, rejecting with status 400.
    #[must_use]
    pub const fn new(validator: V) -> Self {
        Self {
            validator,
            status: REJECTION_STATUS,
        }
    }

    /// Use a different rejection status.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Shorthand for [`Guardian::new`].
#[must_use]
pub const fn guardian<V: Validator>(validator: V) -> Guardian<V> {
    Guardian::new(validator)
}

impl<Env: Sync, V: Validator> Middleware<Env> for Guardian<V> {
    fn name(&self) -> &str {
        "guardian"
    }

    fn call<'a>(&'a self, request: Request, _env: &'a Env) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            match self.validator.validate(request).await {
                Either::Right(validated) => Outcome::next(validated),
                Either::Left(failure) => {
                    tracing::debug!(errors = failure.errors.len(), "Request rejected by guardian");
                    Outcome::Response(rejection(failure, self.status))
                }
            }
        })
    }
}

fn rejection(failure: ValidationFailure, status: u16) -> Response {
    let mut data = Map::new();
    data.insert("errors".to_string(), Value::Array(failure.errors));
    if let Some(message) = failure.message {
        data.insert("message".to_string(), Value::String(message));
    }
    Response::new(Value::Object(data), Value::Object(Map::new())).with_status(status)
}
