//! Validation collaborator contract.
//!
//! A validator turns a raw [`Request`] into either a [`ValidationFailure`]
//! or a validated (possibly normalized) request. The guardian middleware in
//! the runtime crate is the only consumer inside the substrate.

use crate::either::Either;
use crate::envelope::Request;
use crate::stage::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Why a request was rejected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Individual problems, as strings or structured objects.
    pub errors: Vec<Value>,
    /// Optional summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationFailure {
    /// A failure listing `errors`.
    #[must_use]
    pub fn new<I, V>(errors: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            errors: errors.into_iter().map(Into::into).collect(),
            message: None,
        }
    }

    /// The same failure with a summary message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Checks a request before any handler runs.
pub trait Validator: Send + Sync {
    /// `Right(validated)` to continue, `Left(failure)` to reject.
    fn validate(&self, request: Request) -> BoxFuture<'_, Either<ValidationFailure, Request>>;
}

impl<V: Validator + ?Sized> Validator for Arc<V> {
    fn validate(&self, request: Request) -> BoxFuture<'_, Either<ValidationFailure, Request>> {
        (**self).validate(request)
    }
}

/// Validator backed by a synchronous closure. See [`validator_fn`].
pub struct FnValidator<F> {
    check: F,
}

impl<F> Validator for FnValidator<F>
where
    F: Fn(Request) -> Either<ValidationFailure, Request> + Send + Sync,
{
    fn validate(&self, request: Request) -> BoxFuture<'_, Either<ValidationFailure, Request>> {
        let verdict = (self.check)(request);
        Box::pin(async move { verdict })
    }
}

/// Wrap a synchronous check as a [`Validator`].
///
/// # Example
///
/// ```
/// use railyard_core::either::Either;
/// use railyard_core::validation::{validator_fn, ValidationFailure};
///
/// let requires_name = validator_fn(|request| {
///     if request.data().get("name").is_some() {
///         Either::Right(request)
///     } else {
///         Either::Left(ValidationFailure::new(["name is required"]))
///     }
/// });
/// # let _ = requires_name;
/// ```
pub fn validator_fn<F>(check: F) -> FnValidator<F>
where
    F: Fn(Request) -> Either<ValidationFailure, Request> + Send + Sync,
{
    FnValidator { check }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_is_omitted_when_absent() {
        let failure = ValidationFailure::new(["bad"]);
        assert_eq!(serde_json::to_value(&failure).ok(), Some(json!({"errors": ["bad"]})));

        let failure = failure.with_message("rejected");
        assert_eq!(
            serde_json::to_value(&failure).ok(),
            Some(json!({"errors": ["bad"], "message": "rejected"}))
        );
    }

    #[tokio::test]
    async fn fn_validator_returns_closure_verdict() {
        let validator = validator_fn(|request: Request| Either::Right(request.with_meta("checked", json!(true))));
        let verdict = validator.validate(Request::empty()).await;
        let validated = verdict.right();
        assert_eq!(
            validated.as_ref().and_then(|r| r.meta("checked")),
            Some(&json!(true))
        );
    }
}
