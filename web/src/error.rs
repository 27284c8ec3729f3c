//! Error types for the HTTP edge.
//!
//! Expected failures travel through pipelines as responses. [`AppError`]
//! covers what is left: requests that cannot be turned into an envelope and
//! infrastructure failures surfacing at the edge.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use railyard_core::repository::RepositoryError;
use railyard_runtime::saga::SagaError;
use serde::Serialize;
use std::fmt;

/// Application error type for the HTTP edge.
///
/// Implements Axum's `IntoResponse`, rendering `{code, message}` JSON.
/// Server errors are logged with their source; the source is never sent to
/// the client.
///
/// # Examples
///
/// ```
/// use axum::http::StatusCode;
/// use railyard_core::repository::RepositoryError;
/// use railyard_web::AppError;
///
/// let err = AppError::from(RepositoryError::Unavailable("primary down".into()));
/// assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach the underlying error (logged, never exposed).
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", message)
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }

    /// HTTP status this error renders with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Request failed"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        let mapped = match &err {
            RepositoryError::Unavailable(_) => Self::unavailable("A backing store is unavailable"),
            RepositoryError::Conflict(id) => Self::conflict(format!("Concurrent write on {id}")),
            RepositoryError::InvalidQuery(query) => Self::bad_request(query.to_string()),
            RepositoryError::UnsupportedOperator(op) => {
                Self::bad_request(format!("Unsupported query operator `{op}`"))
            }
            RepositoryError::Backend(_) | RepositoryError::Serialization(_) => {
                Self::internal("An internal error occurred")
            }
        };
        mapped.with_source(err)
    }
}

impl From<SagaError> for AppError {
    fn from(err: SagaError) -> Self {
        Self::internal("The operation failed and could not be fully undone").with_source(err)
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}
