//! Rendering pipeline results as HTTP responses.

use crate::extractors::CORRELATION_ID_HEADER;
use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response as AxumResponse},
    Json,
};
use railyard_core::envelope::{Outcome, Response};
use serde_json::{json, Value};

/// A pipeline [`Response`] rendered over HTTP.
///
/// The status comes from `metadata.headers.status` (200 when absent, 500
/// when not a valid code). Other string or number entries under
/// `metadata.headers` become response headers; the body is `data` as JSON.
///
/// # Examples
///
/// ```
/// use axum::{http::StatusCode, response::IntoResponse};
/// use railyard_core::envelope::Response;
/// use railyard_web::HttpResponse;
/// use serde_json::json;
///
/// let http = HttpResponse(Response::json(json!({})).with_status(201)).into_response();
/// assert_eq!(http.status(), StatusCode::CREATED);
/// ```
#[derive(Debug, Clone)]
pub struct HttpResponse(pub Response);

impl HttpResponse {
    /// Render a pipeline outcome.
    ///
    /// A fall-through ([`Outcome::Next`]) means nothing answered the request
    /// and becomes a 404.
    #[must_use]
    pub fn from_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Response(response) => Self(response),
            Outcome::Next(next) => {
                let correlation = next.request.meta("correlation_id").cloned();
                let mut response = Response::json(json!({
                    "code": "NOT_FOUND",
                    "message": "No handler responded to this request",
                }))
                .with_status(404);
                if let Some(id) = correlation {
                    response = response.with_meta("correlation_id", id);
                }
                Self(response)
            }
        }
    }

    /// HTTP status this response renders with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<Response> for HttpResponse {
    fn from(response: Response) -> Self {
        Self(response)
    }
}

impl From<Outcome> for HttpResponse {
    fn from(outcome: Outcome) -> Self {
        Self::from_outcome(outcome)
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> AxumResponse {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = %status, "Pipeline produced a server error response");
        }

        let correlation = self
            .0
            .meta("correlation_id")
            .and_then(Value::as_str)
            .and_then(|id| HeaderValue::from_str(id).ok());
        let (data, metadata) = self.0.into_parts();

        let mut response = (status, Json(data)).into_response();
        let headers = response.headers_mut();
        if let Some(Value::Object(declared)) = metadata.get("headers") {
            for (name, value) in declared {
                if name == "status" {
                    continue;
                }
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => continue,
                };
                match (
                    HeaderName::try_from(name.as_str()),
                    HeaderValue::try_from(rendered),
                ) {
                    (Ok(name), Ok(value)) => {
                        headers.insert(name, value);
                    }
                    _ => tracing::debug!(header = %name, "Dropping header that is not valid HTTP"),
                }
            }
        }
        if let Some(id) = correlation {
            headers.insert(CORRELATION_ID_HEADER, id);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railyard_core::envelope::Request;

    #[test]
    fn test_status_defaults_to_ok() {
        let http = HttpResponse(Response::json(json!({"ok": true})));
        assert_eq!(http.status(), StatusCode::OK);
    }

    #[test]
    fn test_invalid_status_becomes_internal_error() {
        let response = Response::new(json!({}), json!({"headers": {"status": "teapot"}}));
        assert_eq!(
            HttpResponse(response).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_declared_headers_are_copied() {
        let response = Response::new(
            json!({}),
            json!({"headers": {"status": 201, "location": "/accounts/1", "x-count": 3}}),
        );

        let http = HttpResponse(response).into_response();
        assert_eq!(http.status(), StatusCode::CREATED);
        assert_eq!(http.headers()["location"], "/accounts/1");
        assert_eq!(http.headers()["x-count"], "3");
        assert!(http.headers().get("status").is_none());
    }

    #[test]
    fn test_next_becomes_not_found() {
        let outcome = Outcome::next(Request::empty().with_meta("correlation_id", json!("c-1")));

        let http = HttpResponse::from_outcome(outcome).into_response();
        assert_eq!(http.status(), StatusCode::NOT_FOUND);
        assert_eq!(http.headers()[CORRELATION_ID_HEADER], "c-1");
    }
}
