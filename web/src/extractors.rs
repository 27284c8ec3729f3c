//! Axum extractors that turn HTTP requests into pipeline envelopes.
//!
//! The body becomes the request `data`; everything else about the HTTP
//! request lands in `metadata`:
//!
//! ```json
//! {
//!   "headers": { "content-type": "application/json" },
//!   "params":  { "id": "42" },
//!   "query":   { "expand": "tags" },
//!   "method":  "POST",
//!   "path":    "/accounts/42",
//!   "correlation_id": "4f1c..."
//! }
//! ```

use crate::error::AppError;
use axum::{
    async_trait,
    body::{to_bytes, Body},
    extract::{FromRequest, FromRequestParts, Query, RawPathParams},
    http::{request::Parts, HeaderMap},
};
use railyard_core::envelope::Request;
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Header name for correlation IDs.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Largest body the [`Envelope`] extractor will buffer (2 MiB).
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Extract a pipeline [`Request`] from an HTTP request.
///
/// - JSON body → `data` (an empty body becomes `{}`)
/// - headers, path params and query string → `metadata`
/// - a correlation ID is taken from `x-correlation-id` or generated
///
/// A body that is not valid JSON is rejected with 400 before any pipeline
/// stage runs.
///
/// # Example
///
/// ```ignore
/// async fn handler(Envelope(request): Envelope) -> HttpResponse {
///     tracing::info!(data = %request.data(), "received");
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Envelope(pub Request);

impl Envelope {
    /// Unwrap the pipeline request.
    #[must_use]
    pub fn into_inner(self) -> Request {
        self.0
    }
}

#[async_trait]
impl<S> FromRequest<S> for Envelope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let metadata = metadata_from_parts(&mut parts, state).await?;
        let data = read_json(body).await?;

        Ok(Self(Request::new(data, metadata)))
    }
}

/// Build the envelope metadata object from request parts.
async fn metadata_from_parts<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
) -> Result<Value, AppError> {
    // Routes without captures have no path params; treat that as empty.
    let params: Map<String, Value> = Option::<RawPathParams>::from_request_parts(parts, state)
        .await
        .ok()
        .flatten()
        .map(|raw| {
            raw.iter()
                .map(|(key, value)| (key.to_string(), Value::from(value)))
                .collect()
        })
        .unwrap_or_default();

    let Query(query) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map_err(|e| AppError::bad_request(format!("Invalid query string: {e}")))?;
    let query: Map<String, Value> = query
        .into_iter()
        .map(|(key, value)| (key, Value::from(value)))
        .collect();

    let mut metadata = Map::new();
    metadata.insert("headers".to_string(), headers_to_json(&parts.headers));
    metadata.insert("params".to_string(), Value::Object(params));
    metadata.insert("query".to_string(), Value::Object(query));
    metadata.insert("method".to_string(), Value::from(parts.method.as_str()));
    metadata.insert("path".to_string(), Value::from(parts.uri.path()));
    metadata.insert(
        "correlation_id".to_string(),
        Value::from(correlation_id(&parts.headers)),
    );
    Ok(Value::Object(metadata))
}

/// Header map as a JSON object; repeated headers are joined with `", "`.
///
/// Values that are not visible ASCII are dropped.
fn headers_to_json(headers: &HeaderMap) -> Value {
    let mut out = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join(", ");
        if !joined.is_empty() {
            out.insert(name.as_str().to_string(), Value::from(joined));
        }
    }
    Value::Object(out)
}

/// Incoming correlation ID, or a fresh one.
fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string)
}

async fn read_json(body: Body) -> Result<Value, AppError> {
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::bad_request(format!("Unreadable request body: {e}")))?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::bad_request(format!("Request body is not valid JSON: {e}")))
}
