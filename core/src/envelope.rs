//! Request, response and continuation envelopes.
//!
//! A [`Request`] flows through a pipeline as a value: every stage that wants
//! to change it builds a new one. A stage signals "keep going" with
//! [`Next`] and "stop here" with [`Response`]; [`Outcome`] is the union of
//! the two.
//!
//! Both envelopes carry unstructured JSON `data` and a JSON `metadata`
//! object. By convention metadata holds `headers`, `params` and `query`
//! objects plus any custom fields a stage wants to pass downstream. The
//! response status lives at `metadata.headers.status`.
//!
//! # Example
//!
//! ```
//! use railyard_core::envelope::{Outcome, Request, Response};
//! use serde_json::json;
//!
//! let request = Request::new(json!({"name": "ada"}), json!({}))
//!     .with_meta("tenant", json!("acme"));
//! assert_eq!(request.meta("tenant"), Some(&json!("acme")));
//!
//! let response = Response::new(json!({"ok": true}), json!({})).with_status(201);
//! assert_eq!(response.status(), 201);
//!
//! let outcome: Outcome = response.into();
//! assert!(outcome.is_response());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status reported when a response carries none.
pub const DEFAULT_STATUS: u16 = 200;

/// Status reported when a response carries an unusable status value.
pub const INVALID_STATUS: u16 = 500;

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Set `key` on `target`; a non-object `target` is replaced by an object.
fn set_field(target: &mut Value, key: String, field: Value) {
    match target {
        Value::Object(map) => {
            map.insert(key, field);
        }
        other => {
            let mut map = Map::new();
            map.insert(key, field);
            *other = Value::Object(map);
        }
    }
}

/// Inbound envelope: payload plus context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    data: Value,
    metadata: Value,
}

impl Request {
    /// Build a request from payload and metadata.
    #[must_use]
    pub const fn new(data: Value, metadata: Value) -> Self {
        Self { data, metadata }
    }

    /// `{data: {}, metadata: {}}`.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(empty_object(), empty_object())
    }

    /// The payload.
    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    /// The metadata object.
    #[must_use]
    pub const fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// A top-level metadata field.
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// A request header, looked up in `metadata.headers`.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.metadata.get("headers").and_then(|h| h.get(name))
    }

    /// The same request with a different payload.
    #[must_use]
    pub fn with_data(self, data: Value) -> Self {
        Self { data, ..self }
    }

    /// The same request with different metadata.
    #[must_use]
    pub fn with_metadata(self, metadata: Value) -> Self {
        Self { metadata, ..self }
    }

    /// The same request with one metadata field set.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        set_field(&mut self.metadata, key.into(), value);
        self
    }

    /// Split into `(data, metadata)`.
    #[must_use]
    pub fn into_parts(self) -> (Value, Value) {
        (self.data, self.metadata)
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::empty()
    }
}

/// Terminal envelope produced by a middleware or handler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    data: Value,
    metadata: Value,
}

impl Response {
    /// Build a response from payload and metadata.
    #[must_use]
    pub const fn new(data: Value, metadata: Value) -> Self {
        Self { data, metadata }
    }

    /// A response with the given payload and empty metadata.
    #[must_use]
    pub fn json(data: Value) -> Self {
        Self::new(data, empty_object())
    }

    /// The payload.
    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    /// The metadata object.
    #[must_use]
    pub const fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// A top-level metadata field.
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Status code from `metadata.headers.status`.
    ///
    /// [`DEFAULT_STATUS`] when absent; [`INVALID_STATUS`] when present but
    /// not an integer (or integer string) between 100 and 999.
    #[must_use]
    pub fn status(&self) -> u16 {
        let Some(raw) = self.metadata.pointer("/headers/status") else {
            return DEFAULT_STATUS;
        };
        let code = match raw {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        code.filter(|c| (100..=999).contains(c))
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(INVALID_STATUS)
    }

    /// The same response with `metadata.headers.status` set.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        let mut headers = self
            .metadata
            .get_mut("headers")
            .map(Value::take)
            .unwrap_or_default();
        set_field(&mut headers, "status".to_string(), Value::from(status));
        set_field(&mut self.metadata, "headers".to_string(), headers);
        self
    }

    /// The same response with a different payload.
    #[must_use]
    pub fn with_data(self, data: Value) -> Self {
        Self { data, ..self }
    }

    /// The same response with one metadata field set.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        set_field(&mut self.metadata, key.into(), value);
        self
    }

    /// Split into `(data, metadata)`.
    #[must_use]
    pub fn into_parts(self) -> (Value, Value) {
        (self.data, self.metadata)
    }
}

/// Continuation signal carrying the (possibly rewritten) request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Next {
    /// The request the next stage receives.
    pub request: Request,
}

impl Next {
    /// Continue with `request`.
    #[must_use]
    pub const fn new(request: Request) -> Self {
        Self { request }
    }

    /// Unwrap the carried request.
    #[must_use]
    pub fn into_request(self) -> Request {
        self.request
    }
}

/// What a middleware or handler yields: continue, or stop with a response.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Keep going with the carried request.
    Next(Next),
    /// Stop here.
    Response(Response),
}

impl Outcome {
    /// Continue with `request`.
    #[must_use]
    pub const fn next(request: Request) -> Self {
        Self::Next(Next::new(request))
    }

    /// Whether this outcome stops the pipeline.
    #[must_use]
    pub const fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// The response, if this outcome is terminal.
    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Response(response) => Some(response),
            Self::Next(_) => None,
        }
    }

    /// The continuation, if this outcome is not terminal.
    #[must_use]
    pub fn into_next(self) -> Option<Next> {
        match self {
            Self::Next(next) => Some(next),
            Self::Response(_) => None,
        }
    }
}

impl From<Next> for Outcome {
    fn from(next: Next) -> Self {
        Self::Next(next)
    }
}

impl From<Response> for Outcome {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transformations_leave_original_untouched() {
        let original = Request::new(json!({"a": 1}), json!({"headers": {"x": "y"}}));
        let changed = original.clone().with_data(json!({"a": 2}));
        assert_eq!(original.data(), &json!({"a": 1}));
        assert_eq!(changed.data(), &json!({"a": 2}));
        assert_eq!(changed.header("x"), Some(&json!("y")));
    }

    #[test]
    fn with_meta_repairs_non_object_metadata() {
        let request = Request::new(json!(null), json!("garbage")).with_meta("k", json!(1));
        assert_eq!(request.metadata(), &json!({"k": 1}));
    }

    #[test]
    fn status_defaults_to_200() {
        assert_eq!(Response::json(json!({})).status(), 200);
    }

    #[test]
    fn status_reads_number_or_numeric_string() {
        let numeric = Response::new(json!({}), json!({"headers": {"status": 404}}));
        assert_eq!(numeric.status(), 404);
        let text = Response::new(json!({}), json!({"headers": {"status": "201"}}));
        assert_eq!(text.status(), 201);
    }

    #[test]
    fn status_rejects_garbage() {
        let bad = Response::new(json!({}), json!({"headers": {"status": true}}));
        assert_eq!(bad.status(), INVALID_STATUS);
        let out_of_range = Response::new(json!({}), json!({"headers": {"status": 70000}}));
        assert_eq!(out_of_range.status(), INVALID_STATUS);
    }

    #[test]
    fn with_status_keeps_other_headers() {
        let response = Response::new(json!({}), json!({"headers": {"etag": "abc"}})).with_status(400);
        assert_eq!(
            response.metadata(),
            &json!({"headers": {"etag": "abc", "status": 400}})
        );
    }

    #[test]
    fn with_status_repairs_non_object_metadata_and_headers() {
        let bare = Response::new(json!({}), json!([1, 2])).with_status(404);
        assert_eq!(bare.metadata(), &json!({"headers": {"status": 404}}));

        let stray = Response::new(json!({}), json!({"headers": "x", "trace": 7})).with_status(201);
        assert_eq!(
            stray.metadata(),
            &json!({"headers": {"status": 201}, "trace": 7})
        );
        assert_eq!(stray.status(), 201);
    }

    #[test]
    fn outcome_conversions() {
        let next: Outcome = Next::new(Request::empty()).into();
        assert!(!next.is_response());
        assert_eq!(next.clone().into_next(), Some(Next::new(Request::empty())));
        assert_eq!(next.into_response(), None);
    }
}
