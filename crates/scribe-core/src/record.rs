//! Transport-neutral views of requests and responses.
//!
//! The loggers never see HTTP framework types; adapters (such as
//! `scribe-tower`) turn them into a [`RequestRecord`] and a [`ResponseHead`].
//! Property paths are resolved against the JSON views these produce.

use serde_json::{Map, Value};
use std::fmt;

/// Replaces a body whose size exceeds the configured length limit.
pub const BODY_LIMIT_MARKER: &str = "[body exceeds length limit]";

/// Most request body bytes held before the handler runs, whatever the
/// configured length limit.
pub const MAX_BUFFERED_REQUEST_BODY: usize = 1024 * 1024;

/// Identifier shared by the request and response message of one exchange.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// A fresh random (v4) UUID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the loggers may read from an inbound request.
#[derive(Clone, Debug, Default)]
pub struct RequestRecord {
    pub id: Option<CorrelationId>,
    pub method: String,
    /// Path and query as received
    pub url: String,
    pub path: String,
    pub query: Option<String>,
    pub http_version: String,
    /// Lowercase header names; repeated headers become arrays
    pub headers: Map<String, Value>,
    /// Parsed request body, when it was buffered
    pub body: Option<Value>,
    /// Epoch milliseconds at arrival
    pub start_time: u64,
}

impl RequestRecord {
    /// Record for `method` and `url` (`/path?query`).
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (url.clone(), None),
        };
        Self {
            method: method.into(),
            url,
            path,
            query,
            http_version: "HTTP/1.1".to_string(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<Value>) -> Self {
        append_header(&mut self.headers, name, value.into());
        self
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn with_start_time(mut self, millis: u64) -> Self {
        self.start_time = millis;
        self
    }

    /// JSON view used for property selection.
    pub fn to_value(&self) -> Value {
        let mut view = Map::new();
        view.insert(
            "id".into(),
            self.id
                .as_ref()
                .map_or(Value::Null, |id| Value::String(id.0.clone())),
        );
        view.insert("method".into(), Value::String(self.method.clone()));
        view.insert("url".into(), Value::String(self.url.clone()));
        view.insert("path".into(), Value::String(self.path.clone()));
        view.insert(
            "query".into(),
            self.query.clone().map_or(Value::Null, Value::String),
        );
        view.insert("httpVersion".into(), Value::String(self.http_version.clone()));
        view.insert("headers".into(), Value::Object(self.headers.clone()));
        view.insert("body".into(), self.body.clone().unwrap_or(Value::Null));
        view.insert("startTime".into(), Value::from(self.start_time));
        Value::Object(view)
    }
}

/// Status line and headers of a response, known before its body streams.
#[derive(Clone, Debug, Default)]
pub struct ResponseHead {
    pub status: Option<u16>,
    pub status_message: Option<String>,
    pub headers: Map<String, Value>,
}

impl ResponseHead {
    pub fn new(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<Value>) -> Self {
        append_header(&mut self.headers, name, value.into());
        self
    }

    /// JSON view used for property selection, with the captured body.
    pub fn to_value(&self, body: Option<Value>) -> Value {
        let mut view = Map::new();
        view.insert(
            "statusCode".into(),
            self.status.map_or(Value::Null, Value::from),
        );
        view.insert(
            "statusMessage".into(),
            self.status_message.clone().map_or(Value::Null, Value::String),
        );
        view.insert("headers".into(), Value::Object(self.headers.clone()));
        view.insert("body".into(), body.unwrap_or(Value::Null));
        Value::Object(view)
    }
}

/// Add a header value; a repeated name turns the entry into an array.
pub fn append_header(headers: &mut Map<String, Value>, name: &str, value: Value) {
    let name = name.to_ascii_lowercase();
    match headers.get_mut(&name) {
        Some(Value::Array(values)) => values.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            headers.insert(name, value);
        }
    }
}

/// Parse a captured body: JSON when possible, else (lossy) UTF-8 text.
///
/// An empty body is absent.
pub fn parse_body(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}

/// [`parse_body`] with the length limit applied to the raw byte count.
pub fn body_value(bytes: &[u8], limit: Option<usize>) -> Option<Value> {
    match limit {
        Some(limit) if bytes.len() > limit => Some(Value::String(BODY_LIMIT_MARKER.to_string())),
        _ => parse_body(bytes),
    }
}
