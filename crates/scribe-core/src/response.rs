//! Response-side logging.
//!
//! A [`ResponseCapture`] follows one response from its first body chunk to
//! its end:
//!
//! ```text
//! Capturing --finalize--> Finalizing --dispatch--> Emitted
//! ```
//!
//! Chunks are recorded only while `Capturing`; everything after `Emitted` is
//! ignored, so a response produces at most one message. A capture dropped
//! before it is finalized (for example on client abort) emits nothing.

use crate::level::LogLevel;
use crate::message::LogMessage;
use crate::pipeline::Pipeline;
use crate::record::{parse_body, RequestRecord, ResponseHead, BODY_LIMIT_MARKER};
use crate::select::{merge_into, pick};
use bytes::{Bytes, BytesMut};
use serde_json::{Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Property name that turns on latency reporting.
pub const LATENCY_PROP: &str = "latency";

/// Builds and emits response messages.
pub struct ResponseLogger {
    pipeline: Arc<Pipeline>,
    props: Vec<String>,
    wants_latency: bool,
    body_length_limit: Option<usize>,
}

impl ResponseLogger {
    pub(crate) fn new(
        pipeline: Arc<Pipeline>,
        props: Vec<String>,
        body_length_limit: Option<usize>,
    ) -> Self {
        let wants_latency = props.iter().any(|p| p == LATENCY_PROP);
        Self {
            pipeline,
            props,
            wants_latency,
            body_length_limit,
        }
    }

    pub fn props(&self) -> &[String] {
        &self.props
    }

    /// Whether `latency` was requested in the response props.
    pub fn wants_latency(&self) -> bool {
        self.wants_latency
    }

    fn wants_body(&self) -> bool {
        self.props
            .iter()
            .any(|p| is_body_path(p) || p.strip_prefix("res.").is_some_and(is_body_path))
    }

    fn build(&self, request: &RequestRecord, head: &ResponseHead, body: Option<Value>) -> (LogMessage, LogLevel) {
        let props = &self.props;
        let req_view = request.to_value();
        let res_view = head.to_value(body);

        // The response body, not the request body, answers `body` here.
        let req_props: Vec<&String> = props.iter().filter(|p| !is_body_path(p)).collect();
        let mut fields = pick(&req_view, &req_props);
        merge_into(&mut fields, pick(&Value::Object(request.headers.clone()), &req_props));
        if let Some(env) = self.pipeline.env_fields(props) {
            fields.insert("env".into(), env);
        }
        merge_into(&mut fields, pick(&res_view, props));

        let mut both = Map::new();
        both.insert("req".into(), req_view);
        both.insert("res".into(), res_view);
        merge_into(&mut fields, pick(&Value::Object(both), props));

        let fields = self.pipeline.refine(fields);
        let level = LogLevel::from_status(head.status);
        let mut message = self.pipeline.builder.build_event(fields, level, "response");
        if self.wants_latency {
            if let Some(start) = message.start_time() {
                let latency = start.saturating_sub(request.start_time);
                message.insert(LATENCY_PROP, Value::from(latency));
            }
        }
        (message, level)
    }
}

fn is_body_path(path: &str) -> bool {
    path == "body" || path.starts_with("body.")
}

/// State of a [`ResponseCapture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Capturing,
    Finalizing,
    Emitted,
}

/// Per-response capture state. Owned by exactly one response.
pub struct ResponseCapture {
    state: CaptureState,
    capture_body: bool,
    chunks: Vec<Bytes>,
    captured_len: usize,
    over_limit: bool,
    request: Arc<RequestRecord>,
    head: ResponseHead,
    logger: Arc<ResponseLogger>,
}

impl ResponseCapture {
    pub(crate) fn new(
        logger: Arc<ResponseLogger>,
        request: Arc<RequestRecord>,
        head: ResponseHead,
        capture_body: bool,
    ) -> Self {
        let capture_body = capture_body && logger.wants_body();
        Self {
            state: CaptureState::Capturing,
            capture_body,
            chunks: Vec::new(),
            captured_len: 0,
            over_limit: false,
            request,
            head,
            logger,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_capturing_body(&self) -> bool {
        self.capture_body
    }

    /// Record a copy of an emitted chunk.
    pub fn write(&mut self, chunk: &[u8]) {
        self.write_bytes(Bytes::copy_from_slice(chunk));
    }

    /// Record an emitted chunk. `Bytes` is immutable, so holding a handle is
    /// as good as a copy.
    pub fn write_bytes(&mut self, chunk: Bytes) {
        if self.state != CaptureState::Capturing || !self.capture_body || chunk.is_empty() {
            return;
        }
        self.captured_len += chunk.len();
        if self.over_limit {
            return;
        }
        if let Some(limit) = self.logger.body_length_limit {
            if self.captured_len > limit {
                // The logged body becomes the marker; stop holding bytes.
                self.over_limit = true;
                self.chunks = Vec::new();
                return;
            }
        }
        self.chunks.push(chunk);
    }

    /// Complete the capture and emit the response message.
    ///
    /// Only the first call does anything; it returns the emitted message
    /// (or `None` if building it panicked).
    pub fn finalize(&mut self, trailing: Option<&[u8]>) -> Option<LogMessage> {
        if self.state != CaptureState::Capturing {
            return None;
        }
        if let Some(chunk) = trailing {
            self.write(chunk);
        }
        self.state = CaptureState::Finalizing;

        let body = self.take_body();
        let logger = Arc::clone(&self.logger);
        let request = Arc::clone(&self.request);
        let head = &self.head;
        let emitted = catch_unwind(AssertUnwindSafe(|| {
            let (message, level) = logger.build(&request, head, body);
            logger.pipeline.emit(&message, level);
            message
        }));
        self.state = CaptureState::Emitted;

        match emitted {
            Ok(message) => Some(message),
            Err(_) => {
                tracing::warn!(
                    correlation_id = ?request.id.as_ref().map(|id| id.as_str()),
                    "response logging panicked; message dropped"
                );
                None
            }
        }
    }

    fn take_body(&mut self) -> Option<Value> {
        if !self.capture_body {
            return None;
        }
        if self.over_limit {
            return Some(Value::String(BODY_LIMIT_MARKER.to_string()));
        }
        let chunks = std::mem::take(&mut self.chunks);
        match chunks.len() {
            0 => None,
            1 => parse_body(&chunks[0]),
            _ => {
                let mut buf = BytesMut::with_capacity(self.captured_len);
                for chunk in &chunks {
                    buf.extend_from_slice(chunk);
                }
                parse_body(&buf)
            }
        }
    }
}

impl Drop for ResponseCapture {
    fn drop(&mut self) {
        if self.state == CaptureState::Capturing {
            tracing::debug!(
                path = %self.request.path,
                "response body dropped before completion; nothing logged"
            );
        }
    }
}
