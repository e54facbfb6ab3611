//! The per-middleware logger: configuration resolved once, shared by every
//! request.

use crate::backend::{LogBackend, TracingBackend};
use crate::config::LogConfig;
use crate::env::EnvSnapshot;
use crate::message::{LogMessage, MessageBuilder};
use crate::pipeline::Pipeline;
use crate::record::{body_value, CorrelationId, RequestRecord, ResponseHead, MAX_BUFFERED_REQUEST_BODY};
use crate::request::RequestLogger;
use crate::response::{ResponseCapture, ResponseLogger};
use crate::select::select;
use crate::skip::Skipper;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// HTTP traffic logger.
///
/// Cheap to clone; all clones share one configuration, backend and message
/// builder.
///
/// # Example
///
/// ```rust,no_run
/// use scribe_core::{HttpLogger, LogConfig, MessageBuilder, RequestRecord, ResponseHead};
///
/// let logger = HttpLogger::with_tracing(
///     LogConfig::builder().response_props(["statusCode", "latency"]).build(),
///     MessageBuilder::new("orders"),
/// );
///
/// let mut record = RequestRecord::new("GET", "/orders/1");
/// record.id = Some(logger.correlation_id(&record));
/// logger.log_request(&record);
///
/// let mut capture = logger.capture_response(record.into(), ResponseHead::new(200));
/// capture.write(br#"{"id":1}"#);
/// capture.finalize(None);
/// ```
#[derive(Clone)]
pub struct HttpLogger {
    inner: Arc<Inner>,
}

struct Inner {
    skipper: Skipper,
    correlation_id_path: String,
    request: RequestLogger,
    response: Arc<ResponseLogger>,
    pipeline: Arc<Pipeline>,
    body_length_limit: Option<usize>,
    wants_request_body: bool,
}

impl fmt::Debug for HttpLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpLogger")
            .field("skipper", &self.inner.skipper)
            .field("request_props", &self.inner.request.props())
            .field("response_props", &self.inner.response.props())
            .finish_non_exhaustive()
    }
}

impl HttpLogger {
    /// Build a logger, reading the `env_to_log` variables from the process
    /// environment.
    pub fn new(config: LogConfig, builder: MessageBuilder, backend: impl LogBackend) -> Self {
        let env = EnvSnapshot::capture(&config.env_to_log);
        Self::with_env(config, builder, backend, env)
    }

    /// Build a logger that writes through `tracing`.
    pub fn with_tracing(config: LogConfig, builder: MessageBuilder) -> Self {
        Self::new(config, builder, TracingBackend)
    }

    /// Build a logger with an explicit environment snapshot.
    pub fn with_env(
        config: LogConfig,
        builder: MessageBuilder,
        backend: impl LogBackend,
        env: EnvSnapshot,
    ) -> Self {
        let request_props = config.request_props();
        let response_props = config.response_props();
        let wants_request_body = request_props
            .iter()
            .any(|p| p == "body" || p.starts_with("body."));

        let pipeline = Arc::new(Pipeline {
            builder,
            backend: Arc::new(backend),
            env,
            props_to_parse: config.props_to_parse.clone(),
            prop_max_length: config.prop_max_length.clone(),
        });

        tracing::debug!(
            request_props = ?request_props,
            response_props = ?response_props,
            skip_rules = config.skip_rules.len(),
            "http logger configured"
        );

        Self {
            inner: Arc::new(Inner {
                skipper: config.skipper(),
                correlation_id_path: config.correlation_id_path.clone(),
                request: RequestLogger::new(Arc::clone(&pipeline), request_props),
                response: Arc::new(ResponseLogger::new(
                    Arc::clone(&pipeline),
                    response_props,
                    config.body_length_limit,
                )),
                pipeline,
                body_length_limit: config.body_length_limit,
                wants_request_body,
            }),
        }
    }

    /// Whether the request should pass through without any logging.
    pub fn should_skip(&self, path: &str, method: &str) -> bool {
        self.inner.skipper.should_skip(path, method)
    }

    /// Whether bodies of this exchange should not be captured.
    pub fn should_skip_body(&self, path: &str, method: &str) -> bool {
        self.inner.skipper.should_skip_body(path, method)
    }

    /// Whether the request body has to be buffered before the handler runs.
    pub fn wants_request_body(&self, path: &str, method: &str) -> bool {
        self.inner.wants_request_body && !self.should_skip_body(path, method)
    }

    /// Request body bytes to buffer before handing the rest of the body to
    /// the handler live. A body longer than this is logged as
    /// [`BODY_LIMIT_MARKER`](crate::BODY_LIMIT_MARKER).
    pub fn request_buffer_limit(&self) -> usize {
        self.inner
            .body_length_limit
            .map_or(MAX_BUFFERED_REQUEST_BODY, |limit| limit.min(MAX_BUFFERED_REQUEST_BODY))
    }

    /// Parse a buffered request body, honoring the body length limit.
    pub fn request_body_value(&self, bytes: &[u8]) -> Option<Value> {
        body_value(bytes, self.inner.body_length_limit)
    }

    /// Current time from the message builder's clock.
    pub fn now_millis(&self) -> u64 {
        self.inner.pipeline.builder.now_millis()
    }

    /// Correlation id from the configured path, or a fresh one.
    ///
    /// A non-empty string or a number found at the path is used as is.
    pub fn correlation_id(&self, record: &RequestRecord) -> CorrelationId {
        let path = &self.inner.correlation_id_path;
        if !path.is_empty() {
            let view = record.to_value();
            match select(&view, path) {
                Some(Value::String(s)) if !s.is_empty() => return CorrelationId::new(s.clone()),
                Some(Value::Number(n)) => return CorrelationId::new(n.to_string()),
                _ => {}
            }
        }
        CorrelationId::generate()
    }

    /// Emit the request message.
    pub fn log_request(&self, record: &RequestRecord) -> Option<LogMessage> {
        self.inner.request.log(record)
    }

    /// Start capturing the response to `request`.
    pub fn capture_response(&self, request: Arc<RequestRecord>, head: ResponseHead) -> ResponseCapture {
        let capture_body = !self.should_skip_body(&request.path, &request.method);
        ResponseCapture::new(Arc::clone(&self.inner.response), request, head, capture_body)
    }
}
