//! Tower layer and service.

use crate::body::CaptureBody;
use crate::record::{request_record, response_head};
use crate::request_body::{BoxError, Buffered, RequestBody};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::{Method, Request, Response, StatusCode};
use http_body::Body;
use scribe_core::{HttpLogger, LogBackend, LogConfig, MessageBuilder, BODY_LIMIT_MARKER};
use serde_json::Value;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Layer that logs every request and response passing through it.
///
/// The wrapped service receives `Request<RequestBody<B>>` and its response
/// body is wrapped in [`CaptureBody`]. Both forward the original bytes
/// unchanged.
///
/// # Example
///
/// ```rust,ignore
/// use scribe_tower::HttpLoggerLayer;
/// use scribe_core::{LogConfig, MessageBuilder};
///
/// let layer = HttpLoggerLayer::tracing(
///     LogConfig::builder().skip_path("/health").build(),
///     MessageBuilder::new("orders"),
/// );
/// let service = tower::ServiceBuilder::new().layer(layer).service(app);
/// ```
#[derive(Clone, Debug)]
pub struct HttpLoggerLayer {
    logger: HttpLogger,
}

impl HttpLoggerLayer {
    pub fn new(logger: HttpLogger) -> Self {
        Self { logger }
    }

    /// Layer writing to `backend`.
    pub fn with_backend(config: LogConfig, builder: MessageBuilder, backend: impl LogBackend) -> Self {
        Self::new(HttpLogger::new(config, builder, backend))
    }

    /// Layer writing through `tracing`.
    pub fn tracing(config: LogConfig, builder: MessageBuilder) -> Self {
        Self::new(HttpLogger::with_tracing(config, builder))
    }

    pub fn logger(&self) -> &HttpLogger {
        &self.logger
    }
}

impl<S> Layer<S> for HttpLoggerLayer {
    type Service = HttpLoggerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpLoggerService {
            inner,
            logger: self.logger.clone(),
        }
    }
}

/// Service created by [`HttpLoggerLayer`].
#[derive(Clone, Debug)]
pub struct HttpLoggerService<S> {
    inner: S,
    logger: HttpLogger,
}

impl<S> HttpLoggerService<S> {
    pub fn new(inner: S, logger: HttpLogger) -> Self {
        Self { inner, logger }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for HttpLoggerService<S>
where
    S: Service<Request<RequestBody<ReqBody>>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: 'static,
    ReqBody: Body<Data = Bytes> + Unpin + Send + 'static,
    ReqBody::Error: Into<BoxError> + Send,
    ResBody: Body<Data = Bytes> + 'static,
{
    type Response = Response<CaptureBody<ResBody>>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // The ready service goes into the future; a fresh clone stays behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let logger = self.logger.clone();

        let path = req.uri().path().to_string();
        let method = req.method().as_str().to_string();
        let is_head = req.method() == Method::HEAD;

        if logger.should_skip(&path, &method) {
            tracing::debug!(%path, %method, "request skipped by logger");
            let req = req.map(RequestBody::streaming);
            return Box::pin(async move {
                let response = inner.call(req).await?;
                Ok(response.map(CaptureBody::passthrough))
            });
        }

        Box::pin(async move {
            let start_time = logger.now_millis();
            let (mut parts, body) = req.into_parts();

            let (body, parsed) = if logger.wants_request_body(&path, &method) {
                let (body, buffered) = RequestBody::buffer(body, logger.request_buffer_limit()).await;
                let parsed = match buffered {
                    Buffered::Complete(bytes) => logger.request_body_value(&bytes),
                    Buffered::OverLimit => Some(Value::String(BODY_LIMIT_MARKER.to_string())),
                };
                (body, parsed)
            } else {
                (RequestBody::streaming(body), None)
            };

            let mut record = request_record(&parts, start_time);
            record.body = parsed;
            let id = logger.correlation_id(&record);
            tracing::debug!(correlation_id = %id, %path, "logging request");
            record.id = Some(id.clone());
            parts.extensions.insert(id);
            logger.log_request(&record);

            let response = inner.call(Request::from_parts(parts, body)).await?;
            let mut capture = logger.capture_response(Arc::new(record), response_head(&response));
            if is_head || is_bodiless(response.status()) {
                // The server never polls these bodies.
                capture.finalize(None);
                return Ok(response.map(CaptureBody::passthrough));
            }
            Ok(response.map(|body| CaptureBody::new(body, capture)))
        })
    }
}

fn is_bodiless(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED
}
