//! # scribe-tower
//!
//! Tower middleware that logs HTTP traffic through a [`scribe_core::HttpLogger`].
//!
//! For each request that is not skipped, the middleware resolves a
//! correlation id (also inserted into the request extensions as
//! [`scribe_core::CorrelationId`]), logs the request before the inner service
//! runs, and logs the response once its body has been fully sent.
//! Responses that carry no body (HEAD requests, 1xx, 204 and 304) are
//! logged as soon as the inner service returns them.
//! Skipped requests pass through without any instrumentation.

mod body;
mod layer;
pub mod record;
mod request_body;

pub use body::CaptureBody;
pub use layer::{HttpLoggerLayer, HttpLoggerService};
pub use request_body::{BoxError, Buffered, RequestBody};
