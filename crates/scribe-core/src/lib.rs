//! # scribe-core
//!
//! Log-assembly pipeline for HTTP traffic logging.
//!
//! This crate knows nothing about a particular HTTP stack. Adapters turn
//! requests into [`RequestRecord`]s, drive a [`ResponseCapture`] with the
//! response body chunks, and the pipeline does the rest: property selection,
//! type coercion, envelope building, masking and level-aware dispatch to a
//! [`LogBackend`].
//!
//! Most applications use the `scribe` crate, which wires this pipeline into
//! Tower.

mod backend;
pub mod coerce;
mod config;
mod env;
mod error;
mod level;
mod logger;
pub mod mask;
pub mod message;
mod pipeline;
mod record;
mod request;
mod response;
pub mod select;
pub mod serialize;
mod skip;
pub mod value;

// Public API
pub use backend::{dispatch, LogBackend, TracingBackend, HTTP_LOG_TARGET};
pub use coerce::{coerce, TargetType};
pub use config::{
    LogConfig, LogConfigBuilder, LogSettings, PropsToLog, DEFAULT_REQUEST_PROPS,
    DEFAULT_RESPONSE_PROPS,
};
pub use env::EnvSnapshot;
pub use error::{ConfigError, Result};
pub use level::LogLevel;
pub use logger::HttpLogger;
pub use mask::{KeyMasker, Masker, NoopMasker, REDACTED};
pub use message::{integrations, Clock, HostSnapshot, Integration, LogMessage, MessageBuilder, SystemClock};
pub use pipeline::ELLIPSIS;
pub use record::{
    append_header, body_value, parse_body, CorrelationId, RequestRecord, ResponseHead,
    BODY_LIMIT_MARKER, MAX_BUFFERED_REQUEST_BODY,
};
pub use request::RequestLogger;
pub use response::{CaptureState, ResponseCapture, ResponseLogger, LATENCY_PROP};
pub use select::{pick, select};
pub use serialize::{serialize, CYCLE_MARKER};
pub use skip::{SkipPredicate, SkipRule, Skipper};
pub use value::{ErrorValue, LogValue, SharedValue};
