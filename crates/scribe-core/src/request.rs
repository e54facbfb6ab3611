//! Request-side logging.

use crate::level::LogLevel;
use crate::message::LogMessage;
use crate::pipeline::Pipeline;
use crate::record::RequestRecord;
use crate::select::{merge_into, pick};
use serde_json::{Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Emits one `info` message when a request arrives.
pub struct RequestLogger {
    pipeline: Arc<Pipeline>,
    props: Vec<String>,
}

impl RequestLogger {
    pub(crate) fn new(pipeline: Arc<Pipeline>, props: Vec<String>) -> Self {
        Self { pipeline, props }
    }

    pub fn props(&self) -> &[String] {
        &self.props
    }

    /// Log `record`. Returns the emitted message, or `None` if building it
    /// panicked (the panic is reported through `tracing` and swallowed).
    pub fn log(&self, record: &RequestRecord) -> Option<LogMessage> {
        let emitted = catch_unwind(AssertUnwindSafe(|| {
            let message = self.build(record);
            self.pipeline.emit(&message, LogLevel::Info);
            message
        }));
        match emitted {
            Ok(message) => Some(message),
            Err(_) => {
                tracing::warn!(path = %record.path, "request logging panicked; message dropped");
                None
            }
        }
    }

    fn build(&self, record: &RequestRecord) -> LogMessage {
        let fields = self.fields(record);
        self.pipeline
            .builder
            .build_event(fields, LogLevel::Info, "request")
    }

    pub(crate) fn fields(&self, record: &RequestRecord) -> Map<String, Value> {
        let view = record.to_value();
        let mut fields = pick(&view, &self.props);
        merge_into(&mut fields, pick(&Value::Object(record.headers.clone()), &self.props));
        if let Some(env) = self.pipeline.env_fields(&self.props) {
            fields.insert("env".into(), env);
        }
        self.pipeline.refine(fields)
    }
}
