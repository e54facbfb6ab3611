//! Log-writing backends.

use crate::level::LogLevel;
use std::sync::Arc;

/// Target used by [`TracingBackend`] for every emitted message.
pub const HTTP_LOG_TARGET: &str = "scribe::http";

/// Receives one serialized line per message.
///
/// Implementations must not block for long: they run on the request path.
pub trait LogBackend: Send + Sync + 'static {
    fn info(&self, line: &str);
    fn warn(&self, line: &str);
    fn error(&self, line: &str);
}

impl<T: LogBackend + ?Sized> LogBackend for Arc<T> {
    fn info(&self, line: &str) {
        (**self).info(line)
    }

    fn warn(&self, line: &str) {
        (**self).warn(line)
    }

    fn error(&self, line: &str) {
        (**self).error(line)
    }
}

impl<T: LogBackend + ?Sized> LogBackend for Box<T> {
    fn info(&self, line: &str) {
        (**self).info(line)
    }

    fn warn(&self, line: &str) {
        (**self).warn(line)
    }

    fn error(&self, line: &str) {
        (**self).error(line)
    }
}

/// Route a line to the backend method matching `level`.
pub fn dispatch(backend: &dyn LogBackend, level: LogLevel, line: &str) {
    match level {
        LogLevel::Info => backend.info(line),
        LogLevel::Warn => backend.warn(line),
        LogLevel::Error => backend.error(line),
    }
}

/// Writes messages as `tracing` events under the `scribe::http` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingBackend;

impl LogBackend for TracingBackend {
    fn info(&self, line: &str) {
        tracing::info!(target: HTTP_LOG_TARGET, "{}", line);
    }

    fn warn(&self, line: &str) {
        tracing::warn!(target: HTTP_LOG_TARGET, "{}", line);
    }

    fn error(&self, line: &str) {
        tracing::error!(target: HTTP_LOG_TARGET, "{}", line);
    }
}
