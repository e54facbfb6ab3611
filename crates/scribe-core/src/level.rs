use serde::Serialize;
use std::fmt;

/// Severity of an emitted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Derive the level from a response status.
    ///
    /// 5xx is `error`, 4xx is `warn`, anything else (including no status) is `info`.
    pub fn from_status(status: Option<u16>) -> Self {
        match status {
            Some(code) if code >= 500 => LogLevel::Error,
            Some(code) if code >= 400 => LogLevel::Warn,
            _ => LogLevel::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
