//! Error types for scribe configuration.
//!
//! The logging pipeline itself never returns errors to the host; these are
//! only produced while turning user settings into a [`LogConfig`](crate::LogConfig).

use thiserror::Error;

/// Errors raised while building a logging configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid skip pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unknown target type: {0}")]
    UnknownType(String),

    #[error("Invalid entry `{0}`, expected `path=value`")]
    InvalidEntry(String),

    #[error("Environment error: {0}")]
    Environment(String),
}

/// Result type alias for configuration operations
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
