//! # scribe
//!
//! HTTP traffic logging for Tower services.
//!
//! Every request that is not skipped produces one `info` line when it
//! arrives and one line when its response body has been fully sent. The
//! response line is `info`, `warn` or `error` depending on the status code.
//! Lines are compact JSON with a fixed envelope (`service`, `ddtags`,
//! `startTime`, `hostname`, `pid`) followed by the configured properties.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scribe::prelude::*;
//!
//! let layer = HttpLoggerLayer::tracing(
//!     LogConfig::builder()
//!         .response_props(["statusCode", "latency"])
//!         .skip_path("/health")
//!         .build(),
//!     MessageBuilder::new("orders").masker(KeyMasker::default()),
//! );
//!
//! let app = tower::ServiceBuilder::new().layer(layer).service(handler);
//! ```
//!
//! ## Optional Features
//!
//! - `env-config` - read [`LogSettings`] from `SCRIBE_*` variables and `.env` files
//! - `full` - all optional features enabled
//!
//! ```toml
//! [dependencies]
//! scribe = { version = "0.1", features = ["env-config"] }
//! ```

// Re-export the pipeline
pub use scribe_core::*;

// Re-export the Tower adapter
pub use scribe_tower::{record, BoxError, CaptureBody, HttpLoggerLayer, HttpLoggerService, RequestBody};

// Re-exports for user convenience
pub use serde_json;
pub use tracing;

#[cfg(feature = "env-config")]
pub mod env_config;
#[cfg(feature = "env-config")]
pub use env_config::{load_config_from_env, load_settings_from_env, ENV_PREFIX};

/// Prelude module - import everything you need with `use scribe::prelude::*`
pub mod prelude {
    pub use scribe_core::{
        // Configuration
        ConfigError,
        CorrelationId,
        // Message building
        HostSnapshot,
        HttpLogger,
        KeyMasker,
        // Backends
        LogBackend,
        LogConfig,
        LogLevel,
        LogMessage,
        LogSettings,
        MessageBuilder,
        SkipRule,
        TargetType,
        TracingBackend,
    };
    pub use scribe_tower::{CaptureBody, HttpLoggerLayer, HttpLoggerService, RequestBody};

    #[cfg(feature = "env-config")]
    pub use crate::env_config::{load_config_from_env, load_settings_from_env};
}
