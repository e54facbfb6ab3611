//! Logger settings from the environment.
//!
//! Variables are read with the `SCRIBE_` prefix after loading a `.env` file
//! if one exists. Lists are comma separated:
//!
//! ```text
//! SCRIBE_REQUEST_PROPS=id,method,url,body
//! SCRIBE_RESPONSE_PROPS=id,statusCode,latency
//! SCRIBE_SKIP_PATHS=/health,/ready
//! SCRIBE_SKIP_METHODS=OPTIONS
//! SCRIBE_CORRELATION_ID_PATH=headers.x-request-id
//! SCRIBE_BODY_LENGTH_LIMIT=4096
//! SCRIBE_PROPS_TO_PARSE=body.id=string
//! ```

use scribe_core::{ConfigError, LogConfig, LogSettings};

/// Prefix of every variable read by [`load_settings_from_env`].
pub const ENV_PREFIX: &str = "SCRIBE_";

/// Read [`LogSettings`] from `SCRIBE_*` variables.
///
/// A missing `.env` file is not an error; unset variables keep their
/// defaults.
pub fn load_settings_from_env() -> Result<LogSettings, ConfigError> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            tracing::warn!(error = %err, "failed to load .env file");
        }
    }
    envy::prefixed(ENV_PREFIX)
        .from_env::<LogSettings>()
        .map_err(|err| ConfigError::Environment(err.to_string()))
}

/// [`load_settings_from_env`] followed by validation into a [`LogConfig`].
pub fn load_config_from_env() -> Result<LogConfig, ConfigError> {
    let settings = load_settings_from_env()?;
    tracing::debug!(?settings, "logger settings loaded from environment");
    LogConfig::try_from(settings)
}
