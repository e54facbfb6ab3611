//! Logger configuration.
//!
//! [`LogConfig`] is the resolved, immutable configuration of one middleware
//! instance. It is built either in code through [`LogConfig::builder`] or from
//! plain data with [`LogSettings`] (for example deserialized from a file or
//! from environment variables).

use crate::coerce::TargetType;
use crate::error::ConfigError;
use crate::skip::{SkipRule, Skipper};
use serde::Deserialize;

/// Request-side properties logged when none are configured.
pub const DEFAULT_REQUEST_PROPS: &[&str] = &["id", "body"];

/// Response-side properties logged when none are configured.
pub const DEFAULT_RESPONSE_PROPS: &[&str] = &["id", "body", "statusCode"];

/// Property paths to log on each side.
///
/// `None` means "use the defaults"; an explicit empty list logs nothing but the
/// envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropsToLog {
    pub request: Option<Vec<String>>,
    pub response: Option<Vec<String>>,
}

/// Resolved logger configuration
#[derive(Clone, Debug, Default)]
pub struct LogConfig {
    /// Property paths selected on each side
    pub props_to_log: PropsToLog,
    /// Environment variable names logged under `env`
    pub env_to_log: Vec<String>,
    /// Rules deciding which requests are not logged
    pub skip_rules: Vec<SkipRule>,
    /// Dotted path of an existing correlation id, e.g. `headers.x-request-id`
    pub correlation_id_path: String,
    /// Maximum serialized body length before the body is replaced by a marker
    pub body_length_limit: Option<usize>,
    /// Ordered coercion rules
    pub props_to_parse: Vec<(String, TargetType)>,
    /// Per-property maximum length in characters
    pub prop_max_length: Vec<(String, usize)>,
}

impl LogConfig {
    /// Create a new builder for LogConfig
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }

    /// Effective request-side paths: configured (or default) plus `env_to_log`.
    pub fn request_props(&self) -> Vec<String> {
        resolve(self.props_to_log.request.as_deref(), DEFAULT_REQUEST_PROPS, &self.env_to_log)
    }

    /// Effective response-side paths: configured (or default) plus `env_to_log`.
    pub fn response_props(&self) -> Vec<String> {
        resolve(self.props_to_log.response.as_deref(), DEFAULT_RESPONSE_PROPS, &self.env_to_log)
    }

    pub fn skipper(&self) -> Skipper {
        Skipper::new(self.skip_rules.iter().cloned())
    }
}

fn resolve(configured: Option<&[String]>, defaults: &[&str], env: &[String]) -> Vec<String> {
    let mut props: Vec<String> = match configured {
        Some(list) => list.to_vec(),
        None => defaults.iter().map(|s| s.to_string()).collect(),
    };
    props.extend(env.iter().cloned());
    props
}

/// Builder for LogConfig
#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    /// Set the request-side property paths
    pub fn request_props<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.props_to_log.request = Some(props.into_iter().map(Into::into).collect());
        self
    }

    /// Set the response-side property paths
    pub fn response_props<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.props_to_log.response = Some(props.into_iter().map(Into::into).collect());
        self
    }

    /// Add an environment variable to log
    pub fn env_to_log(mut self, name: impl Into<String>) -> Self {
        self.config.env_to_log.push(name.into());
        self
    }

    /// Add a skip rule
    pub fn skip(mut self, rule: SkipRule) -> Self {
        self.config.skip_rules.push(rule);
        self
    }

    /// Skip an exact path
    pub fn skip_path(self, path: impl Into<String>) -> Self {
        self.skip(SkipRule::path(path))
    }

    /// Set the dotted path of an existing correlation id
    pub fn correlation_id_path(mut self, path: impl Into<String>) -> Self {
        self.config.correlation_id_path = path.into();
        self
    }

    /// Set the maximum serialized body length
    pub fn body_length_limit(mut self, limit: usize) -> Self {
        self.config.body_length_limit = Some(limit);
        self
    }

    /// Add a coercion rule
    pub fn parse_prop(mut self, path: impl Into<String>, target: TargetType) -> Self {
        self.config.props_to_parse.push((path.into(), target));
        self
    }

    /// Limit the length of a property
    pub fn prop_max_length(mut self, path: impl Into<String>, max: usize) -> Self {
        self.config.prop_max_length.push((path.into(), max));
        self
    }

    /// Build the LogConfig
    pub fn build(self) -> LogConfig {
        self.config
    }
}

/// Plain-data form of [`LogConfig`].
///
/// `props_to_parse` entries are `path=type` (`string`, `number`, `boolean`),
/// `prop_max_length` entries are `path=chars`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogSettings {
    pub request_props: Option<Vec<String>>,
    pub response_props: Option<Vec<String>>,
    pub env_to_log: Vec<String>,
    pub skip_paths: Vec<String>,
    pub skip_patterns: Vec<String>,
    pub skip_methods: Vec<String>,
    pub correlation_id_path: String,
    pub body_length_limit: Option<usize>,
    pub props_to_parse: Vec<String>,
    pub prop_max_length: Vec<String>,
}

impl TryFrom<LogSettings> for LogConfig {
    type Error = ConfigError;

    fn try_from(settings: LogSettings) -> Result<Self, Self::Error> {
        let mut skip_rules: Vec<SkipRule> =
            settings.skip_paths.into_iter().map(SkipRule::Path).collect();
        for pattern in &settings.skip_patterns {
            skip_rules.push(SkipRule::pattern(pattern)?);
        }
        skip_rules.extend(settings.skip_methods.into_iter().map(SkipRule::Method));

        let props_to_parse = settings
            .props_to_parse
            .iter()
            .map(|entry| -> Result<_, ConfigError> {
                let (path, ty) = split_entry(entry)?;
                Ok((path, ty.parse::<TargetType>()?))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let prop_max_length = settings
            .prop_max_length
            .iter()
            .map(|entry| -> Result<_, ConfigError> {
                let (path, max) = split_entry(entry)?;
                let max = max
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidEntry(entry.clone()))?;
                Ok((path, max))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(LogConfig {
            props_to_log: PropsToLog {
                request: settings.request_props,
                response: settings.response_props,
            },
            env_to_log: settings.env_to_log,
            skip_rules,
            correlation_id_path: settings.correlation_id_path,
            body_length_limit: settings.body_length_limit,
            props_to_parse,
            prop_max_length,
        })
    }
}

fn split_entry(entry: &str) -> Result<(String, &str), ConfigError> {
    match entry.split_once('=') {
        Some((path, value)) if !path.trim().is_empty() && !value.trim().is_empty() => {
            Ok((path.trim().to_string(), value.trim()))
        }
        _ => Err(ConfigError::InvalidEntry(entry.to_string())),
    }
}
