//! Log message assembly.
//!
//! A [`MessageBuilder`] wraps event fields in the standard envelope
//! (`service`, `ddtags`, `startTime`, `hostname`, `pid`), runs integration
//! hooks, masks the result and drops top-level nulls.

use crate::level::LogLevel;
use crate::mask::{Masker, NoopMasker};
use crate::select::merge_into;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Hook run on the envelope before event fields are merged in.
pub type Integration = Arc<dyn Fn(Map<String, Value>) -> Map<String, Value> + Send + Sync>;

/// Host identity, captured once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostSnapshot {
    pub hostname: String,
    pub pid: u32,
}

impl HostSnapshot {
    /// Read hostname and pid of the current process.
    ///
    /// The hostname comes from `HOSTNAME`, then `/etc/hostname`, else `unknown`.
    pub fn capture() -> Self {
        let hostname = std::env::var("HOSTNAME")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .or_else(|| {
                std::fs::read_to_string("/etc/hostname")
                    .ok()
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty())
            })
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            hostname,
            pid: std::process::id(),
        }
    }

    pub fn fixed(hostname: impl Into<String>, pid: u32) -> Self {
        Self {
            hostname: hostname.into(),
            pid,
        }
    }
}

/// Source of `startTime` values, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + 'static {
    fn now_millis(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// A finished log message.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LogMessage(Map<String, Value>);

impl LogMessage {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn level(&self) -> Option<&str> {
        self.get("level").and_then(Value::as_str)
    }

    /// `"request"` or `"response"`.
    pub fn origin(&self) -> Option<&str> {
        self.get("from").and_then(Value::as_str)
    }

    pub fn start_time(&self) -> Option<u64> {
        self.get("startTime").and_then(Value::as_u64)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Serialize as one compact JSON line.
    pub fn to_line(&self) -> String {
        crate::serialize::serialize_map(&self.0)
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Builds [`LogMessage`]s for one service.
#[derive(Clone)]
pub struct MessageBuilder {
    service: String,
    ddtags: Option<String>,
    host: HostSnapshot,
    clock: Arc<dyn Clock>,
    integrations: Vec<Integration>,
    masker: Arc<dyn Masker>,
}

impl fmt::Debug for MessageBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBuilder")
            .field("service", &self.service)
            .field("ddtags", &self.ddtags)
            .field("host", &self.host)
            .field("integrations", &self.integrations.len())
            .finish_non_exhaustive()
    }
}

impl MessageBuilder {
    /// Builder with the current host, the system clock and no masking.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ddtags: None,
            host: HostSnapshot::capture(),
            clock: Arc::new(SystemClock),
            integrations: Vec::new(),
            masker: Arc::new(NoopMasker),
        }
    }

    pub fn ddtags(mut self, tags: impl Into<String>) -> Self {
        self.ddtags = Some(tags.into());
        self
    }

    pub fn host(mut self, host: HostSnapshot) -> Self {
        self.host = host;
        self
    }

    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Append an integration hook; hooks run in the order they were added.
    pub fn integration<F>(mut self, hook: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.integrations.push(Arc::new(hook));
        self
    }

    pub fn masker(mut self, masker: impl Masker) -> Self {
        self.masker = Arc::new(masker);
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    fn envelope(&self) -> Map<String, Value> {
        let mut envelope = Map::new();
        envelope.insert("service".into(), Value::String(self.service.clone()));
        envelope.insert(
            "ddtags".into(),
            self.ddtags.clone().map_or(Value::Null, Value::String),
        );
        envelope.insert("startTime".into(), Value::from(self.clock.now_millis()));
        envelope.insert("hostname".into(), Value::String(self.host.hostname.clone()));
        envelope.insert("pid".into(), Value::from(self.host.pid));
        self.integrations
            .iter()
            .fold(envelope, |envelope, hook| hook(envelope))
    }

    /// Envelope, hooks, merge of `fields`, masking, then null removal.
    pub fn build(&self, fields: Map<String, Value>) -> LogMessage {
        let mut merged = self.envelope();
        merge_into(&mut merged, fields);
        let mut masked = self.masker.mask(merged);
        masked.retain(|_, value| !value.is_null());
        LogMessage(masked)
    }

    /// Shorthand used by the loggers: stamps `level` and `from` before building.
    pub(crate) fn build_event(
        &self,
        mut fields: Map<String, Value>,
        level: LogLevel,
        from: &str,
    ) -> LogMessage {
        fields.insert("level".into(), Value::String(level.as_str().to_string()));
        fields.insert("from".into(), Value::String(from.to_string()));
        self.build(fields)
    }
}

/// Ready-made integration hooks.
pub mod integrations {
    use serde_json::{Map, Value};

    /// Add fixed fields to every envelope. Existing fields are not replaced.
    pub fn static_fields<I, K, V>(
        fields: I,
    ) -> impl Fn(Map<String, Value>) -> Map<String, Value> + Send + Sync + 'static
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let fields: Vec<(String, Value)> = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        move |mut envelope: Map<String, Value>| {
            for (key, value) in &fields {
                envelope
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
            envelope
        }
    }
}
