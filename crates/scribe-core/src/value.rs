//! Dynamic values accepted by the safe serializer.
//!
//! [`LogValue`] is a superset of [`serde_json::Value`]: besides plain data it
//! can carry structured errors ([`ErrorValue`]) and shared nodes
//! ([`SharedValue`]) which may reference each other and form cycles.

use serde_json::{Map, Number, Value};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A value that can be rendered by [`serialize`](crate::serialize::serialize).
#[derive(Debug, Clone, Default)]
pub enum LogValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<LogValue>),
    /// Object members in insertion order
    Object(Vec<(String, LogValue)>),
    Error(Box<ErrorValue>),
    Shared(SharedValue),
}

impl LogValue {
    /// Build an object from key/value pairs, keeping their order.
    pub fn object<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<LogValue>,
    {
        LogValue::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Insert or replace a member when this value is an object.
    ///
    /// Returns `false` (and does nothing) for any other variant.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<LogValue>) -> bool {
        let LogValue::Object(members) = self else {
            return false;
        };
        let key = key.into();
        let value = value.into();
        match members.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => members.push((key, value)),
        }
        true
    }

    pub fn is_null(&self) -> bool {
        matches!(self, LogValue::Null)
    }
}

impl From<Value> for LogValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => LogValue::Null,
            Value::Bool(b) => LogValue::Bool(b),
            Value::Number(n) => LogValue::Number(n),
            Value::String(s) => LogValue::String(s),
            Value::Array(items) => LogValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => map.into(),
        }
    }
}

impl From<Map<String, Value>> for LogValue {
    fn from(map: Map<String, Value>) -> Self {
        LogValue::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<&str> for LogValue {
    fn from(s: &str) -> Self {
        LogValue::String(s.to_string())
    }
}

impl From<String> for LogValue {
    fn from(s: String) -> Self {
        LogValue::String(s)
    }
}

impl From<bool> for LogValue {
    fn from(b: bool) -> Self {
        LogValue::Bool(b)
    }
}

impl From<i64> for LogValue {
    fn from(n: i64) -> Self {
        LogValue::Number(n.into())
    }
}

impl From<u64> for LogValue {
    fn from(n: u64) -> Self {
        LogValue::Number(n.into())
    }
}

impl From<f64> for LogValue {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(LogValue::Null, LogValue::Number)
    }
}

impl From<ErrorValue> for LogValue {
    fn from(err: ErrorValue) -> Self {
        LogValue::Error(Box::new(err))
    }
}

impl From<SharedValue> for LogValue {
    fn from(node: SharedValue) -> Self {
        LogValue::Shared(node)
    }
}

impl<T: Into<LogValue>> From<Vec<T>> for LogValue {
    fn from(items: Vec<T>) -> Self {
        LogValue::Array(items.into_iter().map(Into::into).collect())
    }
}

/// A structured error: message, stack text, optional cause and extra fields.
#[derive(Debug, Clone)]
pub struct ErrorValue {
    pub message: String,
    pub stack: String,
    pub cause: Option<LogValue>,
    pub fields: Vec<(String, LogValue)>,
}

impl ErrorValue {
    /// Create an error with the given message.
    ///
    /// The stack starts with `Error: <message>` and carries the current
    /// backtrace when backtraces are enabled (`RUST_BACKTRACE`).
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let stack = stack_text(&message, &Backtrace::capture());
        Self {
            message,
            stack,
            cause: None,
            fields: Vec::new(),
        }
    }

    /// Convert any error, following its `source()` chain into nested causes.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut value = ErrorValue::new(err.to_string());
        if let Some(source) = err.source() {
            value.cause = Some(ErrorValue::from_error(source).into());
        }
        value
    }

    /// Replace the stack text.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = stack.into();
        self
    }

    /// Attach a causing error (or any value).
    pub fn with_cause(mut self, cause: impl Into<LogValue>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Attach an extra field rendered next to `message` and `stack`.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<LogValue>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }
}

fn stack_text(message: &str, backtrace: &Backtrace) -> String {
    match backtrace.status() {
        BacktraceStatus::Captured => format!("Error: {message}\n{backtrace}"),
        _ => format!("Error: {message}"),
    }
}

/// A shared, mutable node. Cloning shares the node.
///
/// Shared nodes are the only way to build cyclic graphs: create the node,
/// then [`set`](SharedValue::set) content that refers back to it. Such a
/// cycle keeps itself alive; it is meant for short-lived diagnostic values.
#[derive(Clone)]
pub struct SharedValue(Arc<RwLock<LogValue>>);

impl SharedValue {
    pub fn new(value: impl Into<LogValue>) -> Self {
        Self(Arc::new(RwLock::new(value.into())))
    }

    /// Replace the node content.
    pub fn set(&self, value: impl Into<LogValue>) {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        *guard = value.into();
    }

    /// Mutate the node content in place.
    pub fn update(&self, f: impl FnOnce(&mut LogValue)) {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    /// Identity of the node, stable for its lifetime.
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Read the content. A poisoned lock still yields the last written value.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&LogValue) -> R) -> R {
        let guard = self.0.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}

impl fmt::Debug for SharedValue {
    // Never recurse: the content may contain this node.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedValue({:#x})", self.id())
    }
}
