//! Type coercion of selected properties.

use crate::error::ConfigError;
use crate::select::select_mut;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Custom conversion function.
pub type ConvertFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Target type of a coercion rule.
#[derive(Clone)]
pub enum TargetType {
    /// Numbers and booleans to text, arrays and objects to compact JSON.
    String,
    /// Numeric strings parsed, booleans to `1`/`0`.
    Number,
    /// Truthiness: `false`, `0`, `""` and `null` are false.
    Boolean,
    Custom(ConvertFn),
}

impl TargetType {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        TargetType::Custom(Arc::new(f))
    }

    /// Convert a value. `None` means the value stays as it is.
    pub fn convert(&self, value: &Value) -> Option<Value> {
        match self {
            TargetType::String => Some(Value::String(to_text(value))),
            TargetType::Number => to_number(value).map(Value::Number),
            TargetType::Boolean => Some(Value::Bool(truthy(value))),
            TargetType::Custom(f) => Some(f(value)),
        }
    }
}

impl fmt::Debug for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::String => f.write_str("String"),
            TargetType::Number => f.write_str("Number"),
            TargetType::Boolean => f.write_str("Boolean"),
            TargetType::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

impl FromStr for TargetType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(TargetType::String),
            "number" => Ok(TargetType::Number),
            "boolean" | "bool" => Ok(TargetType::Boolean),
            _ => Err(ConfigError::UnknownType(s.to_string())),
        }
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn to_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::Bool(b) => Some(Number::from(u8::from(*b))),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Some(Number::from(0));
            }
            if let Ok(n) = s.parse::<i64>() {
                return Some(Number::from(n));
            }
            s.parse::<f64>().ok().and_then(Number::from_f64)
        }
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Apply coercion rules to a copy of `properties`.
///
/// Rules whose path does not resolve are skipped. Falsy values such as `0`
/// or `""` still resolve and are converted.
pub fn coerce(properties: &Map<String, Value>, rules: &[(String, TargetType)]) -> Map<String, Value> {
    let mut root = Value::Object(properties.clone());
    for (path, target) in rules {
        if let Some(slot) = select_mut(&mut root, path) {
            if let Some(converted) = target.convert(slot) {
                *slot = converted;
            }
        }
    }
    match root {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
