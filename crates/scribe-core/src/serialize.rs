//! Safe serializer.
//!
//! Renders any [`LogValue`] to text without ever failing: errors become
//! objects with explicit `message` and `stack`, references back to an
//! ancestor become [`CYCLE_MARKER`], and top-level strings pass through as-is.
//! Output size is bounded by [`MAX_SHARED_EXPANSIONS`] and [`MAX_DEPTH`].

use crate::value::{ErrorValue, LogValue};
use serde_json::{Map, Value};

/// Substituted for a reference to a node that is already being rendered.
pub const CYCLE_MARKER: &str = "~";

/// Render a value as log text.
///
/// Objects and arrays become compact JSON. A top-level string is returned
/// verbatim, without quotes.
pub fn serialize(value: &LogValue) -> String {
    if let LogValue::String(text) = value {
        return text.clone();
    }
    let json = to_json(value);
    serde_json::to_string(&json).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "falling back to debug rendering");
        format!("{json:?}")
    })
}

/// Render a JSON object map as one compact line.
pub fn serialize_map(map: &Map<String, Value>) -> String {
    serde_json::to_string(map).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "falling back to debug rendering");
        format!("{map:?}")
    })
}

/// Shared-node expansions allowed per call. Graphs that share a node along
/// many paths (diamonds) render each path; past this budget the remaining
/// shared nodes render as [`CYCLE_MARKER`].
pub const MAX_SHARED_EXPANSIONS: usize = 1024;

/// Nesting depth past which values render as [`CYCLE_MARKER`].
pub const MAX_DEPTH: usize = 128;

/// Convert a value to plain JSON, resolving errors and cycles.
pub fn to_json(value: &LogValue) -> Value {
    Walker {
        ancestors: Vec::new(),
        expansions: 0,
    }
    .render(value, 0)
}

struct Walker {
    ancestors: Vec<usize>,
    expansions: usize,
}

impl Walker {
    fn render(&mut self, value: &LogValue, depth: usize) -> Value {
        if depth > MAX_DEPTH {
            return marker();
        }
        let depth = depth + 1;
        match value {
            LogValue::Null => Value::Null,
            LogValue::Bool(b) => Value::Bool(*b),
            LogValue::Number(n) => Value::Number(n.clone()),
            LogValue::String(s) => Value::String(s.clone()),
            LogValue::Array(items) => Value::Array(
                items.iter().map(|item| self.render(item, depth)).collect(),
            ),
            LogValue::Object(members) => {
                let mut map = Map::with_capacity(members.len());
                for (key, member) in members {
                    map.insert(key.clone(), self.render(member, depth));
                }
                Value::Object(map)
            }
            LogValue::Error(err) => self.render_error(err, depth),
            LogValue::Shared(node) => {
                let id = node.id();
                if self.ancestors.contains(&id) || self.expansions >= MAX_SHARED_EXPANSIONS {
                    return marker();
                }
                self.expansions += 1;
                self.ancestors.push(id);
                let rendered = node.read(|inner| self.render(inner, depth));
                self.ancestors.pop();
                rendered
            }
        }
    }

    // Extra fields first so that `message` and `stack` always win.
    fn render_error(&mut self, err: &ErrorValue, depth: usize) -> Value {
        let mut map = Map::with_capacity(err.fields.len() + 3);
        for (key, field) in &err.fields {
            map.insert(key.clone(), self.render(field, depth));
        }
        map.insert("message".to_string(), Value::String(err.message.clone()));
        map.insert("stack".to_string(), Value::String(err.stack.clone()));
        if let Some(cause) = &err.cause {
            map.insert("cause".to_string(), self.render(cause, depth));
        }
        Value::Object(map)
    }
}

fn marker() -> Value {
    Value::String(CYCLE_MARKER.to_string())
}
