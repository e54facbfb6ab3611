//! Steps shared by the request and response loggers.

use crate::backend::{dispatch, LogBackend};
use crate::coerce::{coerce, TargetType};
use crate::env::EnvSnapshot;
use crate::level::LogLevel;
use crate::message::{LogMessage, MessageBuilder};
use crate::select::select_mut;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Appended to properties cut by a length limit.
pub const ELLIPSIS: &str = "...";

pub(crate) struct Pipeline {
    pub(crate) builder: MessageBuilder,
    pub(crate) backend: Arc<dyn LogBackend>,
    pub(crate) env: EnvSnapshot,
    pub(crate) props_to_parse: Vec<(String, TargetType)>,
    pub(crate) prop_max_length: Vec<(String, usize)>,
}

impl Pipeline {
    /// Coercion, then per-property length limits.
    pub(crate) fn refine(&self, fields: Map<String, Value>) -> Map<String, Value> {
        let fields = if self.props_to_parse.is_empty() {
            fields
        } else {
            coerce(&fields, &self.props_to_parse)
        };
        if self.prop_max_length.is_empty() {
            return fields;
        }
        let mut root = Value::Object(fields);
        for (path, max) in &self.prop_max_length {
            if let Some(slot) = select_mut(&mut root, path) {
                if let Some(cut) = truncate(slot, *max) {
                    *slot = Value::String(cut);
                }
            }
        }
        match root {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    pub(crate) fn env_fields<S: AsRef<str>>(&self, props: &[S]) -> Option<Value> {
        self.env.pick(props)
    }

    pub(crate) fn emit(&self, message: &LogMessage, level: LogLevel) {
        dispatch(&*self.backend, level, &message.to_line());
    }
}

/// Text longer than `max` characters, cut and suffixed; `None` when it fits.
fn truncate(value: &Value, max: usize) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() <= max {
        return None;
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push_str(ELLIPSIS);
    Some(cut)
}
