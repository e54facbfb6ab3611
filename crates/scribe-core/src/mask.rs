//! Masking of sensitive fields.
//!
//! The message builder hands the fully merged message to a [`Masker`] before
//! null fields are dropped and the line is serialized.

use serde_json::{Map, Value};
use std::collections::HashSet;

/// Replacement for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Keys redacted by [`KeyMasker::default`].
pub const DEFAULT_MASKED_KEYS: &[&str] = &[
    "authorization",
    "cookie",
    "x-api-key",
    "x-auth-token",
    "password",
];

/// Rewrites a merged message before it is written.
pub trait Masker: Send + Sync + 'static {
    fn mask(&self, message: Map<String, Value>) -> Map<String, Value>;
}

impl<F> Masker for F
where
    F: Fn(Map<String, Value>) -> Map<String, Value> + Send + Sync + 'static,
{
    fn mask(&self, message: Map<String, Value>) -> Map<String, Value> {
        self(message)
    }
}

/// Leaves messages untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMasker;

impl Masker for NoopMasker {
    fn mask(&self, message: Map<String, Value>) -> Map<String, Value> {
        message
    }
}

/// Redacts values of the configured keys at any depth (case-insensitive).
#[derive(Clone, Debug)]
pub struct KeyMasker {
    keys: HashSet<String>,
}

impl Default for KeyMasker {
    fn default() -> Self {
        Self::new(DEFAULT_MASKED_KEYS.iter().copied())
    }
}

impl KeyMasker {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(|k| k.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Add a key to redact
    pub fn with_key(mut self, key: impl AsRef<str>) -> Self {
        self.keys.insert(key.as_ref().to_ascii_lowercase());
        self
    }

    fn is_masked(&self, key: &str) -> bool {
        self.keys.contains(&key.to_ascii_lowercase())
    }

    fn mask_value(&self, value: &mut Value) {
        match value {
            Value::Object(map) => self.mask_map(map),
            Value::Array(items) => items.iter_mut().for_each(|item| self.mask_value(item)),
            _ => {}
        }
    }

    fn mask_map(&self, map: &mut Map<String, Value>) {
        for (key, value) in map.iter_mut() {
            if self.is_masked(key) {
                *value = Value::String(REDACTED.to_string());
            } else {
                self.mask_value(value);
            }
        }
    }
}

impl Masker for KeyMasker {
    fn mask(&self, mut message: Map<String, Value>) -> Map<String, Value> {
        self.mask_map(&mut message);
        message
    }
}
