use scribe_core::{LogBackend, LogLevel};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// One line received by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedLine {
    pub level: LogLevel,
    pub line: String,
}

impl RecordedLine {
    /// The line parsed as JSON. Panics if it is not JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.line)
            .unwrap_or_else(|err| panic!("log line is not JSON ({err}): {}", self.line))
    }
}

/// Log backend that records every line. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    lines: Arc<Mutex<Vec<RecordedLine>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: LogLevel, line: &str) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.push(RecordedLine {
            level,
            line: line.to_string(),
        });
    }

    /// All recorded lines, oldest first
    pub fn lines(&self) -> Vec<RecordedLine> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// All recorded lines parsed as JSON
    pub fn messages(&self) -> Vec<Value> {
        self.lines().iter().map(RecordedLine::json).collect()
    }

    /// Recorded messages whose `from` field equals `from`
    pub fn messages_from(&self, from: &str) -> Vec<Value> {
        self.messages()
            .into_iter()
            .filter(|m| m.get("from").and_then(Value::as_str) == Some(from))
            .collect()
    }

    /// Levels of all recorded lines
    pub fn levels(&self) -> Vec<LogLevel> {
        self.lines().into_iter().map(|l| l.level).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl LogBackend for RecordingBackend {
    fn info(&self, line: &str) {
        self.push(LogLevel::Info, line);
    }

    fn warn(&self, line: &str) {
        self.push(LogLevel::Warn, line);
    }

    fn error(&self, line: &str) {
        self.push(LogLevel::Error, line);
    }
}
