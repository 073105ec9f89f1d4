//! Queued log entries and their structured form

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Extension of plain text log files
pub const TEXT_EXTENSION: &str = "log";

/// Extension of JSON-lines log files
pub const JSONL_EXTENSION: &str = "jsonl";

/// Machine-readable form of one entry, written as one JSON line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredRecord {
    pub level: String,
    /// Milliseconds since the Unix epoch
    pub time: i64,
    pub channel: String,
    pub messages: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage_bytes: Option<u64>,
}

/// One unit of queued output
///
/// Entries are immutable once built; the queue only moves them around.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    title: String,
    text: String,
    record: Option<StructuredRecord>,
    raw_args: Option<Vec<Value>>,
}

impl LogEntry {
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        record: Option<StructuredRecord>,
        raw_args: Option<Vec<Value>>,
    ) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            record,
            raw_args,
        }
    }

    /// Entry with only a text line
    pub fn text_only(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(title, text, None, None)
    }

    /// Destination file basename, without extension
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn record(&self) -> Option<&StructuredRecord> {
        self.record.as_ref()
    }

    pub fn raw_args(&self) -> Option<&[Value]> {
        self.raw_args.as_deref()
    }

    /// File extension, decided solely by whether a structured record is present
    pub fn extension(&self) -> &'static str {
        if self.record.is_some() {
            JSONL_EXTENSION
        } else {
            TEXT_EXTENSION
        }
    }

    /// Name of the file this entry is appended to
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.title, self.extension())
    }

    /// Bytes appended to the file: one line, newline-terminated
    pub fn payload(&self) -> String {
        let line = match &self.record {
            Some(record) => serde_json::to_string(record).unwrap_or_else(|_| self.text.clone()),
            None => self.text.clone(),
        };
        format!("{}\n", line)
    }

    /// What is printed when console echo is on
    pub fn echo_line(&self) -> String {
        match &self.raw_args {
            Some(args) => args
                .iter()
                .map(|arg| match arg {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" "),
            None => self.text.clone(),
        }
    }
}
