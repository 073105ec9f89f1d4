//! Message formatting
//!
//! Turns a level label and an argument list into the text line written to `.log` files,
//! and into the structured record written to `.jsonl` files.

mod memory;
mod value;

pub use memory::{format_memory, resident_memory_bytes};
pub use value::{snapshot, LogValue, SeenSet, SharedValue};

use chrono::{DateTime, Local};

use crate::config::LoggerConfig;
use crate::entry::StructuredRecord;
use crate::files::{date_stamp, time_stamp, TIME_STAMP_FORMAT};

/// Line timestamp when entries live in dated directories
const LINE_TIME_FORMAT: &str = TIME_STAMP_FORMAT;

/// Line timestamp when all runs share one directory
const LINE_DATE_TIME_FORMAT: &str = "%m-%d-%y %H.%M.%S%.3f";

/// Title and text of one rendered call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub title: String,
    pub text: String,
}

/// Renders arguments according to the logger configuration
#[derive(Debug, Clone)]
pub struct Formatter {
    title: String,
    channel: String,
    line_format: &'static str,
    pretty_json: bool,
    pretty_text: bool,
    show_memory_usage: bool,
}

impl Formatter {
    pub fn new(config: &LoggerConfig, started: &DateTime<Local>) -> Self {
        Self {
            title: effective_title(config, started),
            channel: config.title.clone(),
            line_format: if config.use_date_directories {
                LINE_TIME_FORMAT
            } else {
                LINE_DATE_TIME_FORMAT
            },
            pretty_json: config.pretty_json,
            pretty_text: config.pretty_text,
            show_memory_usage: config.show_memory_usage,
        }
    }

    /// Basename of the files this run writes
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn line_timestamp(&self, at: &DateTime<Local>) -> String {
        at.format(self.line_format).to_string()
    }

    /// Render `[<timestamp>] [(<memory>)] <label> <args...>`
    pub fn render(&self, label: &str, args: &[LogValue], at: &DateTime<Local>) -> RenderedLine {
        let mut text = format!("[{}] ", self.line_timestamp(at));
        if self.show_memory_usage {
            if let Some(bytes) = resident_memory_bytes() {
                text.push_str(&format_memory(bytes));
                text.push(' ');
            }
        }
        text.push_str(&self.render_message(Some(label), args));
        RenderedLine {
            title: self.title.clone(),
            text,
        }
    }

    /// Join rendered arguments with single spaces, except after a trailing newline
    pub fn render_message(&self, label: Option<&str>, args: &[LogValue]) -> String {
        let mut text = String::new();
        let pieces = label
            .map(|l| self.render_str(l))
            .into_iter()
            .chain(args.iter().map(|arg| self.render_arg(arg)));
        for piece in pieces {
            if !text.ends_with('\n') {
                text.push(' ');
            }
            text.push_str(&piece);
        }
        text.trim().to_string()
    }

    fn render_arg(&self, arg: &LogValue) -> String {
        match arg {
            LogValue::String(s) => self.render_str(s),
            LogValue::Null => "undefined".to_string(),
            other => {
                let json = other.to_json();
                let rendered = if self.pretty_json {
                    serde_json::to_string_pretty(&json)
                } else {
                    serde_json::to_string(&json)
                };
                rendered.unwrap_or_default()
            }
        }
    }

    fn render_str(&self, s: &str) -> String {
        if self.pretty_text {
            return s.to_string();
        }
        let encoded = serde_json::Value::String(s.to_string()).to_string();
        encoded
            .strip_prefix('"')
            .and_then(|e| e.strip_suffix('"'))
            .unwrap_or(encoded.as_str())
            .to_string()
    }

    /// Structured form of one call; every argument is snapshotted in order
    pub fn build_record(
        &self,
        level: &str,
        args: &[LogValue],
        at: &DateTime<Local>,
    ) -> StructuredRecord {
        StructuredRecord {
            level: level.to_string(),
            time: at.timestamp_millis(),
            channel: self.channel.clone(),
            messages: snapshot(args),
            memory_usage_bytes: if self.show_memory_usage {
                resident_memory_bytes()
            } else {
                None
            },
        }
    }

    /// Separator written at the start of a run that shares its file with earlier runs
    pub fn marker_text(&self, at: &DateTime<Local>) -> String {
        format!(
            "---------- ========== [{}] ========== ----------",
            self.line_timestamp(at)
        )
    }
}

/// Configured title, plus the construction date and time when requested or when the
/// title is empty
pub fn effective_title(config: &LoggerConfig, started: &DateTime<Local>) -> String {
    if config.use_time_in_title || config.title.is_empty() {
        format!(
            "{} {} {}",
            config.title,
            date_stamp(started),
            time_stamp(started)
        )
        .trim()
        .to_string()
    } else {
        config.title.clone()
    }
}
