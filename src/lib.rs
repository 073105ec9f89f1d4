//! Kantan - file logger for applications
//!
//! Writes leveled, timestamped entries to per-run files, optionally under dated
//! directories, prunes entries past their retention window, and can forward calls on
//! selected levels to webhooks.
//!
//! ```no_run
//! use kantan::{args, Logger, LoggerConfig};
//! use serde_json::json;
//!
//! # fn main() -> kantan::Result<()> {
//! let logger = Logger::new(LoggerConfig {
//!     title: "api".into(),
//!     ..Default::default()
//! })?;
//! logger.info(["server started"])?;
//! logger.error(args![json!({"orderId": 42}), "payment declined"])?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagnostics;
pub mod entry;
pub mod error;
pub mod files;
pub mod format;
pub mod logger;
pub mod queue;
pub mod webhook;

pub use config::{LoggerConfig, WebhookMode, BASE_LEVEL};
pub use entry::{LogEntry, StructuredRecord};
pub use error::{ConfigError, LoggerError, Result};
pub use format::{LogValue, SharedValue};
pub use logger::{Level, LevelTable, Logger};
pub use webhook::{WebhookOutcome, WebhookTask};

/// Build an argument list of mixed types for a level call
///
/// Each expression is converted with `LogValue::from`.
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$($crate::LogValue::from($arg)),*]
    };
}
