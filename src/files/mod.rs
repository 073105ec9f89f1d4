//! Log file locations, appending and retention
//!
//! Provides the per-run directory layout, the file sink the delivery queue drains into,
//! and pruning of entries older than the retention window.

mod file_writer;
mod paths;
mod retention;

pub use file_writer::FileSink;
pub use paths::{
    date_stamp, ensure_directory, time_stamp, LogPaths, DATE_STAMP_FORMAT, TIME_STAMP_FORMAT,
};
pub use retention::{retention_cutoff, PruneStats, Pruner, DEFAULT_RETENTION_DAYS};
