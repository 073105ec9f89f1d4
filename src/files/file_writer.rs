//! Appends drained entries to their log files

use std::fs::OpenOptions;
use std::io::Write;

use crate::entry::LogEntry;
use crate::error::{LoggerError, Result};
use crate::queue::EntrySink;

use super::paths::LogPaths;

/// Sink that appends each entry to `<active_dir>/<title>.<ext>`
#[derive(Debug, Clone)]
pub struct FileSink {
    paths: LogPaths,
    echo_to_console: bool,
}

impl FileSink {
    pub fn new(paths: LogPaths, echo_to_console: bool) -> Self {
        Self {
            paths,
            echo_to_console,
        }
    }

    pub fn paths(&self) -> &LogPaths {
        &self.paths
    }
}

impl EntrySink for FileSink {
    fn write_entry(&mut self, entry: &LogEntry) -> Result<()> {
        // The directory may have been pruned or removed since the last write
        self.paths.ensure_active_dir()?;

        let path = self.paths.file_path(&entry.file_name());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LoggerError::io("failed to open log file", &path, e))?;
        file.write_all(entry.payload().as_bytes())
            .map_err(|e| LoggerError::io("failed to append to log file", &path, e))?;

        if self.echo_to_console {
            println!("{}", entry.echo_line());
        }
        Ok(())
    }
}
