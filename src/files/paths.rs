//! Log root and active directory resolution
//!
//! The active directory is computed once, from the construction time. A process that
//! runs past midnight keeps writing into the directory of the day it started.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::config::LoggerConfig;
use crate::error::{ConfigError, LoggerError, Result};

/// Date stamp used for dated directories and titles (`mm-dd-yy`)
pub const DATE_STAMP_FORMAT: &str = "%m-%d-%y";

/// Time stamp used for titles and line prefixes (`HH.MM.ss.mmm`)
pub const TIME_STAMP_FORMAT: &str = "%H.%M.%S%.3f";

pub fn date_stamp(at: &DateTime<Local>) -> String {
    at.format(DATE_STAMP_FORMAT).to_string()
}

pub fn time_stamp(at: &DateTime<Local>) -> String {
    at.format(TIME_STAMP_FORMAT).to_string()
}

/// Resolved locations for one logger instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    log_root: PathBuf,
    active_dir: PathBuf,
}

impl LogPaths {
    /// Resolve `<app_root>/<location><directory>` and the active directory beneath it
    pub fn resolve(
        config: &LoggerConfig,
        started: &DateTime<Local>,
    ) -> std::result::Result<Self, ConfigError> {
        let app_root = match &config.app_root {
            Some(root) => expand_tilde(&root.to_string_lossy()),
            None => std::env::current_dir().map_err(|e| ConfigError::AppRoot(e.to_string()))?,
        };
        let relative = format!("{}{}", shellexpand::tilde(&config.location), config.directory);
        let log_root = app_root.join(relative);

        Ok(Self::from_root(
            log_root,
            config.use_date_directories,
            started,
        ))
    }

    /// Derive the active directory for an already known log root
    pub fn from_root(
        log_root: impl Into<PathBuf>,
        use_date_directories: bool,
        started: &DateTime<Local>,
    ) -> Self {
        let log_root = log_root.into();
        let active_dir = if use_date_directories {
            log_root.join(date_stamp(started))
        } else {
            log_root.clone()
        };
        Self {
            log_root,
            active_dir,
        }
    }

    pub fn log_root(&self) -> &Path {
        &self.log_root
    }

    /// Directory entries are currently written into
    pub fn active_dir(&self) -> &Path {
        &self.active_dir
    }

    /// Full path of a file inside the active directory
    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.active_dir.join(file_name)
    }

    /// Create the active directory (and the log root above it) if missing
    pub fn ensure_active_dir(&self) -> Result<()> {
        ensure_directory(&self.active_dir)
    }
}

/// Create a directory and its parents; succeeds if it already exists
pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| LoggerError::io("failed to create log directory", path, e))
}

fn expand_tilde(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap()
    }

    fn config_in(temp_dir: &TempDir) -> LoggerConfig {
        LoggerConfig {
            app_root: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_stamps() {
        assert_eq!(date_stamp(&started()), "03-07-26");
        assert_eq!(time_stamp(&started()), "09.05.01.000");
    }

    #[test]
    fn test_resolve_with_date_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LogPaths::resolve(&config_in(&temp_dir), &started()).unwrap();

        assert_eq!(paths.log_root(), temp_dir.path().join("logs"));
        assert_eq!(paths.active_dir(), temp_dir.path().join("logs").join("03-07-26"));
        assert_eq!(
            paths.file_path("api.log"),
            temp_dir.path().join("logs/03-07-26/api.log")
        );
    }

    #[test]
    fn test_resolve_without_date_directories() {
        let temp_dir = TempDir::new().unwrap();
        let config = LoggerConfig {
            use_date_directories: false,
            ..config_in(&temp_dir)
        };
        let paths = LogPaths::resolve(&config, &started()).unwrap();
        assert_eq!(paths.active_dir(), paths.log_root());
    }

    #[test]
    fn test_location_is_a_plain_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let config = LoggerConfig {
            location: "var/".to_string(),
            directory: "app-logs".to_string(),
            ..config_in(&temp_dir)
        };
        let paths = LogPaths::resolve(&config, &started()).unwrap();
        assert_eq!(paths.log_root(), temp_dir.path().join("var/app-logs"));
    }

    #[test]
    fn test_ensure_active_dir_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LogPaths::resolve(&config_in(&temp_dir), &started()).unwrap();

        paths.ensure_active_dir().unwrap();
        paths.ensure_active_dir().unwrap();
        assert!(paths.active_dir().is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_directory_reports_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = ensure_directory(&blocker.join("logs")).unwrap_err();
        assert!(matches!(err, LoggerError::Io { .. }));
    }
}
