//! Error types for the logger
//!
//! Only construction problems and failures on the hot write path surface as errors.
//! Pruning and webhook problems are reported through `tracing` instead.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, LoggerError>;

/// Errors returned by the logger
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The configuration could not be turned into a working logger
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Directory creation or file append failed
    #[error("{}", friendly_io_error_message(.source, .context, .path))]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoggerError {
    /// Wrap an IO error with the operation and the path it touched
    pub fn io(context: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        LoggerError::Io {
            context,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Category of the underlying IO error, if any
    pub fn disk_error_kind(&self) -> Option<DiskErrorKind> {
        match self {
            LoggerError::Io { source, .. } => Some(categorize_io_error(source)),
            LoggerError::Config(_) => None,
        }
    }
}

/// Invalid configuration, detected when a logger is constructed or a config file is read
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("log directory name must not be empty")]
    EmptyDirectory,

    #[error("log directory '{0}' must be a relative path without '..' components")]
    InvalidDirectory(String),

    #[error("log location '{0}' must not contain '..' components")]
    InvalidLocation(String),

    #[error("title '{0}' must not contain path separators")]
    InvalidTitle(String),

    #[error("level name '{0}' must be non-empty and free of whitespace and path separators")]
    InvalidLevel(String),

    #[error("webhook configured for unknown level '{0}'")]
    UnknownWebhookLevel(String),

    #[error("webhook url '{url}' for level '{level}' is not a valid http(s) url")]
    InvalidWebhookUrl { level: String, url: String },

    #[error("failed to build the webhook http client: {0}")]
    HttpClient(String),

    #[error("could not determine the application root directory: {0}")]
    AppRoot(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Categories of disk errors for user-friendly messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    /// Get a user-friendly message for this error kind
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "disk full, free space needed to keep logging",
            DiskErrorKind::PermissionDenied => "permission denied",
            DiskErrorKind::NotFound => "file or directory not found",
            DiskErrorKind::Other => "unexpected IO error",
        }
    }
}

/// Categorize an IO error into a user-friendly category
pub fn categorize_io_error(e: &std::io::Error) -> DiskErrorKind {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::WriteZero => DiskErrorKind::DiskFull,
        ErrorKind::PermissionDenied => DiskErrorKind::PermissionDenied,
        ErrorKind::NotFound => DiskErrorKind::NotFound,
        _ => {
            #[cfg(unix)]
            {
                if let Some(os_error) = e.raw_os_error() {
                    // ENOSPC = 28, EDQUOT = 122 on Linux and 69 on macOS
                    if os_error == libc::ENOSPC || os_error == libc::EDQUOT {
                        return DiskErrorKind::DiskFull;
                    }
                    if os_error == libc::EACCES {
                        return DiskErrorKind::PermissionDenied;
                    }
                }
            }
            DiskErrorKind::Other
        }
    }
}

fn friendly_io_error_message(e: &std::io::Error, context: &str, path: &Path) -> String {
    match categorize_io_error(e) {
        DiskErrorKind::Other => format!("{} {}: {}", context, path.display(), e),
        kind => format!("{} {}: {}", context, path.display(), kind.user_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_categorize_permission_denied() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(categorize_io_error(&err), DiskErrorKind::PermissionDenied);
    }

    #[cfg(unix)]
    #[test]
    fn test_categorize_enospc() {
        let err = io::Error::from_raw_os_error(libc::ENOSPC);
        assert_eq!(categorize_io_error(&err), DiskErrorKind::DiskFull);
    }

    #[test]
    fn test_io_error_display_is_friendly() {
        let err = LoggerError::io(
            "failed to append to",
            "/var/log/app/run.log",
            io::Error::new(io::ErrorKind::NotFound, "raw os text"),
        );
        let text = err.to_string();
        assert!(text.contains("/var/log/app/run.log"));
        assert!(text.contains("not found"));
        assert_eq!(err.disk_error_kind(), Some(DiskErrorKind::NotFound));
    }

    #[test]
    fn test_config_error_converts() {
        let err: LoggerError = ConfigError::EmptyDirectory.into();
        assert!(matches!(err, LoggerError::Config(ConfigError::EmptyDirectory)));
        assert_eq!(err.disk_error_kind(), None);
    }
}
