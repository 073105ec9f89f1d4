//! Configuration for a logger instance
//!
//! A `LoggerConfig` is fixed once a [`Logger`](crate::Logger) is built from it. Every field
//! has a serde default, so a partial TOML file is a valid configuration.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::files::DEFAULT_RETENTION_DAYS;

/// Name of the base level that is always available
pub const BASE_LEVEL: &str = "log";

/// How webhook calls interact with the file queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookMode {
    /// Entries are written immediately; the webhook runs in the background and its
    /// outcome only reaches the diagnostic channel
    #[default]
    Detached,
    /// Delivery pauses until the webhook answers, then the response line is written
    /// directly before the original entry
    Inline,
}

impl std::str::FromStr for WebhookMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "detached" => Ok(WebhookMode::Detached),
            "inline" => Ok(WebhookMode::Inline),
            _ => Err(format!("Unknown webhook mode: {}", s)),
        }
    }
}

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Base name of the log files for this run
    pub title: String,

    /// Prefix joined in front of `directory`, relative to the application root
    pub location: String,

    /// Name of the log root directory (default: "logs")
    pub directory: String,

    /// Application root the log root is resolved against (default: working directory)
    pub app_root: Option<PathBuf>,

    /// Configured level names; the base "log" level is always appended
    pub levels: Vec<String>,

    /// Append the construction date and time to the file title
    pub use_time_in_title: bool,

    /// Write into a `mm-dd-yy` subdirectory of the log root
    pub use_date_directories: bool,

    /// Entries older than this many days are pruned at construction
    pub days_till_delete: u64,

    /// Indent structured arguments with two spaces
    pub pretty_json: bool,

    /// Write string arguments verbatim instead of JSON-escaped
    pub pretty_text: bool,

    /// Include resident memory in each line
    pub show_memory_usage: bool,

    /// Print every written entry to stdout
    pub echo_to_console: bool,

    /// Write one JSON record per line to `.jsonl` files instead of text lines
    pub structured_output: bool,

    /// Whether webhook calls pause the queue
    pub webhook_mode: WebhookMode,

    /// Timeout for a single webhook attempt (default: 10)
    pub webhook_timeout_secs: u64,

    /// Webhook URL per level
    pub level_webhooks: BTreeMap<String, String>,
}

fn default_levels() -> Vec<String> {
    ["success", "verbose", "info", "warning", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            location: String::new(),
            directory: "logs".to_string(),
            app_root: None,
            levels: default_levels(),
            use_time_in_title: true,
            use_date_directories: true,
            days_till_delete: DEFAULT_RETENTION_DAYS,
            pretty_json: true,
            pretty_text: true,
            show_memory_usage: false,
            echo_to_console: false,
            structured_output: false,
            webhook_mode: WebhookMode::Detached,
            webhook_timeout_secs: 10,
            level_webhooks: BTreeMap::new(),
        }
    }
}

impl LoggerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from a TOML file, or return the default if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Level names in configuration order, deduplicated, with the base level last
    pub fn effective_levels(&self) -> Vec<String> {
        let mut levels: Vec<String> = Vec::with_capacity(self.levels.len() + 1);
        for level in &self.levels {
            if !levels.contains(level) && level != BASE_LEVEL {
                levels.push(level.clone());
            }
        }
        levels.push(BASE_LEVEL.to_string());
        levels
    }

    /// Check the configuration for values that cannot produce a working logger
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directory.trim().is_empty() {
            return Err(ConfigError::EmptyDirectory);
        }
        let directory = Path::new(&self.directory);
        if directory.is_absolute() || has_parent_component(directory) {
            return Err(ConfigError::InvalidDirectory(self.directory.clone()));
        }
        if has_parent_component(Path::new(&self.location)) {
            return Err(ConfigError::InvalidLocation(self.location.clone()));
        }
        if self.title.contains(['/', '\\']) {
            return Err(ConfigError::InvalidTitle(self.title.clone()));
        }

        for level in &self.levels {
            if !is_valid_level_name(level) {
                return Err(ConfigError::InvalidLevel(level.clone()));
            }
        }

        let levels = self.effective_levels();
        for (level, url) in &self.level_webhooks {
            if !levels.contains(level) {
                return Err(ConfigError::UnknownWebhookLevel(level.clone()));
            }
            let valid = reqwest::Url::parse(url)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::InvalidWebhookUrl {
                    level: level.clone(),
                    url: url.clone(),
                });
            }
        }

        Ok(())
    }

    /// Webhook URL configured for a level
    pub fn webhook_for(&self, level: &str) -> Option<&str> {
        self.level_webhooks.get(level).map(String::as_str)
    }
}

fn has_parent_component(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

fn is_valid_level_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\')
}
