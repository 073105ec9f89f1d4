//! Log retention management
//!
//! Walks the log root and removes entries older than a cutoff. The active directory is
//! never removed, only its stale contents. Every failure is reported and skipped.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

/// Default retention period in days
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Cutoff for a retention period measured back from now
pub fn retention_cutoff(retention_days: u64) -> SystemTime {
    let retention = Duration::from_secs(retention_days.saturating_mul(SECS_PER_DAY));
    SystemTime::now()
        .checked_sub(retention)
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// What a prune pass removed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneStats {
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub links_removed: usize,
    /// Stat, read or remove operations that failed and were skipped
    pub failures: usize,
}

impl PruneStats {
    pub fn total_removed(&self) -> usize {
        self.files_removed + self.dirs_removed + self.links_removed
    }
}

/// Recursive retention sweep over one log root
#[derive(Debug, Clone)]
pub struct Pruner {
    cutoff: SystemTime,
    active_dir: PathBuf,
    echo_to_console: bool,
}

impl Pruner {
    pub fn new(cutoff: SystemTime, active_dir: impl Into<PathBuf>) -> Self {
        Self {
            cutoff,
            active_dir: active_dir.into(),
            echo_to_console: false,
        }
    }

    /// Also print failures to stderr
    pub fn echo_to_console(mut self, echo: bool) -> Self {
        self.echo_to_console = echo;
        self
    }

    /// Prune everything under `log_root` that is older than the cutoff
    ///
    /// A missing root is not an error.
    pub fn prune(&self, log_root: &Path) -> PruneStats {
        let mut stats = PruneStats::default();
        if log_root.exists() {
            self.prune_dir(log_root, &mut stats);
        }
        debug!(
            root = %log_root.display(),
            removed = stats.total_removed(),
            failures = stats.failures,
            "Retention sweep finished"
        );
        stats
    }

    fn prune_dir(&self, dir: &Path, stats: &mut PruneStats) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.report(stats, "readdir failed", dir, &e);
                return;
            }
        };

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    self.report(stats, "readdir failed", dir, &e);
                    continue;
                }
            };
            self.prune_entry(&path, stats);
        }
    }

    fn prune_entry(&self, path: &Path, stats: &mut PruneStats) {
        // symlink_metadata does not follow links
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.report(stats, "stat failed", path, &e);
                return;
            }
        };
        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                self.report(stats, "stat failed", path, &e);
                return;
            }
        };
        let stale = modified < self.cutoff;
        let file_type = metadata.file_type();

        if file_type.is_symlink() {
            if stale {
                match fs::remove_file(path) {
                    Ok(()) => stats.links_removed += 1,
                    Err(e) => self.report(stats, "unlink symlink failed", path, &e),
                }
            }
        } else if file_type.is_dir() {
            if path == self.active_dir {
                self.prune_dir(path, stats);
            } else if stale {
                match fs::remove_dir_all(path) {
                    Ok(()) => stats.dirs_removed += 1,
                    Err(e) => self.report(stats, "rm dir failed", path, &e),
                }
            } else {
                self.prune_dir(path, stats);
                // Not empty or in use: keep it
                if fs::remove_dir(path).is_ok() {
                    stats.dirs_removed += 1;
                }
            }
        } else if stale {
            match fs::remove_file(path) {
                Ok(()) => stats.files_removed += 1,
                Err(e) => self.report(stats, "unlink failed", path, &e),
            }
        }
    }

    fn report(&self, stats: &mut PruneStats, what: &str, path: &Path, error: &std::io::Error) {
        stats.failures += 1;
        warn!(path = %path.display(), error = %error, "Retention sweep: {}", what);
        if self.echo_to_console {
            eprintln!("prune: {} for {}: {}", what, path.display(), error);
        }
    }
}
