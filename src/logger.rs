//! Level dispatch
//!
//! A [`Logger`] owns one run's configuration, directory layout and delivery queue. Each
//! level call renders an entry, queues it, and optionally starts a webhook call.
//!
//! Level names are resolved against a table built at construction. Names that are not
//! configured behave like the base `log` level.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use crate::config::{LoggerConfig, WebhookMode, BASE_LEVEL};
use crate::entry::LogEntry;
use crate::error::Result;
use crate::files::{retention_cutoff, FileSink, LogPaths, PruneStats, Pruner};
use crate::format::{snapshot, Formatter, LogValue};
use crate::queue::{DeliveryQueue, HoldId};
use crate::webhook::{WebhookClient, WebhookOutcome, WebhookRequest, WebhookTask};

/// Label of the line that carries a webhook response in inline mode
const WEBHOOK_LABEL: &str = "WEBHOOK:";

/// A configured level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    name: String,
    label: String,
    webhook: Option<String>,
}

impl Level {
    fn new(name: &str, webhook: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            label: format!("{}:", name.to_uppercase()),
            webhook: webhook.map(String::from),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upper-cased label that starts each text line, e.g. `INFO:`
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn webhook(&self) -> Option<&str> {
        self.webhook.as_deref()
    }
}

/// Dispatch table from level names to levels
#[derive(Debug, Clone)]
pub struct LevelTable {
    levels: HashMap<String, Level>,
    order: Vec<String>,
    base: Level,
}

impl LevelTable {
    pub fn from_config(config: &LoggerConfig) -> Self {
        let order = config.effective_levels();
        let levels = order
            .iter()
            .filter(|name| name.as_str() != BASE_LEVEL)
            .map(|name| (name.clone(), Level::new(name, config.webhook_for(name))))
            .collect();
        Self {
            levels,
            order,
            base: Level::new(BASE_LEVEL, config.webhook_for(BASE_LEVEL)),
        }
    }

    /// Look up a level, falling back to the base level for unknown names
    pub fn resolve(&self, name: &str) -> &Level {
        self.levels.get(name).unwrap_or(&self.base)
    }

    pub fn contains(&self, name: &str) -> bool {
        name == BASE_LEVEL || self.levels.contains_key(name)
    }

    /// Level names in configuration order, base level last
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[derive(Debug)]
struct Delivery {
    queue: DeliveryQueue,
    sink: FileSink,
}

#[derive(Debug)]
struct Inner {
    config: LoggerConfig,
    started: DateTime<Local>,
    paths: LogPaths,
    formatter: Formatter,
    levels: LevelTable,
    webhooks: Option<WebhookClient>,
    prune_stats: PruneStats,
    delivery: Mutex<Delivery>,
}

/// File logger for one run
///
/// Cloning is cheap and every clone writes through the same queue.
#[derive(Debug, Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

impl Logger {
    /// Validate `config`, prepare the directories, prune expired entries and open the run
    pub fn new(config: LoggerConfig) -> Result<Self> {
        config.validate()?;

        let started = Local::now();
        let paths = LogPaths::resolve(&config, &started)?;
        paths.ensure_active_dir()?;

        let prune_stats = Pruner::new(retention_cutoff(config.days_till_delete), paths.active_dir())
            .echo_to_console(config.echo_to_console)
            .prune(paths.log_root());
        if prune_stats.total_removed() > 0 {
            info!(
                removed = prune_stats.total_removed(),
                root = %paths.log_root().display(),
                "Removed expired log entries"
            );
        }

        let webhooks = if config.level_webhooks.is_empty() {
            None
        } else {
            Some(WebhookClient::new(Duration::from_secs(
                config.webhook_timeout_secs,
            ))?)
        };

        let inner = Inner {
            formatter: Formatter::new(&config, &started),
            levels: LevelTable::from_config(&config),
            delivery: Mutex::new(Delivery {
                queue: DeliveryQueue::new(),
                sink: FileSink::new(paths.clone(), config.echo_to_console),
            }),
            webhooks,
            prune_stats,
            paths,
            started,
            config,
        };
        let logger = Self {
            inner: Arc::new(inner),
        };
        logger.write_start_marker()?;

        debug!(
            dir = %logger.active_dir().display(),
            title = logger.title(),
            "Logger ready"
        );
        Ok(logger)
    }

    /// Separate this run from earlier ones when runs share a file
    fn write_start_marker(&self) -> Result<()> {
        let config = &self.inner.config;
        if (config.use_time_in_title && config.use_date_directories) || config.structured_output {
            return Ok(());
        }
        let formatter = &self.inner.formatter;
        let marker = LogEntry::text_only(formatter.title(), formatter.marker_text(&Local::now()));
        self.inner.enqueue(marker)
    }

    /// Log `args` at the named level
    ///
    /// Returns the pending webhook call when one was started. Dropping it does not
    /// cancel the call.
    pub fn level<I>(&self, name: &str, args: I) -> Result<Option<WebhookTask>>
    where
        I: IntoIterator,
        I::Item: Into<LogValue>,
    {
        let args: Vec<LogValue> = args.into_iter().map(Into::into).collect();
        let inner = &self.inner;
        let level = inner.levels.resolve(name);
        let entry = inner.build_entry(level, level.label(), &args, &Local::now());

        let request = level
            .webhook()
            .and_then(|url| WebhookRequest::build(url, level.name(), &args, &inner.formatter));
        let (Some(request), Some(client)) = (request, inner.webhooks.as_ref()) else {
            inner.enqueue(entry)?;
            return Ok(None);
        };

        let echo = inner.config.echo_to_console;
        let task = match inner.config.webhook_mode {
            WebhookMode::Detached => {
                inner.enqueue(entry)?;
                client.spawn(request, move |outcome| report_outcome(outcome, echo))
            }
            WebhookMode::Inline => {
                let id = inner.delivery().queue.hold(entry);
                let held = HeldEntry {
                    inner: Some(Arc::clone(inner)),
                    id,
                    level: level.name().to_string(),
                };
                client.spawn(request, move |outcome| {
                    report_outcome(outcome, echo);
                    held.complete(outcome);
                })
            }
        };
        Ok(Some(task))
    }

    pub fn success<I>(&self, args: I) -> Result<Option<WebhookTask>>
    where
        I: IntoIterator,
        I::Item: Into<LogValue>,
    {
        self.level("success", args)
    }

    pub fn verbose<I>(&self, args: I) -> Result<Option<WebhookTask>>
    where
        I: IntoIterator,
        I::Item: Into<LogValue>,
    {
        self.level("verbose", args)
    }

    pub fn info<I>(&self, args: I) -> Result<Option<WebhookTask>>
    where
        I: IntoIterator,
        I::Item: Into<LogValue>,
    {
        self.level("info", args)
    }

    pub fn warning<I>(&self, args: I) -> Result<Option<WebhookTask>>
    where
        I: IntoIterator,
        I::Item: Into<LogValue>,
    {
        self.level("warning", args)
    }

    pub fn error<I>(&self, args: I) -> Result<Option<WebhookTask>>
    where
        I: IntoIterator,
        I::Item: Into<LogValue>,
    {
        self.level("error", args)
    }

    pub fn log<I>(&self, args: I) -> Result<Option<WebhookTask>>
    where
        I: IntoIterator,
        I::Item: Into<LogValue>,
    {
        self.level(BASE_LEVEL, args)
    }

    /// Hold back writes until the matching [`resume`](Self::resume)
    pub fn pause(&self) {
        self.inner.delivery().queue.pause();
    }

    /// Release one pause, writing held entries once none remain
    pub fn resume(&self) -> Result<()> {
        let mut delivery = self.inner.delivery();
        let Delivery { queue, sink } = &mut *delivery;
        queue.resume(sink)
    }

    pub fn is_paused(&self) -> bool {
        self.inner.delivery().queue.is_paused()
    }

    /// Entries queued but not yet written
    pub fn pending(&self) -> usize {
        self.inner.delivery().queue.pending()
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.inner.config
    }

    /// Construction time; fixes the active directory and the title stamp
    pub fn started(&self) -> DateTime<Local> {
        self.inner.started
    }

    /// Basename of the files this run writes
    pub fn title(&self) -> &str {
        self.inner.formatter.title()
    }

    pub fn log_root(&self) -> &Path {
        self.inner.paths.log_root()
    }

    pub fn active_dir(&self) -> &Path {
        self.inner.paths.active_dir()
    }

    pub fn levels(&self) -> &LevelTable {
        &self.inner.levels
    }

    /// Result of the retention sweep run at construction
    pub fn prune_stats(&self) -> PruneStats {
        self.inner.prune_stats
    }
}

impl Inner {
    fn delivery(&self) -> MutexGuard<'_, Delivery> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, entry: LogEntry) -> Result<()> {
        let mut delivery = self.delivery();
        let Delivery { queue, sink } = &mut *delivery;
        queue.enqueue(entry, sink)
    }

    fn build_entry(
        &self,
        level: &Level,
        label: &str,
        args: &[LogValue],
        at: &DateTime<Local>,
    ) -> LogEntry {
        let line = self.formatter.render(label, args, at);
        let record = self
            .config
            .structured_output
            .then(|| self.formatter.build_record(level.name(), args, at));
        let raw_args = self.config.echo_to_console.then(|| snapshot(args));
        LogEntry::new(line.title, line.text, record, raw_args)
    }

    fn response_entry(&self, level_name: &str, outcome: &WebhookOutcome) -> LogEntry {
        let level = self.levels.resolve(level_name);
        self.build_entry(
            level,
            WEBHOOK_LABEL,
            &[LogValue::from(outcome.summary.as_str())],
            &Local::now(),
        )
    }

    /// Complete a hold and write whatever it was blocking
    fn complete_hold(&self, id: HoldId, response: Option<LogEntry>, level_name: &str) {
        let mut delivery = self.delivery();
        let Delivery { queue, sink } = &mut *delivery;
        if let Err(e) = queue.complete(id, response, sink) {
            error!(error = %e, level = level_name, "Failed to write entries held for a webhook");
            if self.config.echo_to_console {
                eprintln!("Failed to write entries held for a webhook: {}", e);
            }
        }
    }
}

/// An inline entry waiting for its webhook response
///
/// Completes its hold when dropped without an outcome, so the entry is still written if
/// the webhook task is cancelled with its runtime.
struct HeldEntry {
    inner: Option<Arc<Inner>>,
    id: HoldId,
    level: String,
}

impl HeldEntry {
    fn complete(mut self, outcome: &WebhookOutcome) {
        if let Some(inner) = self.inner.take() {
            let response = inner.response_entry(&self.level, outcome);
            inner.complete_hold(self.id, Some(response), &self.level);
        }
    }
}

impl Drop for HeldEntry {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            warn!(level = %self.level, "Webhook task ended without an outcome");
            inner.complete_hold(self.id, None, &self.level);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let delivery = self
            .delivery
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if delivery.queue.pending() == 0 {
            return;
        }
        let Delivery { queue, sink } = delivery;
        if let Err(e) = queue.flush(sink) {
            error!(error = %e, "Failed to write queued entries on shutdown");
        }
    }
}

fn report_outcome(outcome: &WebhookOutcome, echo: bool) {
    if outcome.delivered {
        debug!(status = outcome.status, "Webhook delivered: {}", outcome.summary);
    } else {
        warn!(status = outcome.status, "Webhook failed: {}", outcome.summary);
    }
    if echo {
        eprintln!("Webhook: {}", outcome.summary);
    }
}
