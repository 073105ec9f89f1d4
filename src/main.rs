use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use kantan::diagnostics::{self, DEFAULT_FILTER};
use kantan::{LogValue, Logger, LoggerConfig, WebhookMode, WebhookTask};

#[derive(Parser, Debug)]
#[command(
    name = "kantan",
    about = "Append an entry to the application log",
    version
)]
struct Cli {
    /// Logger configuration file (missing file means defaults)
    #[arg(short, long, default_value = "kantan.toml")]
    config: PathBuf,

    /// Override the configured webhook mode (detached or inline)
    #[arg(long)]
    webhook_mode: Option<WebhookMode>,

    /// Level to log at; unknown levels behave like "log"
    level: String,

    /// Message arguments (reads stdin lines if none are given)
    messages: Vec<String>,
}

/// JSON objects and arrays stay structured so they can reach a webhook
fn to_value(message: &str) -> LogValue {
    match serde_json::from_str::<Value>(message) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => LogValue::from(value),
        _ => LogValue::from(message),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Another subscriber may already be installed when embedded
    let _ = diagnostics::init_diagnostics(DEFAULT_FILTER);

    let args = Cli::parse();
    let mut config = LoggerConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(mode) = args.webhook_mode {
        config.webhook_mode = mode;
    }
    let logger = Logger::new(config).context("Failed to start logger")?;
    tracing::debug!(dir = %logger.active_dir().display(), "Logging to {}", logger.title());

    let mut tasks: Vec<WebhookTask> = Vec::new();
    if args.messages.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            if line.trim().is_empty() {
                continue;
            }
            tasks.extend(logger.level(&args.level, [to_value(&line)])?);
        }
    } else {
        let values: Vec<LogValue> = args.messages.iter().map(|m| to_value(m)).collect();
        tasks.extend(logger.level(&args.level, values)?);
    }

    for task in tasks {
        if let Some(outcome) = task.outcome().await {
            if !outcome.delivered {
                eprintln!("Webhook failed: {}", outcome.summary);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["kantan", "info", "server", "started"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("kantan.toml"));
        assert_eq!(cli.level, "info");
        assert_eq!(cli.messages, vec!["server", "started"]);
        assert_eq!(cli.webhook_mode, None);
    }

    #[test]
    fn test_cli_options() {
        let cli = Cli::try_parse_from([
            "kantan",
            "-c",
            "conf/app.toml",
            "--webhook-mode",
            "inline",
            "error",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("conf/app.toml"));
        assert_eq!(cli.webhook_mode, Some(WebhookMode::Inline));
        assert!(cli.messages.is_empty());

        assert!(Cli::try_parse_from(["kantan", "--webhook-mode", "later", "info"]).is_err());
        assert!(Cli::try_parse_from(["kantan"]).is_err());
    }

    #[test]
    fn test_json_messages_stay_structured() {
        assert!(to_value(r#"{"id": 1}"#).is_structured());
        assert!(to_value("[1, 2]").is_structured());
        assert_eq!(to_value("42").as_str(), Some("42"));
        assert_eq!(to_value("plain text").as_str(), Some("plain text"));
    }
}
