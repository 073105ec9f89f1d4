//! Level webhooks
//!
//! A level with a configured URL posts each call whose first argument is structured.
//! One attempt is made; failures turn into an outcome string and are never returned as
//! errors to the caller.

mod client;

pub use client::{WebhookClient, WebhookTask};

#[cfg(test)]
pub(crate) use client::testing;

use serde_json::{Map, Value};

use crate::format::{Formatter, LogValue};

/// Body and destination of one webhook call
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookRequest {
    pub url: String,
    pub level: String,
    pub body: Value,
}

impl WebhookRequest {
    /// Build `{...first, level, message}` from a call's arguments
    ///
    /// Returns `None` unless the first argument is a structured value.
    pub fn build(url: &str, level: &str, args: &[LogValue], formatter: &Formatter) -> Option<Self> {
        let (first, rest) = args.split_first()?;
        if !first.is_structured() {
            return None;
        }

        let mut body = match first.to_json() {
            Value::Object(map) => map,
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Map::new(),
        };
        body.insert("level".to_string(), Value::String(level.to_string()));
        body.insert(
            "message".to_string(),
            Value::String(formatter.render_message(None, rest)),
        );

        Some(Self {
            url: url.to_string(),
            level: level.to_string(),
            body: Value::Object(body),
        })
    }
}

/// Result of one webhook attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookOutcome {
    /// The endpoint answered with a 2xx status
    pub delivered: bool,
    /// HTTP status, 503 when the endpoint could not be reached
    pub status: u16,
    /// Human-readable summary, suitable for a log line
    pub summary: String,
}

impl WebhookOutcome {
    /// `<url> - '<body>'`
    pub fn delivered(url: &str, status: u16, body: &str) -> Self {
        Self {
            delivered: true,
            status,
            summary: format!("{} - '{}'", url, body),
        }
    }

    /// `'<body>' <status text> (<status>)`, with the quoted part omitted for an empty body
    pub fn failed(body: &str, status_text: &str, status: u16) -> Self {
        let message = if body.is_empty() {
            String::new()
        } else {
            format!("'{}' ", body)
        };
        Self {
            delivered: false,
            status,
            summary: format!("{}{} ({})", message, status_text, status),
        }
    }

    /// The endpoint could not be reached at all
    pub fn unreachable(error: &str) -> Self {
        Self::failed(error, "Service Unavailable", 503)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggerConfig;
    use chrono::Local;
    use serde_json::json;

    fn formatter() -> Formatter {
        Formatter::new(&LoggerConfig::default(), &Local::now())
    }

    #[test]
    fn test_body_merges_first_argument() {
        let args = vec![
            LogValue::from(json!({"orderId": 42, "level": "overwritten"})),
            LogValue::from("payment"),
            LogValue::from("declined"),
        ];
        let request =
            WebhookRequest::build("https://hooks.example.com", "error", &args, &formatter())
                .unwrap();

        assert_eq!(
            request.body,
            json!({"orderId": 42, "level": "error", "message": "payment declined"})
        );
        assert_eq!(request.level, "error");
    }

    #[test]
    fn test_array_first_argument_uses_index_keys() {
        let args = vec![LogValue::from(json!(["a", "b"]))];
        let request = WebhookRequest::build("http://h", "info", &args, &formatter()).unwrap();
        assert_eq!(
            request.body,
            json!({"0": "a", "1": "b", "level": "info", "message": ""})
        );
    }

    #[test]
    fn test_scalar_first_argument_skips_webhook() {
        let f = formatter();
        assert!(WebhookRequest::build("http://h", "info", &[LogValue::from("text")], &f).is_none());
        assert!(WebhookRequest::build("http://h", "info", &[LogValue::from(1)], &f).is_none());
        assert!(WebhookRequest::build("http://h", "info", &[], &f).is_none());
    }

    #[test]
    fn test_outcome_summaries() {
        assert_eq!(
            WebhookOutcome::delivered("http://h/hook", 200, "ok").summary,
            "http://h/hook - 'ok'"
        );
        assert_eq!(
            WebhookOutcome::failed("boom", "Internal Server Error", 500).summary,
            "'boom' Internal Server Error (500)"
        );
        assert_eq!(
            WebhookOutcome::failed("", "Not Found", 404).summary,
            "Not Found (404)"
        );

        let unreachable = WebhookOutcome::unreachable("connection refused");
        assert!(!unreachable.delivered);
        assert_eq!(unreachable.status, 503);
        assert_eq!(
            unreachable.summary,
            "'connection refused' Service Unavailable (503)"
        );
    }
}
