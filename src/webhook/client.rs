//! HTTP delivery of webhook requests
//!
//! Requests run as background tasks. Inside a tokio runtime they are spawned onto it;
//! without one, a short-lived thread drives a current-thread runtime. Either way the
//! caller gets a [`WebhookTask`] it may await or simply drop.

use std::time::Duration;

use tokio::sync::oneshot;
use tracing::warn;

use crate::error::ConfigError;

use super::{WebhookOutcome, WebhookRequest};

/// Shared HTTP client for all webhook calls of one logger
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
}

impl WebhookClient {
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        // No pooling: tasks may run on different runtimes
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { http })
    }

    /// Make one attempt; never fails
    pub async fn send(&self, request: &WebhookRequest) -> WebhookOutcome {
        let response = match self
            .http
            .post(&request.url)
            .json(&request.body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return WebhookOutcome::unreachable(&e.to_string()),
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_success() {
            WebhookOutcome::delivered(&request.url, status.as_u16(), &body)
        } else {
            WebhookOutcome::failed(
                &body,
                status.canonical_reason().unwrap_or_default(),
                status.as_u16(),
            )
        }
    }

    /// Send in the background and run `on_complete` with the outcome
    ///
    /// `on_complete` always runs exactly once, even when no runtime could be started.
    pub fn spawn<F>(&self, request: WebhookRequest, on_complete: F) -> WebhookTask
    where
        F: FnOnce(&WebhookOutcome) + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let client = self.clone();
        let deliver = async move { client.send(&request).await };
        let finish = move |outcome: WebhookOutcome| {
            on_complete(&outcome);
            // The caller may have dropped the task
            let _ = tx.send(outcome);
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { finish(deliver.await) });
            }
            Err(_) => {
                std::thread::spawn(move || {
                    let outcome = match tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                    {
                        Ok(runtime) => runtime.block_on(deliver),
                        Err(e) => {
                            warn!(error = %e, "Could not start a runtime for webhook delivery");
                            WebhookOutcome::unreachable(&e.to_string())
                        }
                    };
                    finish(outcome);
                });
            }
        }

        WebhookTask { rx }
    }
}

/// Pending outcome of a background webhook call
#[derive(Debug)]
pub struct WebhookTask {
    rx: oneshot::Receiver<WebhookOutcome>,
}

impl WebhookTask {
    /// Wait for the outcome; `None` if the task was cancelled with its runtime
    pub async fn outcome(self) -> Option<WebhookOutcome> {
        self.rx.await.ok()
    }

    /// Blocking variant of [`outcome`](Self::outcome); must not be called from async code
    pub fn blocking_outcome(self) -> Option<WebhookOutcome> {
        self.rx.blocking_recv().ok()
    }
}
