// crates/poller/src/client.rs
//! HTTP client for the job-status endpoint.
//!
//! Classifies every fetch into one of three outcomes the subscription
//! lifecycle cares about: a parsed payload, "gone" (HTTP 404 or a
//! connect-level failure, meaning the job no longer exists there), or
//! "transient" (anything else, retried on the next tick with stale data
//! left visible).

use thiserror::Error;
use tracing::{debug, warn};

use corb_dash_types::StatusPayload;

use crate::config::PollerConfig;
use crate::dialect::{CommandRequest, Dialect};
use crate::error::PollerError;
use crate::target::Target;

/// A failed status fetch, pre-classified for the subscription loop.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Terminal for this target: stop polling it.
    #[error("target gone: {0}")]
    Gone(String),
    /// Retry at the next tick; no state changes.
    #[error("transient fetch failure: {0}")]
    Transient(String),
}

/// Thin wrapper over [`reqwest::Client`] speaking the status/control contract.
#[derive(Debug, Clone)]
pub struct MetricsClient {
    http: reqwest::Client,
    metrics_path: String,
    dialect: Dialect,
}

impl MetricsClient {
    pub fn new(config: &PollerConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            metrics_path: config.metrics_path.clone(),
            dialect: config.dialect,
        })
    }

    /// Fetch and parse one status document from `target`.
    ///
    /// `concise` requests the reduced payload (valid once the job's set-once
    /// fields have been captured by an earlier full fetch).
    pub async fn fetch_status(
        &self,
        target: &Target,
        concise: bool,
    ) -> Result<StatusPayload, FetchError> {
        let mut url = target.metrics_url(&self.metrics_path);
        if concise {
            url.push_str("?concise");
        }
        debug!(peer = %target, %url, "fetching job status");

        let response = self.http.get(&url).send().await.map_err(classify_send)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::Gone(format!("{target} answered 404")));
        }
        if !status.is_success() {
            return Err(FetchError::Transient(format!(
                "{target} answered HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transient(format!("reading body from {target}: {e}")))?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(peer = %target, error = %e, "malformed status payload, skipping this tick");
            FetchError::Transient(format!("malformed payload from {target}: {e}"))
        })
    }

    /// Send a pause/resume toggle built from the last known paused state.
    /// The response is a status payload, reconciled exactly like a poll.
    pub async fn pause_resume(
        &self,
        target: &Target,
        currently_paused: bool,
    ) -> Result<StatusPayload, PollerError> {
        self.send_command(target, self.dialect.pause_resume(currently_paused))
            .await
    }

    /// Submit a new thread count. Range checks happen in the poller before
    /// this is called.
    pub async fn set_thread_count(
        &self,
        target: &Target,
        threads: u32,
    ) -> Result<StatusPayload, PollerError> {
        self.send_command(target, self.dialect.thread_count(threads))
            .await
    }

    async fn send_command(
        &self,
        target: &Target,
        request: CommandRequest,
    ) -> Result<StatusPayload, PollerError> {
        let url = target.metrics_url(&self.metrics_path);
        debug!(peer = %target, ?request, "dispatching control command");

        let mut builder = self.http.post(&url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }

        let response = builder
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| PollerError::Command {
                target: target.to_string(),
                source,
            })?;

        let body = response.text().await.map_err(|source| PollerError::Command {
            target: target.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|e| PollerError::MalformedCommandResponse {
            target: target.to_string(),
            message: e.to_string(),
        })
    }
}

/// Connect-level failures mean the server is not there anymore; timeouts
/// and other request errors are worth retrying.
fn classify_send(e: reqwest::Error) -> FetchError {
    if e.is_connect() {
        FetchError::Gone(format!("connect failed: {e}"))
    } else {
        FetchError::Transient(e.to_string())
    }
}
