// crates/poller/src/error.rs
use thiserror::Error;

/// Errors surfaced by poller operations.
///
/// Poll-loop failures never reach this type; a transient fetch error is
/// retried on the next tick and a terminal one stops that subscription, both
/// without disturbing other targets. These variants cover the explicit
/// command/lookup surface only.
#[derive(Debug, Error)]
pub enum PollerError {
    #[error("no job known under key {key}")]
    UnknownJob { key: String },

    #[error("thread count {value} outside allowed range {min}..={max}")]
    ThreadCountOutOfRange { value: u32, min: u32, max: u32 },

    #[error("a command for job {key} is already in flight")]
    CommandInFlight { key: String },

    #[error("command to {target} failed: {source}")]
    Command {
        target: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("command response from {target} was not a job payload: {message}")]
    MalformedCommandResponse { target: String, message: String },
}
