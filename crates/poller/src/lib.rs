// crates/poller/src/lib.rs
//! Multi-target job-metrics polling and reconciliation engine.
//!
//! Given a set of `host:port` targets, the [`Poller`] periodically fetches a
//! job-status document from each, merges the results into a registry keyed by
//! job identity, stops polling targets that report not-found/unreachable, and
//! broadcasts display-ready snapshots to any number of read-only subscribers.
//!
//! Mutation flows one way: poll responses and command responses go through
//! the registry merge; presentation layers only ever see snapshots.

pub mod client;
pub mod config;
pub mod dialect;
pub mod error;
pub mod metrics;
pub mod poller;
pub mod registry;
pub mod target;

pub use client::{FetchError, MetricsClient};
pub use config::PollerConfig;
pub use dialect::{CommandRequest, Dialect};
pub use error::PollerError;
pub use poller::{Poller, RegistryEvent};
pub use registry::{JobSnapshot, ServerRegistry};
pub use target::Target;
