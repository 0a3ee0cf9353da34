// crates/types/src/lib.rs
//! Wire types for the CORB job-status HTTP contract.
//!
//! Shared between the poller and any presentation layer. Everything here is
//! plain serde data, no I/O, no clocks.

mod job;
mod payload;

pub use job::JobDoc;
pub use payload::{JobWrapper, StatusPayload};
