// crates/types/src/payload.rs
//! Normalization of the payload shapes a status fetch can return.

use serde::Deserialize;

use crate::job::JobDoc;

/// A `{"job": {...}}` wrapper element as it appears inside job lists.
#[derive(Debug, Clone, Deserialize)]
pub struct JobWrapper {
    pub job: JobDoc,
}

/// The status endpoint answers in one of four shapes depending on server
/// version and whether the fetch hit a single-job or all-jobs path:
///
/// 1. `{"job": {...}}`
/// 2. `{"jobs": [{"job": {...}}, ...]}`
/// 3. `[{"job": {...}}, ...]`
/// 4. a bare job object
///
/// All four normalize to a list of [`JobDoc`] via [`StatusPayload::into_jobs`].
/// Variant order matters for untagged deserialization: the wrapped forms are
/// tried before the bare object, which would otherwise swallow them (a bare
/// `JobDoc` accepts any map).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatusPayload {
    Wrapped { job: JobDoc },
    Collection { jobs: Vec<JobWrapper> },
    List(Vec<JobWrapper>),
    Bare(JobDoc),
}

impl StatusPayload {
    /// Flatten whichever shape arrived into a plain job list.
    pub fn into_jobs(self) -> Vec<JobDoc> {
        match self {
            StatusPayload::Wrapped { job } => vec![job],
            StatusPayload::Collection { jobs } => jobs.into_iter().map(|w| w.job).collect(),
            StatusPayload::List(wrappers) => wrappers.into_iter().map(|w| w.job).collect(),
            StatusPayload::Bare(job) => vec![job],
        }
    }
}
