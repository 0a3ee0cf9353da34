// crates/types/src/job.rs
//! The parsed job-status document for one job at one point in time.

use serde::{Deserialize, Deserializer, Serialize};

/// One job's status document as served by a CORB job server.
///
/// Every field except `paused` is optional on the wire: older servers omit
/// timing fields entirely, and the `?concise` form drops the immutable ones
/// (`totalNumberOfTasks`, `userProvidedOptions`, the init timings) after the
/// first full fetch. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_location: Option<String>,

    /// Normalized at the boundary: servers emit either a JSON bool or the
    /// strings `"true"` / `"false"` depending on version.
    #[serde(default, deserialize_with = "flexible_bool")]
    pub paused: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_thread_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_number_of_tasks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_succeeded_tasks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_failed_tasks: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_run_time_in_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_transaction_time_in_millis: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_task_time_in_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uris_load_time_in_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_batch_run_time_in_millis: Option<u64>,

    /// Options the user launched the job with. Sent once by the server and
    /// omitted from later (concise) responses; the registry carries the
    /// captured value forward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_provided_options: Option<serde_json::Value>,
}

impl JobDoc {
    /// Succeeded + failed task counts, treating absent counters as zero.
    pub fn finished_tasks(&self) -> u64 {
        self.number_of_succeeded_tasks.unwrap_or(0) + self.number_of_failed_tasks.unwrap_or(0)
    }
}

/// Accept `true`/`false` as a JSON bool or as the strings `"true"`/`"false"`.
/// Anything else (including absent) reads as `false`.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    Ok(match Option::<BoolOrString>::deserialize(deserializer)? {
        Some(BoolOrString::Bool(b)) => b,
        Some(BoolOrString::Str(s)) => s.eq_ignore_ascii_case("true"),
        None => false,
    })
}
