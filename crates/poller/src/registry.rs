// crates/poller/src/registry.rs
//! Registry of the latest snapshot per job, plus merge/reconciliation rules.
//!
//! The registry is the single source of truth read by presentation layers.
//! Entries are replaced wholesale on each successful poll, never patched
//! field by field, with one class of exception: fields the server sends only
//! once (`userProvidedOptions`, task totals, startup timings) are carried
//! forward when a later, reduced payload omits them.

use std::collections::HashMap;

use corb_dash_types::JobDoc;

use crate::metrics;
use crate::target::Target;

/// The latest polled state of one job, plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    /// Registry key: the job id when the server reports one, else the
    /// origin `host:port`.
    pub key: String,
    pub doc: JobDoc,
    pub origin: Target,
    /// RFC 3339 timestamp of the poll that produced this snapshot.
    pub fetched_at: String,
}

impl JobSnapshot {
    /// Percentage of tasks succeeded, two-decimal rounded.
    pub fn success_percent(&self) -> f64 {
        metrics::success_percent(
            self.doc.number_of_succeeded_tasks.unwrap_or(0),
            self.doc.total_number_of_tasks.unwrap_or(0),
        )
    }

    /// Percentage of tasks failed, two-decimal rounded.
    pub fn failed_percent(&self) -> f64 {
        metrics::failed_percent(
            self.doc.number_of_failed_tasks.unwrap_or(0),
            self.doc.total_number_of_tasks.unwrap_or(0),
        )
    }

    /// Human-readable run duration, `"Not Running"` when there is none.
    pub fn duration(&self) -> String {
        metrics::format_millis_or_not_running(self.doc.total_run_time_in_millis)
    }

    /// Run duration with the millisecond suffix, empty when not running.
    /// The detail view uses this; the fleet view uses [`duration`](Self::duration).
    pub fn duration_precise(&self) -> String {
        metrics::format_millis(self.doc.total_run_time_in_millis, true)
    }

    /// Average transaction time rounded for display.
    pub fn average_transaction_time(&self) -> Option<f64> {
        self.doc
            .average_transaction_time_in_millis
            .map(metrics::round2)
    }

    /// True once every task is accounted for (requires a known total).
    pub fn is_complete(&self) -> bool {
        metrics::is_complete(
            self.doc.number_of_succeeded_tasks.unwrap_or(0),
            self.doc.number_of_failed_tasks.unwrap_or(0),
            self.doc.total_number_of_tasks.unwrap_or(0),
        )
    }
}

/// Mapping from job key to the latest [`JobSnapshot`], with a stable display
/// order and the per-job pending thread counts.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    snapshots: HashMap<String, JobSnapshot>,
    /// Job keys in first-seen order; a re-merged job keeps moving to the
    /// back, mirroring how the original display list deduplicated itself.
    display_order: Vec<String>,
    /// Per-job requested thread count, editable by the user. Seeded from the
    /// job's current thread count the first time the job is seen; polls never
    /// overwrite it afterwards, so a user edit always survives.
    pending_threads: HashMap<String, u32>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one fetched payload's jobs from `origin`. Returns the snapshots
    /// as stored, for broadcasting.
    pub fn merge(&mut self, jobs: Vec<JobDoc>, origin: &Target) -> Vec<JobSnapshot> {
        let mut merged = Vec::with_capacity(jobs.len());
        for mut doc in jobs {
            let key = doc
                .id
                .clone()
                .unwrap_or_else(|| origin.to_string());

            if let Some(prior) = self.snapshots.get(&key) {
                carry_forward_set_once(&mut doc, &prior.doc);
            }

            // Seed the editable thread count on first sight only. A pending
            // value the user typed must survive every subsequent poll.
            if let Some(current) = doc.current_thread_count {
                self.pending_threads.entry(key.clone()).or_insert(current);
            }

            let snapshot = JobSnapshot {
                key: key.clone(),
                doc,
                origin: origin.clone(),
                fetched_at: chrono::Utc::now().to_rfc3339(),
            };

            // Wholesale replacement under the key, and dedup-then-append in
            // the display list so a job never renders twice.
            self.display_order.retain(|k| k != &key);
            self.display_order.push(key.clone());
            self.snapshots.insert(key, snapshot.clone());
            merged.push(snapshot);
        }
        merged
    }

    /// Latest snapshot for a job key.
    pub fn get(&self, key: &str) -> Option<&JobSnapshot> {
        self.snapshots.get(key)
    }

    /// All snapshots in display order.
    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        self.display_order
            .iter()
            .filter_map(|k| self.snapshots.get(k))
            .cloned()
            .collect()
    }

    /// The pending (user-editable) thread count for a job, if seeded.
    pub fn pending_threads(&self, key: &str) -> Option<u32> {
        self.pending_threads.get(key).copied()
    }

    /// Record a user edit of the pending thread count.
    pub fn set_pending_threads(&mut self, key: &str, value: u32) {
        self.pending_threads.insert(key.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Carry set-once fields from the prior snapshot into a payload that omits
/// them. Servers send `userProvidedOptions`, the task total, and the startup
/// timings only on the first full fetch; concise responses drop them.
fn carry_forward_set_once(incoming: &mut JobDoc, prior: &JobDoc) {
    if incoming.user_provided_options.is_none() {
        incoming.user_provided_options = prior.user_provided_options.clone();
    }
    if incoming.total_number_of_tasks.is_none() {
        incoming.total_number_of_tasks = prior.total_number_of_tasks;
    }
    if incoming.init_task_time_in_millis.is_none() {
        incoming.init_task_time_in_millis = prior.init_task_time_in_millis;
    }
    if incoming.uris_load_time_in_millis.is_none() {
        incoming.uris_load_time_in_millis = prior.uris_load_time_in_millis;
    }
    if incoming.pre_batch_run_time_in_millis.is_none() {
        incoming.pre_batch_run_time_in_millis = prior.pre_batch_run_time_in_millis;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn target() -> Target {
        Target::new("localhost", 8010)
    }

    fn doc(id: &str, succeeded: u64, failed: u64, total: u64) -> JobDoc {
        JobDoc {
            id: Some(id.to_string()),
            number_of_succeeded_tasks: Some(succeeded),
            number_of_failed_tasks: Some(failed),
            total_number_of_tasks: Some(total),
            ..JobDoc::default()
        }
    }

    #[test]
    fn test_merge_replaces_entry_under_same_key() {
        let mut reg = ServerRegistry::new();
        reg.merge(vec![doc("j1", 40, 10, 100)], &target());
        reg.merge(vec![doc("j1", 60, 40, 100)], &target());

        assert_eq!(reg.len(), 1);
        let snap = reg.get("j1").unwrap();
        assert_eq!(snap.doc.number_of_succeeded_tasks, Some(60));
    }

    #[test]
    fn test_derived_metrics_scenario() {
        let mut reg = ServerRegistry::new();
        reg.merge(vec![doc("j1", 40, 10, 100)], &target());
        let snap = reg.get("j1").unwrap();
        assert_eq!(snap.success_percent(), 40.0);
        assert_eq!(snap.failed_percent(), 10.0);
        assert!(!snap.is_complete());

        reg.merge(vec![doc("j1", 60, 40, 100)], &target());
        assert!(reg.get("j1").unwrap().is_complete());
    }

    #[test]
    fn test_duration_views() {
        let mut reg = ServerRegistry::new();
        let mut d = doc("j1", 0, 0, 10);
        d.total_run_time_in_millis = Some(61_512);
        reg.merge(vec![d], &target());
        let snap = reg.get("j1").unwrap();
        assert_eq!(snap.duration(), "00:01:01");
        assert_eq!(snap.duration_precise(), "00:01:01.512");

        reg.merge(vec![doc("j2", 0, 0, 10)], &target());
        let idle = reg.get("j2").unwrap();
        assert_eq!(idle.duration(), metrics::NOT_RUNNING);
        assert_eq!(idle.duration_precise(), "");
    }

    #[test]
    fn test_user_provided_options_carried_forward() {
        let mut reg = ServerRegistry::new();
        let mut first = doc("j1", 0, 0, 100);
        first.user_provided_options =
            Some(serde_json::json!({"URIS-MODULE": "uris.xqy"}));
        reg.merge(vec![first], &target());

        // Concise follow-up omits the options entirely.
        reg.merge(vec![doc("j1", 5, 0, 100)], &target());
        let snap = reg.get("j1").unwrap();
        assert_eq!(
            snap.doc.user_provided_options,
            Some(serde_json::json!({"URIS-MODULE": "uris.xqy"}))
        );
    }

    #[test]
    fn test_set_once_totals_survive_concise_payload() {
        let mut reg = ServerRegistry::new();
        reg.merge(vec![doc("j1", 0, 0, 200)], &target());

        let concise = JobDoc {
            id: Some("j1".into()),
            number_of_succeeded_tasks: Some(50),
            ..JobDoc::default()
        };
        reg.merge(vec![concise], &target());
        let snap = reg.get("j1").unwrap();
        assert_eq!(snap.doc.total_number_of_tasks, Some(200));
        assert_eq!(snap.success_percent(), 25.0);
    }

    #[test]
    fn test_key_falls_back_to_host_port() {
        let mut reg = ServerRegistry::new();
        let anon = JobDoc {
            total_number_of_tasks: Some(10),
            ..JobDoc::default()
        };
        reg.merge(vec![anon.clone()], &target());
        reg.merge(vec![anon], &target());
        assert_eq!(reg.len(), 1);
        assert!(reg.get("localhost:8010").is_some());
    }

    #[test]
    fn test_display_order_dedups_and_appends() {
        let mut reg = ServerRegistry::new();
        reg.merge(vec![doc("j1", 0, 0, 10)], &target());
        reg.merge(vec![doc("j2", 0, 0, 10)], &target());
        reg.merge(vec![doc("j1", 1, 0, 10)], &target());

        let keys: Vec<String> = reg.snapshots().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["j2".to_string(), "j1".to_string()]);
    }

    #[test]
    fn test_pending_threads_seeded_once_then_user_owned() {
        let mut reg = ServerRegistry::new();
        let mut d = doc("j1", 0, 0, 10);
        d.current_thread_count = Some(8);
        reg.merge(vec![d.clone()], &target());
        assert_eq!(reg.pending_threads("j1"), Some(8));

        // Server changes its thread count; unedited pending value stays at
        // its seed rather than tracking the server.
        d.current_thread_count = Some(12);
        reg.merge(vec![d.clone()], &target());
        assert_eq!(reg.pending_threads("j1"), Some(8));

        reg.set_pending_threads("j1", 32);
        reg.merge(vec![d], &target());
        assert_eq!(reg.pending_threads("j1"), Some(32));
    }

    #[test]
    fn test_merge_multiple_jobs_one_payload() {
        let mut reg = ServerRegistry::new();
        let merged = reg.merge(vec![doc("j1", 1, 0, 10), doc("j2", 2, 0, 10)], &target());
        assert_eq!(merged.len(), 2);
        assert_eq!(reg.len(), 2);
    }
}
