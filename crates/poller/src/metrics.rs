// crates/poller/src/metrics.rs
//! Derived job metrics computed on read (never stored).
//!
//! All functions are pure and defined for every input; division-by-zero
//! cases collapse to 0 so a job that has not reported totals yet renders as
//! "nothing done" rather than erroring.

/// Display text substituted for a duration when the job has no elapsed time.
pub const NOT_RUNNING: &str = "Not Running";

/// Round to two decimal places.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Percentage of tasks that succeeded, rounded to two decimals.
///
/// Zero when nothing has succeeded yet or the total is unknown/zero.
pub fn success_percent(succeeded: u64, total: u64) -> f64 {
    if succeeded == 0 || total == 0 {
        return 0.0;
    }
    round2(succeeded as f64 / total as f64 * 100.0)
}

/// Percentage of tasks that failed, rounded to two decimals.
pub fn failed_percent(failed: u64, total: u64) -> f64 {
    if failed == 0 || total == 0 {
        return 0.0;
    }
    round2(failed as f64 / total as f64 * 100.0)
}

/// A job is complete once every task has been accounted for.
///
/// `total == 0` is never complete: at startup the server reports zero totals
/// before the URI count is known, and that must not read as "done".
pub fn is_complete(succeeded: u64, failed: u64, total: u64) -> bool {
    total > 0 && succeeded + failed >= total
}

/// Format elapsed milliseconds as zero-padded `HH:MM:SS`, with a `.mmm`
/// suffix when `with_millis` is set.
///
/// Zero or absent elapsed time yields an empty string; callers substitute
/// [`NOT_RUNNING`] (or leave it blank) depending on display context. Hours
/// are not wrapped at 24.
pub fn format_millis(elapsed_ms: Option<u64>, with_millis: bool) -> String {
    let ms = match elapsed_ms {
        Some(ms) if ms > 0 => ms,
        _ => return String::new(),
    };
    let millis = ms % 1000;
    let s = ms / 1000;
    let secs = s % 60;
    let mins = (s / 60) % 60;
    let hrs = s / 3600;
    if with_millis {
        format!("{hrs:02}:{mins:02}:{secs:02}.{millis}")
    } else {
        format!("{hrs:02}:{mins:02}:{secs:02}")
    }
}

/// [`format_millis`] with the [`NOT_RUNNING`] fallback applied.
pub fn format_millis_or_not_running(elapsed_ms: Option<u64>) -> String {
    let formatted = format_millis(elapsed_ms, false);
    if formatted.is_empty() {
        NOT_RUNNING.to_string()
    } else {
        formatted
    }
}
