// crates/poller/src/target.rs
//! Target identification and port-spec expansion.
//!
//! A monitoring session starts from a raw specification string like
//! `"8000-8010,9000"` (optionally with per-token hosts, `"other:9010"`) and a
//! default host that may itself arrive as a URL-ish string. Expansion is
//! deliberately lenient: malformed tokens are dropped, never reported.

use std::fmt;

use regex_lite::Regex;

/// One `host:port` pair hosting a job-status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base URL of this target's metrics endpoint.
    pub fn metrics_url(&self, metrics_path: &str) -> String {
        format!("http://{}:{}{}", self.host, self.port, metrics_path)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Pull the bare hostname out of a URL-like string.
///
/// Tolerates a scheme, leading slashes, an embedded port, a path, query, and
/// fragment, or none of them (a bare hostname passes through unchanged).
/// Returns `None` only when nothing hostname-shaped is present.
pub fn extract_host(raw: &str) -> Option<String> {
    let re = Regex::new(
        r"^(?:https?:)?/{0,2}([^:/?#]+)(?::[0-9]+)?(?:/[^?#]*)?(?:\?[^#]*)?(?:#.*)?$",
    )
    .ok()?;
    let host = re.captures(raw.trim())?.get(1)?.as_str().to_string();
    (!host.is_empty()).then_some(host)
}

/// Expand a comma-separated port specification into concrete targets.
///
/// Each token is one of:
/// - `"8000-8010"`: an inclusive range on `default_host`
/// - `"9000"`: a single port on `default_host`
/// - `"otherhost:9000"`: a single port on an explicit host
///
/// Tokens that parse as none of these are silently skipped, and an empty or
/// all-malformed spec yields an empty set (no polling is started). Duplicates
/// are preserved here; the poller collapses them at subscription time.
pub fn expand_spec(default_host: &str, spec: &str) -> Vec<Target> {
    let mut targets = Vec::new();
    for token in spec.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        // Host names may contain dashes, so the host:port form is decided
        // before the dash-range form.
        if let Some((host, port)) = token.rsplit_once(':') {
            let Ok(port) = port.trim().parse::<u16>() else {
                continue;
            };
            if let Some(host) = extract_host(host) {
                targets.push(Target::new(host, port));
            }
        } else if let Some((lo, hi)) = token.split_once('-') {
            let (Ok(lo), Ok(hi)) = (lo.trim().parse::<u16>(), hi.trim().parse::<u16>()) else {
                continue;
            };
            if lo > hi {
                continue;
            }
            for port in lo..=hi {
                targets.push(Target::new(default_host, port));
            }
        } else if let Ok(port) = token.parse::<u16>() {
            targets.push(Target::new(default_host, port));
        }
    }
    targets
}
