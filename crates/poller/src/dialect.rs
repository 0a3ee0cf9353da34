// crates/poller/src/dialect.rs
//! Control-command wire dialects.
//!
//! Job servers drifted across releases: pause/resume is variously
//! `?command=pause`, `?paused=true`, or a form body `concise=true&paused=true`,
//! and the thread-count parameter is named `thread-count` in some releases and
//! `threads` in others. These are dialects of one contract, expressed here as
//! a configuration table rather than separate code paths.

/// How a target's server expects control commands on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `POST ?command=pause|resume`, `POST ?thread-count=<n>`
    #[default]
    CommandQuery,
    /// `POST ?paused=true|false`, `POST ?threads=<n>`
    PausedQuery,
    /// Form body `concise=true&paused=<bool>` / `concise=true&threads=<n>`
    ConciseForm,
}

impl Dialect {
    /// All dialect names accepted from configuration.
    pub const NAMES: &'static [&'static str] = &["command-query", "paused-query", "concise-form"];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "command-query" => Some(Dialect::CommandQuery),
            "paused-query" => Some(Dialect::PausedQuery),
            "concise-form" => Some(Dialect::ConciseForm),
            _ => None,
        }
    }

    /// Build the request that toggles the paused state.
    ///
    /// `currently_paused` is the last *known* state: a paused job gets a
    /// resume command and vice versa.
    pub fn pause_resume(&self, currently_paused: bool) -> CommandRequest {
        match self {
            Dialect::CommandQuery => {
                let action = if currently_paused { "resume" } else { "pause" };
                CommandRequest::query(vec![("command".into(), action.into())])
            }
            Dialect::PausedQuery => CommandRequest::query(vec![(
                "paused".into(),
                (!currently_paused).to_string(),
            )]),
            Dialect::ConciseForm => CommandRequest::form(vec![
                ("concise".into(), "true".into()),
                ("paused".into(), (!currently_paused).to_string()),
            ]),
        }
    }

    /// Build the request that changes the active thread count.
    pub fn thread_count(&self, threads: u32) -> CommandRequest {
        match self {
            Dialect::CommandQuery => {
                CommandRequest::query(vec![("thread-count".into(), threads.to_string())])
            }
            Dialect::PausedQuery => {
                CommandRequest::query(vec![("threads".into(), threads.to_string())])
            }
            Dialect::ConciseForm => CommandRequest::form(vec![
                ("concise".into(), "true".into()),
                ("threads".into(), threads.to_string()),
            ]),
        }
    }
}

/// A dialect-built command: either query-string pairs or form-body pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

impl CommandRequest {
    fn query(pairs: Vec<(String, String)>) -> Self {
        Self {
            query: pairs,
            form: Vec::new(),
        }
    }

    fn form(pairs: Vec<(String, String)>) -> Self {
        Self {
            query: Vec::new(),
            form: pairs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(p: &[(&str, &str)]) -> Vec<(String, String)> {
        p.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_command_query_pause_resume() {
        let d = Dialect::CommandQuery;
        assert_eq!(d.pause_resume(false).query, pairs(&[("command", "pause")]));
        assert_eq!(d.pause_resume(true).query, pairs(&[("command", "resume")]));
        assert!(d.pause_resume(false).form.is_empty());
    }

    #[test]
    fn test_paused_query_flips_state() {
        let d = Dialect::PausedQuery;
        assert_eq!(d.pause_resume(false).query, pairs(&[("paused", "true")]));
        assert_eq!(d.pause_resume(true).query, pairs(&[("paused", "false")]));
    }

    #[test]
    fn test_concise_form_body() {
        let d = Dialect::ConciseForm;
        let req = d.pause_resume(false);
        assert!(req.query.is_empty());
        assert_eq!(req.form, pairs(&[("concise", "true"), ("paused", "true")]));
    }

    #[test]
    fn test_thread_count_parameter_naming() {
        assert_eq!(
            Dialect::CommandQuery.thread_count(16).query,
            pairs(&[("thread-count", "16")])
        );
        assert_eq!(
            Dialect::PausedQuery.thread_count(16).query,
            pairs(&[("threads", "16")])
        );
        assert_eq!(
            Dialect::ConciseForm.thread_count(16).form,
            pairs(&[("concise", "true"), ("threads", "16")])
        );
    }

    #[test]
    fn test_parse_names() {
        for name in Dialect::NAMES {
            assert!(Dialect::parse(name).is_some());
        }
        assert_eq!(Dialect::parse("command-query"), Some(Dialect::CommandQuery));
        assert!(Dialect::parse("bogus").is_none());
    }
}
