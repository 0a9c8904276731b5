//! `key=value` lines

use super::{EntryFormatter, PARENT_ID_KEY, SPAN_ID_KEY, TRACE_ID_KEY};
use crate::core::{LogEntry, LogfmtFormatterOptions, Result, ScopeProvider};

/// Logfmt formatter
///
/// Pairs are written in insertion order and the first write of a key wins,
/// so state and scopes never overwrite the standard keys.
#[derive(Debug, Clone, Default)]
pub struct LogfmtFormatter {
    options: LogfmtFormatterOptions,
}

/// Insertion-ordered pairs with first-write-wins semantics
#[derive(Default)]
struct Pairs(Vec<(String, String)>);

impl Pairs {
    fn add(&mut self, key: &str, value: impl Into<String>) {
        if !self.0.iter().any(|(k, _)| k == key) {
            self.0.push((key.to_string(), value.into()));
        }
    }

    fn render(&self) -> String {
        let mut line = String::new();
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                line.push(' ');
            }
            line.push_str(&logfmt_key(key));
            line.push('=');
            line.push_str(&logfmt_value(value));
        }
        line
    }
}

fn logfmt_key(key: &str) -> String {
    key.replace(' ', "")
}

fn logfmt_value(value: &str) -> String {
    if value.is_empty() {
        "\"\"".to_string()
    } else if value.contains(' ') {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

impl LogfmtFormatter {
    pub fn new(options: LogfmtFormatterOptions) -> Self {
        Self { options }
    }
}

impl EntryFormatter for LogfmtFormatter {
    fn format(&self, entry: &LogEntry, scopes: &dyn ScopeProvider) -> Result<String> {
        let mut pairs = Pairs::default();
        pairs.add("level", entry.level.to_str());

        if self.options.include_category {
            pairs.add("category", entry.category.as_str());
        }
        if self.options.include_event_id {
            pairs.add("eventId", entry.event_id.id.to_string());
        }

        pairs.add("message", entry.message.as_str());

        for (key, value) in entry.state.pairs().unwrap_or_default() {
            pairs.add(key, value.to_string());
        }

        if self.options.include_scopes {
            scopes.for_each_scope(&mut |scope| {
                for (key, value) in scope.pairs().unwrap_or_default() {
                    pairs.add(key, value.to_string());
                }
            });
        }

        if let Some(error) = &entry.error {
            pairs.add("exception", error.type_name.as_str());
        }

        if self.options.include_activity_tracking {
            if let Some(activity) = &entry.activity {
                pairs.add(SPAN_ID_KEY, activity.span_id());
                pairs.add(TRACE_ID_KEY, activity.trace_id());
                if let Some(parent) = activity.parent_id() {
                    pairs.add(PARENT_ID_KEY, parent);
                }
            }
        }

        let mut line = pairs.render();
        if self.options.print_exceptions {
            if let Some(error) = &entry.error {
                line.push('\n');
                line.push_str(&error.details);
            }
        }

        Ok(line)
    }

    fn name(&self) -> &str {
        "logfmt"
    }
}
