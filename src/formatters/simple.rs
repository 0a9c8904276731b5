//! `[INFO] message` lines

use super::EntryFormatter;
use crate::core::{LogEntry, Result, ScopeProvider, SimpleFormatterOptions};

/// Plain text formatter
///
/// Output: `[<code>] <traceId - >message`, then the error text on a new
/// line if one is attached. Codes are `TRCE DBUG INFO WARN EROR CRIT`.
#[derive(Debug, Clone, Default)]
pub struct SimpleFormatter {
    options: SimpleFormatterOptions,
}

impl SimpleFormatter {
    pub fn new(options: SimpleFormatterOptions) -> Self {
        Self { options }
    }
}

impl EntryFormatter for SimpleFormatter {
    fn format(&self, entry: &LogEntry, _scopes: &dyn ScopeProvider) -> Result<String> {
        let code = entry.level.short_code()?;

        let mut line = String::with_capacity(entry.message.len() + 8);
        line.push('[');
        line.push_str(code);
        line.push_str("] ");

        if self.options.include_activity_tracking {
            if let Some(activity) = &entry.activity {
                line.push_str(activity.trace_id());
                line.push_str(" - ");
            }
        }

        line.push_str(&entry.message);

        if let Some(error) = &entry.error {
            line.push('\n');
            line.push_str(&error.details);
        }

        Ok(line)
    }

    fn name(&self) -> &str {
        "simple"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorInfo, LogLevel, LoggerError, NullScopeProvider, TracingContext};

    fn format(formatter: &SimpleFormatter, entry: &LogEntry) -> Result<String> {
        formatter.format(entry, &NullScopeProvider)
    }

    #[test]
    fn test_level_codes() {
        let formatter = SimpleFormatter::default();
        let cases = [
            (LogLevel::Trace, "[TRCE] msg"),
            (LogLevel::Debug, "[DBUG] msg"),
            (LogLevel::Information, "[INFO] msg"),
            (LogLevel::Warning, "[WARN] msg"),
            (LogLevel::Error, "[EROR] msg"),
            (LogLevel::Critical, "[CRIT] msg"),
        ];
        for (level, expected) in cases {
            assert_eq!(format(&formatter, &LogEntry::new(level, "msg")).unwrap(), expected);
        }
    }

    #[test]
    fn test_none_level_is_rejected() {
        let formatter = SimpleFormatter::default();
        let result = format(&formatter, &LogEntry::new(LogLevel::None, "msg"));
        assert!(matches!(result, Err(LoggerError::InvalidLevel { .. })));
    }

    #[test]
    fn test_error_details_on_next_line() {
        let formatter = SimpleFormatter::default();
        let entry = LogEntry::new(LogLevel::Error, "failed")
            .with_error(ErrorInfo::new("io::Error", "io::Error: disk full"));

        assert_eq!(
            format(&formatter, &entry).unwrap(),
            "[EROR] failed\nio::Error: disk full"
        );
    }

    #[test]
    fn test_trace_id_prefix() {
        let activity = TracingContext::new_w3c();
        let entry = LogEntry::new(LogLevel::Information, "traced").with_activity(activity.clone());

        let plain = SimpleFormatter::default();
        assert_eq!(format(&plain, &entry).unwrap(), "[INFO] traced");

        let tracking = SimpleFormatter::new(SimpleFormatterOptions {
            include_activity_tracking: true,
        });
        assert_eq!(
            format(&tracking, &entry).unwrap(),
            format!("[INFO] {} - traced", activity.trace_id())
        );
    }
}
