//! Body renderers
//!
//! Each formatter turns a [`LogEntry`] into the single line stored in a
//! record. Formatting happens on the caller's thread at enqueue time.

pub mod json;
pub mod logfmt;
pub mod simple;

pub use json::JsonFormatter;
pub use logfmt::LogfmtFormatter;
pub use simple::SimpleFormatter;

use crate::core::{FormatterKind, LogEntry, LokiLoggerOptions, Result, ScopeProvider};

/// Activity field names shared by the JSON and logfmt renderers
pub const SPAN_ID_KEY: &str = "SpanId";
pub const TRACE_ID_KEY: &str = "TraceId";
pub const PARENT_ID_KEY: &str = "ParentId";

/// Renders an entry into a log line
///
/// Encoding problems degrade to an alternate rendering instead of failing.
/// The only error is a level that has no textual form.
pub trait EntryFormatter: Send + Sync {
    fn format(&self, entry: &LogEntry, scopes: &dyn ScopeProvider) -> Result<String>;

    fn name(&self) -> &str;
}

/// Build the formatter selected by `options.formatter`
pub fn create_formatter(options: &LokiLoggerOptions) -> Box<dyn EntryFormatter> {
    match options.formatter {
        FormatterKind::Json => Box::new(JsonFormatter::new(options.json_formatter.clone())),
        FormatterKind::Logfmt => Box::new(LogfmtFormatter::new(options.logfmt_formatter.clone())),
        FormatterKind::Simple => Box::new(SimpleFormatter::new(options.simple_formatter.clone())),
    }
}
