//! Log entry structure
//!
//! A [`LogEntry`] is what a category logger hands over at the call site; it
//! is rendered into labels and a text line before it reaches the batch buffer.

use super::activity::TracingContext;
use super::log_context::LogState;
use super::log_level::LogLevel;
use std::fmt;

/// Identifier of a logging event
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EventId {
    pub id: i32,
    pub name: Option<String>,
}

impl EventId {
    pub fn new(id: i32) -> Self {
        Self { id, name: None }
    }

    pub fn named(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.id),
        }
    }
}

impl From<i32> for EventId {
    fn from(id: i32) -> Self {
        EventId::new(id)
    }
}

/// Captured error attached to an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Type name of the error
    pub type_name: String,
    /// Full text: message plus the chain of sources
    pub details: String,
}

impl ErrorInfo {
    pub fn new(type_name: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            details: details.into(),
        }
    }

    /// Capture an error and its `source()` chain
    pub fn from_error<E: std::error::Error + 'static>(error: &E) -> Self {
        let mut details = format!("{}: {}", std::any::type_name::<E>(), error);
        let mut source = error.source();
        while let Some(cause) = source {
            details.push_str("\n ---> ");
            details.push_str(&cause.to_string());
            source = cause.source();
        }

        Self {
            type_name: std::any::type_name::<E>().to_string(),
            details,
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

/// Structured entry as produced at the logging call site
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub category: String,
    pub event_id: EventId,
    /// Message already rendered from its template
    pub message: String,
    pub state: LogState,
    pub error: Option<ErrorInfo>,
    pub activity: Option<TracingContext>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            category: String::new(),
            event_id: EventId::default(),
            message: message.into(),
            state: LogState::Empty,
            error: None,
            activity: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<EventId>) -> Self {
        self.event_id = event_id.into();
        self
    }

    pub fn with_state(mut self, state: impl Into<LogState>) -> Self {
        self.state = state.into();
        self
    }

    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<super::log_context::FieldValue>,
    {
        self.state.add_field(key, value);
        self
    }

    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_activity(mut self, activity: TracingContext) -> Self {
        self.activity = Some(activity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Debug)]
    struct Wrapped(io::Error);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "request failed")
        }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_event_id_display() {
        assert_eq!(EventId::new(42).to_string(), "42");
        assert_eq!(EventId::named(42, "UserLogin").to_string(), "UserLogin");
    }

    #[test]
    fn test_error_info_includes_sources() {
        let err = Wrapped(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset"));
        let info = ErrorInfo::from_error(&err);

        assert!(info.type_name.ends_with("Wrapped"));
        assert!(info.details.contains("request failed"));
        assert!(info.details.contains("peer reset"));
    }

    #[test]
    fn test_entry_builder() {
        let entry = LogEntry::new(LogLevel::Warning, "disk almost full")
            .with_category("storage")
            .with_event_id(7)
            .with_field("free_mb", 12);

        assert_eq!(entry.category, "storage");
        assert_eq!(entry.event_id.id, 7);
        assert_eq!(entry.state.pairs().unwrap().len(), 1);
        assert!(entry.error.is_none());
    }
}
