//! Rendered record, the unit stored in batches

use super::labels::LabelSet;
use chrono::{DateTime, Utc};

/// A log line ready for delivery
///
/// Immutable once built; owned by the buffer slot that holds it until the
/// batch carrying it is flushed or discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    timestamp: DateTime<Utc>,
    labels: LabelSet,
    line: String,
}

impl LogRecord {
    pub fn new(timestamp: DateTime<Utc>, labels: LabelSet, line: impl Into<String>) -> Self {
        Self {
            timestamp,
            labels,
            line: line.into(),
        }
    }

    /// Record stamped with the current time
    pub fn now(labels: LabelSet, line: impl Into<String>) -> Self {
        Self::new(Utc::now(), labels, line)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Nanoseconds since the Unix epoch
    ///
    /// Out-of-range dates (past year 2262) saturate instead of failing.
    pub fn timestamp_nanos(&self) -> i64 {
        self.timestamp.timestamp_nanos_opt().unwrap_or_else(|| {
            if self.timestamp.timestamp() < 0 {
                i64::MIN
            } else {
                i64::MAX
            }
        })
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn line(&self) -> &str {
        &self.line
    }
}
