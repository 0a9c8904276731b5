//! Configuration surface
//!
//! Plain data consumed when a sink is built. Once built, a sink holds an
//! immutable snapshot; changing configuration means building a new sink
//! (see `LokiLoggerProvider::reload`).
//!
//! # Example
//!
//! ```
//! use rust_loki_logger::core::{FormatterKind, LokiLoggerOptions};
//!
//! let options = LokiLoggerOptions::from_json(
//!     r#"{
//!         "client": "Http",
//!         "http": { "address": "http://loki:3100" },
//!         "batch": { "batch_size": 500, "period_ms": 1000 },
//!         "formatter": "Logfmt"
//!     }"#,
//! )
//! .unwrap();
//!
//! assert_eq!(options.batch.batch_size, 500);
//! assert_eq!(options.formatter, FormatterKind::Logfmt);
//! ```

use super::error::{LoggerError, Result};
use super::log_context::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Which transport delivers batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushClientKind {
    /// Delivery disabled; loggers accept and discard entries
    #[default]
    None,
    /// HTTP push to a Loki endpoint
    Http,
}

/// Which renderer produces the log line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatterKind {
    #[default]
    Simple,
    Json,
    Logfmt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpOptions {
    /// Base address of the Loki endpoint
    pub address: String,
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
    /// Compress push bodies with gzip
    pub gzip: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            address: "http://localhost:3100".to_string(),
            user: None,
            password: None,
            timeout: Duration::from_secs(10),
            gzip: false,
        }
    }
}

impl HttpOptions {
    /// Both user and password are set and non-empty
    pub fn basic_credentials(&self) -> Option<(&str, &str)> {
        match (self.user.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some((user, password))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Records per batch; a full buffer is flushed immediately
    pub batch_size: usize,
    /// Partial buffers are flushed at this interval
    #[serde(rename = "period_ms", with = "duration_ms")]
    pub period: Duration,
    /// Full batches allowed to wait for the flush worker before new ones are dropped
    pub max_pending_batches: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            period: Duration::from_secs(2),
            max_pending_batches: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticLabelOptions {
    /// Value of the `job` label; blank means no `job` label
    pub job_name: String,
    /// Add an `instance` label holding the host name
    pub include_instance_label: bool,
    /// Extra labels; null values are skipped
    pub additional_static_labels: BTreeMap<String, FieldValue>,
}

impl Default for StaticLabelOptions {
    fn default() -> Self {
        Self {
            job_name: "application".to_string(),
            include_instance_label: true,
            additional_static_labels: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicLabelOptions {
    pub include_category: bool,
    pub include_log_level: bool,
    pub include_event_id: bool,
    pub include_exception: bool,
    /// Turn key/value state into labels
    pub include_dynamic_tags: bool,
}

impl Default for DynamicLabelOptions {
    fn default() -> Self {
        Self {
            include_category: false,
            include_log_level: true,
            include_event_id: false,
            include_exception: false,
            include_dynamic_tags: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleFormatterOptions {
    pub include_activity_tracking: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonFormatterOptions {
    pub include_category: bool,
    pub include_event_id: bool,
    pub include_scopes: bool,
    pub include_activity_tracking: bool,
}

impl Default for JsonFormatterOptions {
    fn default() -> Self {
        Self {
            include_category: true,
            include_event_id: false,
            include_scopes: false,
            include_activity_tracking: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogfmtFormatterOptions {
    pub include_category: bool,
    pub include_event_id: bool,
    pub include_scopes: bool,
    /// Append the full error text on a new line
    pub print_exceptions: bool,
    pub include_activity_tracking: bool,
}

impl Default for LogfmtFormatterOptions {
    fn default() -> Self {
        Self {
            include_category: true,
            include_event_id: false,
            include_scopes: false,
            print_exceptions: true,
            include_activity_tracking: false,
        }
    }
}

/// Complete configuration of a Loki logger provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LokiLoggerOptions {
    pub client: PushClientKind,
    pub http: HttpOptions,
    pub batch: BatchOptions,
    pub static_labels: StaticLabelOptions,
    pub dynamic_labels: DynamicLabelOptions,
    pub formatter: FormatterKind,
    pub simple_formatter: SimpleFormatterOptions,
    pub json_formatter: JsonFormatterOptions,
    pub logfmt_formatter: LogfmtFormatterOptions,
}

impl LokiLoggerOptions {
    /// Parse options from JSON; missing sections take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Read options from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Check values that cannot be expressed in the types
    pub fn validate(&self) -> Result<()> {
        if self.batch.batch_size == 0 {
            return Err(LoggerError::config(
                "BatchOptions",
                "batch_size must be greater than zero",
            ));
        }
        if self.batch.period.is_zero() {
            return Err(LoggerError::config(
                "BatchOptions",
                "period must be greater than zero",
            ));
        }
        if self.batch.max_pending_batches == 0 {
            return Err(LoggerError::config(
                "BatchOptions",
                "max_pending_batches must be greater than zero",
            ));
        }
        if self.client == PushClientKind::Http {
            reqwest::Url::parse(&self.http.address).map_err(|e| {
                LoggerError::config(
                    "HttpOptions",
                    format!("invalid address '{}': {}", self.http.address, e),
                )
            })?;
        }
        Ok(())
    }
}

/// (De)serialize a `Duration` as whole milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
