//! # Rust Loki Logger
//!
//! Ships structured log records to a Grafana Loki endpoint.
//!
//! ## Features
//!
//! - **Batching**: records accumulate in a double-buffered slot and are
//!   pushed when the batch is full or the flush period elapses
//! - **Non-blocking**: log calls render on the caller's thread and never
//!   wait on the network
//! - **Labels**: static job/instance labels merged with per-record labels
//! - **Formatters**: simple text, JSON or logfmt bodies
//! - **Notifications**: push outcomes are reported per provider instance
//!
//! ## Example
//!
//! ```no_run
//! use rust_loki_logger::prelude::*;
//!
//! let options = LokiLoggerOptions::from_json(
//!     r#"{"client": "Http", "http": {"address": "http://localhost:3100"}}"#,
//! )
//! .unwrap();
//!
//! let provider = LokiLoggerProvider::new(options).unwrap();
//! provider.notifications().on_notification(|n| {
//!     if let Some(err) = n.error() {
//!         eprintln!("loki push failed: {}", err);
//!     }
//! });
//!
//! let logger = provider.create_logger("app").unwrap();
//! logger.info("started");
//! provider.dispose();
//! ```

pub mod core;
pub mod formatters;
pub mod macros;
pub mod provider;
pub mod push;

pub mod prelude {
    pub use crate::core::{
        ErrorInfo, EventId, FieldValue, FormatterKind, LogEntry, LogLevel, LogState, LoggerError,
        LokiLoggerOptions, Notification, NotificationKind, PushClientKind, Result, TracingContext,
    };
    pub use crate::provider::{LokiLogger, LokiLoggerProvider};
}

pub use core::{
    LogEntry, LogLevel, LogRecord, LoggerError, LokiLoggerOptions, LokiSink, Notifications,
    Result, SinkMetrics, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use provider::{LokiLogger, LokiLoggerProvider, LokiLoggerProviderBuilder, PushClientFactory};
