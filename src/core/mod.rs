//! Core types and the batching engine

pub mod activity;
pub mod batch_buffer;
pub mod error;
pub mod labels;
pub mod log_context;
pub mod log_entry;
pub mod log_level;
pub mod log_record;
pub mod metrics;
pub mod notification;
pub mod options;
pub mod scheduler;
pub mod scope;
pub mod sink;

pub use activity::{ActivityGuard, ActivityIdFormat, TracingContext};
pub use batch_buffer::{Batch, BatchBuffer, BufferPool, SwapResult};
pub use error::{LoggerError, Result};
pub use labels::{hostname, normalize_key, LabelAssembler, LabelSet};
pub use log_context::{FieldValue, LogState, ORIGINAL_FORMAT_KEY};
pub use log_entry::{ErrorInfo, EventId, LogEntry};
pub use log_level::LogLevel;
pub use log_record::LogRecord;
pub use metrics::SinkMetrics;
pub use notification::{
    Notification, NotificationCallback, NotificationKind, Notifications, SinkId,
    SUBSCRIBER_CAPACITY,
};
pub use options::{
    BatchOptions, DynamicLabelOptions, FormatterKind, HttpOptions, JsonFormatterOptions,
    LogfmtFormatterOptions, LokiLoggerOptions, PushClientKind, SimpleFormatterOptions,
    StaticLabelOptions,
};
pub use scheduler::{BatchScheduler, SchedulerState};
pub use scope::{NullScopeProvider, ScopeGuard, ScopeProvider, ThreadScopeProvider};
pub use sink::{LokiSink, DEFAULT_SHUTDOWN_TIMEOUT};
