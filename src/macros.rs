//! Logging macros for ergonomic log message formatting.
//!
//! These macros build a [`LogEntry`](crate::core::LogEntry) from a format
//! string, similar to `println!` and `format!`, and hand it to a
//! [`LokiLogger`](crate::LokiLogger).
//!
//! # Examples
//!
//! ```
//! use rust_loki_logger::prelude::*;
//! use rust_loki_logger::{loki_info, loki_log};
//!
//! let provider = LokiLoggerProvider::new(LokiLoggerOptions::default()).unwrap();
//! let logger = provider.create_logger("server").unwrap();
//!
//! // Basic logging
//! loki_info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! loki_info!(logger, "Server listening on port {}", port);
//!
//! // With key/value state, usable as labels or structured fields
//! let user_id = 42;
//! loki_log!(logger, LogLevel::Information; "userId" => user_id; "User {} logged in", user_id);
//! ```

/// Log a message with automatic formatting.
///
/// State fields may be given between `;` separators; the format string
/// itself is kept under `{OriginalFormat}`, which never becomes a label.
///
/// # Examples
///
/// ```
/// # use rust_loki_logger::prelude::*;
/// # let provider = LokiLoggerProvider::new(LokiLoggerOptions::default()).unwrap();
/// # let logger = provider.create_logger("docs").unwrap();
/// use rust_loki_logger::loki_log;
/// loki_log!(logger, LogLevel::Information, "Simple message");
/// loki_log!(logger, LogLevel::Error, "Error code: {}", 500);
/// loki_log!(logger, LogLevel::Warning; "attempt" => 3, "max" => 5; "Retrying");
/// ```
#[macro_export]
macro_rules! loki_log {
    ($logger:expr, $level:expr; $($key:literal => $value:expr),+ ; $fmt:literal $($arg:tt)*) => {
        $logger.log(
            $crate::core::LogEntry::new($level, format!($fmt $($arg)*))
                $(.with_field($key, $value))+
                .with_field($crate::core::ORIGINAL_FORMAT_KEY, $fmt),
        )
    };
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($crate::core::LogEntry::new($level, format!($($arg)+)))
    };
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// # use rust_loki_logger::prelude::*;
/// # let provider = LokiLoggerProvider::new(LokiLoggerOptions::default()).unwrap();
/// # let logger = provider.create_logger("docs").unwrap();
/// use rust_loki_logger::loki_trace;
/// loki_trace!(logger, "Entering function: calculate()");
/// loki_trace!(logger, "Variable value: {}", 42);
/// ```
#[macro_export]
macro_rules! loki_trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::loki_log!($logger, $crate::core::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! loki_debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::loki_log!($logger, $crate::core::LogLevel::Debug, $($arg)+)
    };
}

/// Log an information-level message.
#[macro_export]
macro_rules! loki_info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::loki_log!($logger, $crate::core::LogLevel::Information, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_loki_logger::prelude::*;
/// # let provider = LokiLoggerProvider::new(LokiLoggerOptions::default()).unwrap();
/// # let logger = provider.create_logger("docs").unwrap();
/// use rust_loki_logger::loki_warn;
/// loki_warn!(logger, "Low disk space");
/// loki_warn!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! loki_warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::loki_log!($logger, $crate::core::LogLevel::Warning, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! loki_error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::loki_log!($logger, $crate::core::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
///
/// # Examples
///
/// ```
/// # use rust_loki_logger::prelude::*;
/// # let provider = LokiLoggerProvider::new(LokiLoggerOptions::default()).unwrap();
/// # let logger = provider.create_logger("docs").unwrap();
/// use rust_loki_logger::loki_critical;
/// loki_critical!(logger, "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! loki_critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::loki_log!($logger, $crate::core::LogLevel::Critical, $($arg)+)
    };
}
