//! Category loggers backed by a reloadable Loki pipeline
//!
//! A [`LokiLoggerProvider`] owns one pipeline at a time: the formatter, the
//! label template and the sink built from a single options snapshot. Loggers
//! created by the provider always log into whichever pipeline is current,
//! so a [`reload`](LokiLoggerProvider::reload) takes effect for them at once.

use crate::core::{
    hostname, ErrorInfo, LabelAssembler, LabelSet, LogEntry, LogLevel, LogRecord, LogState,
    LoggerError, LokiLoggerOptions, LokiSink, Notifications, PushClientKind, Result, ScopeGuard,
    ScopeProvider, SinkMetrics, ThreadScopeProvider, TracingContext, DEFAULT_SHUTDOWN_TIMEOUT,
};
use crate::formatters::{create_formatter, EntryFormatter};
use crate::push::{HttpPushClient, PushClient};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds the push client for an options snapshot; `None` disables delivery
pub type PushClientFactory =
    Arc<dyn Fn(&LokiLoggerOptions) -> Result<Option<Box<dyn PushClient>>> + Send + Sync>;

fn default_push_client(options: &LokiLoggerOptions) -> Result<Option<Box<dyn PushClient>>> {
    match options.client {
        PushClientKind::None => Ok(None),
        PushClientKind::Http => {
            let client: Box<dyn PushClient> = Box::new(HttpPushClient::new(&options.http)?);
            Ok(Some(client))
        }
    }
}

/// Everything built from one options snapshot
struct Pipeline {
    options: Arc<LokiLoggerOptions>,
    formatter: Box<dyn EntryFormatter>,
    labels: LabelAssembler,
    sink: Option<LokiSink>,
}

impl Pipeline {
    fn build(options: LokiLoggerOptions, context: &Context) -> Result<Self> {
        options.validate()?;

        let formatter = create_formatter(&options);
        let labels = LabelAssembler::new(
            LabelSet::from_static(&options.static_labels, &context.hostname),
            options.dynamic_labels.clone(),
        );
        let sink = match (context.client_factory)(&options)? {
            Some(client) => Some(LokiSink::new(
                client,
                &options.batch,
                context.notifications.clone(),
            )?),
            None => None,
        };

        Ok(Self {
            options: Arc::new(options),
            formatter,
            labels,
            sink,
        })
    }

    /// Render on the caller's thread and hand the record to the sink
    ///
    /// Returns `false` only when the sink has stopped accepting writes; the
    /// record has then not been counted anywhere.
    fn process(&self, entry: &LogEntry, context: &Context) -> bool {
        let Some(sink) = &self.sink else {
            return true;
        };

        let timestamp = Utc::now();
        let labels = self.labels.build(entry);
        match self.formatter.format(entry, context.scopes.as_ref()) {
            Ok(line) => sink
                .try_enqueue(LogRecord::new(timestamp, labels, line))
                .is_ok(),
            Err(e) => {
                context.notifications.exception_raised(sink.id(), e);
                true
            }
        }
    }

    fn record_dropped(&self) {
        if let Some(sink) = &self.sink {
            sink.metrics().record_dropped(1);
        }
    }

    fn drain(&self) {
        if let Some(sink) = &self.sink {
            sink.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
        }
    }
}

/// State shared between the provider and its loggers
struct Context {
    pipeline: RwLock<Option<Arc<Pipeline>>>,
    scopes: Arc<dyn ScopeProvider>,
    notifications: Notifications,
    client_factory: PushClientFactory,
    hostname: String,
}

impl Context {
    fn current(&self) -> Option<Arc<Pipeline>> {
        self.pipeline.read().clone()
    }

    /// Process `entry` on `pipeline`, following reloads that retired it
    ///
    /// A sink closes only after its replacement is installed, so every
    /// refusal either reveals a newer pipeline or means disposal.
    fn dispatch(&self, mut pipeline: Arc<Pipeline>, entry: &LogEntry) {
        while !pipeline.process(entry, self) {
            match self.current() {
                Some(next) if !Arc::ptr_eq(&next, &pipeline) => pipeline = next,
                _ => {
                    pipeline.record_dropped();
                    return;
                }
            }
        }
    }
}

/// Entry point: creates category loggers and owns the pipeline
///
/// # Example
///
/// ```
/// use rust_loki_logger::core::LokiLoggerOptions;
/// use rust_loki_logger::LokiLoggerProvider;
///
/// // The default client kind is `None`: records are rendered, then dropped
/// let provider = LokiLoggerProvider::new(LokiLoggerOptions::default()).unwrap();
/// let logger = provider.create_logger("app::startup").unwrap();
/// logger.info("configuration loaded");
/// provider.dispose();
/// assert!(provider.create_logger("late").is_err());
/// ```
pub struct LokiLoggerProvider {
    context: Arc<Context>,
    loggers: Mutex<HashMap<String, LokiLogger>>,
    // Serializes reload and dispose
    lifecycle: Mutex<()>,
}

impl LokiLoggerProvider {
    pub fn new(options: LokiLoggerOptions) -> Result<Self> {
        Self::builder().options(options).build()
    }

    #[must_use]
    pub fn builder() -> LokiLoggerProviderBuilder {
        LokiLoggerProviderBuilder::new()
    }

    /// Logger for `category`; the same instance is returned for a category
    pub fn create_logger(&self, category: &str) -> Result<LokiLogger> {
        if self.is_disposed() {
            return Err(LoggerError::disposed("LokiLoggerProvider"));
        }

        let mut loggers = self.loggers.lock();
        let logger = loggers
            .entry(category.to_string())
            .or_insert_with(|| LokiLogger {
                category: Arc::from(category),
                context: Arc::clone(&self.context),
            });
        Ok(logger.clone())
    }

    /// Replace the pipeline with one built from `options`
    ///
    /// The new pipeline is fully built before the swap; the old sink is
    /// drained afterwards. On error the current pipeline stays in place.
    pub fn reload(&self, options: LokiLoggerOptions) -> Result<()> {
        let _lifecycle = self.lifecycle.lock();
        if self.is_disposed() {
            return Err(LoggerError::disposed("LokiLoggerProvider"));
        }

        let next = Arc::new(Pipeline::build(options, &self.context)?);
        let previous = self.context.pipeline.write().replace(next);
        if let Some(previous) = previous {
            previous.drain();
        }
        Ok(())
    }

    /// Drain the current sink and refuse new loggers; idempotent
    pub fn dispose(&self) {
        let _lifecycle = self.lifecycle.lock();
        let previous = self.context.pipeline.write().take();
        if let Some(previous) = previous {
            previous.drain();
        }
        self.loggers.lock().clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.context.pipeline.read().is_none()
    }

    /// Notification hub shared by every sink this provider builds
    pub fn notifications(&self) -> &Notifications {
        &self.context.notifications
    }

    /// Options of the current pipeline
    pub fn options(&self) -> Option<Arc<LokiLoggerOptions>> {
        self.context.current().map(|p| Arc::clone(&p.options))
    }

    /// Snapshot of the current sink's counters, if delivery is enabled
    pub fn metrics(&self) -> Option<SinkMetrics> {
        self.context
            .current()
            .and_then(|p| p.sink.as_ref().map(|s| s.metrics().clone()))
    }
}

impl Drop for LokiLoggerProvider {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Builder for [`LokiLoggerProvider`]
///
/// # Example
///
/// ```
/// use rust_loki_logger::core::{LokiLoggerOptions, PushClientKind};
/// use rust_loki_logger::push::{MemoryPushClient, PushClient};
/// use rust_loki_logger::LokiLoggerProvider;
/// use std::sync::Arc;
///
/// let client = MemoryPushClient::new();
/// let capture = client.clone();
///
/// let mut options = LokiLoggerOptions::default();
/// options.client = PushClientKind::Http;
///
/// let provider = LokiLoggerProvider::builder()
///     .options(options)
///     .hostname("build-host")
///     .push_client_factory(Arc::new(move |_: &LokiLoggerOptions| {
///         Ok(Some(Box::new(capture.clone()) as Box<dyn PushClient>))
///     }))
///     .build()
///     .unwrap();
///
/// provider.create_logger("demo").unwrap().warn("low disk");
/// provider.dispose();
/// assert_eq!(client.batches(), vec![vec!["[WARN] low disk"]]);
/// ```
pub struct LokiLoggerProviderBuilder {
    options: LokiLoggerOptions,
    client_factory: PushClientFactory,
    scopes: Option<Arc<dyn ScopeProvider>>,
    notifications: Notifications,
    hostname: Option<String>,
}

impl LokiLoggerProviderBuilder {
    pub fn new() -> Self {
        Self {
            options: LokiLoggerOptions::default(),
            client_factory: Arc::new(default_push_client),
            scopes: None,
            notifications: Notifications::new(),
            hostname: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn options(mut self, options: LokiLoggerOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the transport chosen from `options.client`
    #[must_use = "builder methods return a new value"]
    pub fn push_client_factory(mut self, factory: PushClientFactory) -> Self {
        self.client_factory = factory;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn scope_provider(mut self, scopes: Arc<dyn ScopeProvider>) -> Self {
        self.scopes = Some(scopes);
        self
    }

    /// Share an existing notification hub
    #[must_use = "builder methods return a new value"]
    pub fn notifications(mut self, notifications: Notifications) -> Self {
        self.notifications = notifications;
        self
    }

    /// Value of the `instance` label; defaults to the machine host name
    #[must_use = "builder methods return a new value"]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn build(self) -> Result<LokiLoggerProvider> {
        let context = Context {
            pipeline: RwLock::new(None),
            scopes: self
                .scopes
                .unwrap_or_else(|| Arc::new(ThreadScopeProvider::new())),
            notifications: self.notifications,
            client_factory: self.client_factory,
            hostname: self.hostname.unwrap_or_else(hostname),
        };

        let pipeline = Pipeline::build(self.options, &context)?;
        *context.pipeline.write() = Some(Arc::new(pipeline));

        Ok(LokiLoggerProvider {
            context: Arc::new(context),
            loggers: Mutex::new(HashMap::new()),
            lifecycle: Mutex::new(()),
        })
    }
}

impl Default for LokiLoggerProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Logger bound to one category
///
/// Cheap to clone. Logging never fails and never blocks on the network;
/// a call that races a reload is delivered through the new pipeline, and
/// after the provider is disposed calls are silently ignored.
#[derive(Clone)]
pub struct LokiLogger {
    category: Arc<str>,
    context: Arc<Context>,
}

impl LokiLogger {
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Every level except `None` is enabled
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.is_enabled()
    }

    /// Log a structured entry
    ///
    /// The category is set to this logger's; the thread's current activity
    /// is attached unless the entry already carries one.
    pub fn log(&self, mut entry: LogEntry) {
        if !self.is_enabled(entry.level) {
            return;
        }
        let Some(pipeline) = self.context.current() else {
            return;
        };

        entry.category = self.category.to_string();
        if entry.activity.is_none() {
            entry.activity = TracingContext::current();
        }
        self.context.dispatch(pipeline, &entry);
    }

    /// Push a scope visible to formatters until the guard drops
    pub fn begin_scope(&self, state: impl Into<LogState>) -> ScopeGuard {
        self.context.scopes.push(state.into())
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Trace, message));
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Debug, message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Information, message));
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warning, message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Error, message));
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Critical, message));
    }

    /// Log `message` with `error` attached
    pub fn log_error<E: std::error::Error + 'static>(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        error: &E,
    ) {
        self.log(LogEntry::new(level, message).with_error(ErrorInfo::from_error(error)));
    }
}

impl std::fmt::Debug for LokiLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LokiLogger")
            .field("category", &self.category)
            .finish()
    }
}
