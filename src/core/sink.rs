//! Sink: ingress of rendered records and owner of the flush worker

use super::batch_buffer::{BatchBuffer, BufferPool, SwapResult, DEFAULT_POOLED_SLOTS};
use super::error::{LoggerError, Result};
use super::log_record::LogRecord;
use super::metrics::SinkMetrics;
use super::notification::{panic_message, Notifications, SinkId};
use super::options::BatchOptions;
use super::scheduler::{BatchScheduler, SchedulerState, StateCell};
use crate::push::PushClient;
use crossbeam_channel::{bounded, Sender};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default time [`LokiSink::shutdown`] waits for the worker on drop
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(1500);

const WORKER_THREAD_NAME: &str = "loki-batch-sender";

struct Lifecycle {
    shutdown_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    /// Result of the first shutdown, replayed by later calls
    outcome: Option<bool>,
}

/// One batching pipeline: buffer, worker thread and push client
///
/// Records are appended on the caller's thread; delivery happens on the
/// worker. Nothing here reports back to the caller: outcomes go to the
/// [`Notifications`] hub.
///
/// # Example
///
/// ```
/// use rust_loki_logger::core::{BatchOptions, LabelSet, LogRecord, LokiSink, Notifications};
/// use rust_loki_logger::push::MemoryPushClient;
/// use std::time::Duration;
///
/// let client = MemoryPushClient::new();
/// let sink = LokiSink::new(
///     Box::new(client.clone()),
///     &BatchOptions::default(),
///     Notifications::new(),
/// )
/// .unwrap();
///
/// sink.enqueue_message(LogRecord::now(LabelSet::new(), "hello"));
/// assert!(sink.shutdown(Duration::from_secs(1)));
/// assert_eq!(client.record_count(), 1);
/// ```
pub struct LokiSink {
    id: SinkId,
    buffer: Arc<BatchBuffer>,
    accepting: RwLock<bool>,
    max_pending: usize,
    notifications: Notifications,
    metrics: Arc<SinkMetrics>,
    state: Arc<StateCell>,
    lifecycle: Mutex<Lifecycle>,
}

impl LokiSink {
    /// Build the buffer and start the worker thread
    pub fn new(
        client: Box<dyn PushClient>,
        options: &BatchOptions,
        notifications: Notifications,
    ) -> Result<Self> {
        if options.batch_size == 0 || options.period.is_zero() || options.max_pending_batches == 0 {
            return Err(LoggerError::config(
                "BatchOptions",
                "batch_size, period and max_pending_batches must be greater than zero",
            ));
        }

        let id = SinkId::next();
        let (queue_tx, queue_rx) = bounded(options.max_pending_batches);
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let pool = Arc::new(BufferPool::new(options.batch_size, DEFAULT_POOLED_SLOTS));
        let buffer = Arc::new(BatchBuffer::with_flush_queue(options.batch_size, pool, queue_tx));
        let metrics = Arc::new(SinkMetrics::new());
        let state = Arc::new(StateCell::new(SchedulerState::Idle));

        let scheduler = BatchScheduler::new(
            id,
            options.period,
            Arc::clone(&buffer),
            queue_rx,
            shutdown_rx,
            client,
            notifications.clone(),
            Arc::clone(&metrics),
            Arc::clone(&state),
        );

        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || scheduler.run())?;

        Ok(Self {
            id,
            buffer,
            accepting: RwLock::new(true),
            max_pending: options.max_pending_batches,
            notifications,
            metrics,
            state,
            lifecycle: Mutex::new(Lifecycle {
                shutdown_tx: Some(shutdown_tx),
                worker: Some(worker),
                outcome: None,
            }),
        })
    }

    pub fn id(&self) -> SinkId {
        self.id
    }

    pub fn state(&self) -> SchedulerState {
        self.state.get()
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    pub fn is_accepting(&self) -> bool {
        *self.accepting.read()
    }

    /// Append a record; never blocks on I/O and never fails
    ///
    /// After shutdown has begun the record is dropped silently. A record
    /// that would complete a batch while the pending queue is full is
    /// dropped and a `QueueFull` notification is raised; records already
    /// in the buffer are kept.
    pub fn enqueue_message(&self, record: LogRecord) {
        if self.try_enqueue(record).is_err() {
            self.metrics.record_dropped(1);
        }
    }

    /// Like [`enqueue_message`](Self::enqueue_message), but hands the record
    /// back instead of dropping it when the sink no longer accepts writes
    pub fn try_enqueue(&self, record: LogRecord) -> std::result::Result<(), LogRecord> {
        // Held across the append so shutdown cannot slip in between
        let accepting = self.accepting.read();
        if !*accepting {
            return Err(record);
        }

        match self.buffer.add(record) {
            SwapResult::Overflowed { len, pending } => {
                drop(accepting);
                self.metrics.record_queue_full();
                self.metrics.record_dropped(len as u64);
                self.notifications.exception_raised(
                    self.id,
                    LoggerError::QueueFull {
                        pending,
                        max: self.max_pending,
                    },
                );
            }
            _ => {
                self.metrics.record_enqueued();
            }
        }
        Ok(())
    }

    /// Stop accepting, drain and wait up to `timeout` for the worker
    ///
    /// Returns `true` if the worker finished in time. Only the first call
    /// does any work; later calls return the first call's result.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if let Some(outcome) = lifecycle.outcome {
            return outcome;
        }

        *self.accepting.write() = false;
        drop(lifecycle.shutdown_tx.take());

        let outcome = match lifecycle.worker.take() {
            Some(handle) if handle.thread().id() == thread::current().id() => {
                // Called from a notification handler on the worker itself;
                // the drain runs once the handler returns.
                true
            }
            Some(handle) => self.join_worker(handle, timeout),
            None => true,
        };

        lifecycle.outcome = Some(outcome);
        outcome
    }

    fn join_worker(&self, handle: JoinHandle<()>, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    self.notifications.exception_raised(
                        self.id,
                        LoggerError::WorkerPanicked(panic_message(e.as_ref())),
                    );
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                // The worker keeps its own references and finishes the
                // drain on its own; it is detached here.
                self.notifications
                    .exception_raised(self.id, LoggerError::ShutdownTimeout { timeout });
                return false;
            }

            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Drop for LokiSink {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

        let dropped = self.metrics.dropped_count();
        if dropped > 0 && self.notifications.callback_count() == 0 {
            eprintln!(
                "[LOKI WARNING] {} shut down with {} dropped records (drop rate: {:.2}%)",
                self.id,
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}
