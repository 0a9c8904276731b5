//! Background flush loop
//!
//! One [`BatchScheduler`] runs per sink on a dedicated thread. Each idle
//! cycle races three sources with `crossbeam_channel::select!`:
//!
//! - a full batch arriving on the flush queue: flush it as is
//! - the flush period elapsing: force a swap and flush the partial batch
//! - shutdown: drain everything, flush, release pooled slots and stop
//!
//! Flushes run one at a time on this thread, so batches reach the push
//! client in detach order.

use super::batch_buffer::{Batch, BatchBuffer};
use super::error::LoggerError;
use super::metrics::SinkMetrics;
use super::notification::{panic_message, Notifications, SinkId};
use crate::push::PushClient;
use crossbeam_channel::{after, select, Receiver};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of the flush loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle = 0,
    Flushing = 1,
    Draining = 2,
    Stopped = 3,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "Idle"),
            SchedulerState::Flushing => write!(f, "Flushing"),
            SchedulerState::Draining => write!(f, "Draining"),
            SchedulerState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Shared, lock-free view of the scheduler state
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: SchedulerState) -> Self {
        StateCell(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> SchedulerState {
        match self.0.load(Ordering::Acquire) {
            0 => SchedulerState::Idle,
            1 => SchedulerState::Flushing,
            2 => SchedulerState::Draining,
            _ => SchedulerState::Stopped,
        }
    }

    pub fn set(&self, state: SchedulerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

pub struct BatchScheduler {
    sink_id: SinkId,
    period: Duration,
    buffer: Arc<BatchBuffer>,
    flush_queue: Receiver<Batch>,
    shutdown: Receiver<()>,
    client: Box<dyn PushClient>,
    notifications: Notifications,
    metrics: Arc<SinkMetrics>,
    state: Arc<StateCell>,
}

impl BatchScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sink_id: SinkId,
        period: Duration,
        buffer: Arc<BatchBuffer>,
        flush_queue: Receiver<Batch>,
        shutdown: Receiver<()>,
        client: Box<dyn PushClient>,
        notifications: Notifications,
        metrics: Arc<SinkMetrics>,
        state: Arc<StateCell>,
    ) -> Self {
        Self {
            sink_id,
            period,
            buffer,
            flush_queue,
            shutdown,
            client,
            notifications,
            metrics,
            state,
        }
    }

    /// Run until shutdown is signalled, then drain
    ///
    /// Shutdown is signalled by sending on, or dropping the sender of, the
    /// shutdown channel.
    pub fn run(mut self) {
        loop {
            self.state.set(SchedulerState::Idle);
            let timer = after(self.period);

            select! {
                recv(self.flush_queue) -> msg => match msg {
                    Ok(batch) => self.flush(batch),
                    Err(_) => break,
                },
                recv(timer) -> _ => self.flush_on_timer(),
                recv(self.shutdown) -> _ => break,
            }
        }

        self.drain();
    }

    /// Swap out the partial slot and flush it after any earlier full batches
    fn flush_on_timer(&mut self) {
        let tail = self.buffer.swap();

        // Full batches detached before the swap are already queued; anything
        // with a higher sequence was detached after it and must wait.
        let mut later = None;
        while let Ok(batch) = self.flush_queue.try_recv() {
            if batch.sequence() < tail.sequence() {
                self.flush(batch);
            } else {
                later = Some(batch);
                break;
            }
        }

        self.flush(tail);
        if let Some(batch) = later {
            self.flush(batch);
        }
    }

    fn drain(&mut self) {
        self.state.set(SchedulerState::Draining);

        // Producers are shut out before shutdown is signalled, so every
        // queued batch precedes the final swap.
        let pending: Vec<Batch> = self.flush_queue.try_iter().collect();
        for batch in pending {
            self.flush(batch);
        }
        let tail = self.buffer.swap();
        self.flush(tail);

        self.buffer.pool().clear();
        self.state.set(SchedulerState::Stopped);
    }

    /// Push one batch; outcomes go to the notification channel
    fn flush(&mut self, batch: Batch) {
        if batch.is_empty() {
            return;
        }

        let draining = self.state.get() == SchedulerState::Draining;
        if !draining {
            self.state.set(SchedulerState::Flushing);
        }

        let count = batch.len();
        let client = &mut self.client;
        let records = batch.records();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| client.push(records)));

        match result {
            Ok(Ok(())) => {
                self.metrics.record_flushed(count as u64);
                self.notifications.flush_completed(self.sink_id, count);
            }
            Ok(Err(e)) => {
                self.metrics.record_failed(count as u64);
                self.notifications.exception_raised(self.sink_id, e);
            }
            Err(panic_info) => {
                self.metrics.record_failed(count as u64);
                self.notifications.exception_raised(
                    self.sink_id,
                    LoggerError::WorkerPanicked(format!(
                        "{} client: {}",
                        self.client.name(),
                        panic_message(panic_info.as_ref())
                    )),
                );
            }
        }

        batch.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch_buffer::{BufferPool, SwapResult};
    use crate::core::labels::LabelSet;
    use crate::core::log_record::LogRecord;
    use crate::push::MemoryPushClient;
    use crossbeam_channel::{bounded, Sender};
    use std::thread::JoinHandle;

    struct Harness {
        buffer: Arc<BatchBuffer>,
        client: MemoryPushClient,
        state: Arc<StateCell>,
        shutdown: Option<Sender<()>>,
        handle: Option<JoinHandle<()>>,
    }

    impl Harness {
        fn start(capacity: usize, period: Duration) -> Self {
            let (queue_tx, queue_rx) = bounded(16);
            let (shutdown_tx, shutdown_rx) = bounded(1);
            let buffer = Arc::new(BatchBuffer::with_flush_queue(
                capacity,
                Arc::new(BufferPool::new(capacity, 2)),
                queue_tx,
            ));
            let client = MemoryPushClient::new();
            let state = Arc::new(StateCell::new(SchedulerState::Idle));

            let scheduler = BatchScheduler::new(
                SinkId::next(),
                period,
                Arc::clone(&buffer),
                queue_rx,
                shutdown_rx,
                Box::new(client.clone()),
                Notifications::new(),
                Arc::new(SinkMetrics::new()),
                Arc::clone(&state),
            );
            let handle = std::thread::spawn(move || scheduler.run());

            Self {
                buffer,
                client,
                state,
                shutdown: Some(shutdown_tx),
                handle: Some(handle),
            }
        }

        fn add(&self, line: &str) -> SwapResult {
            self.buffer.add(LogRecord::now(LabelSet::new(), line))
        }

        fn stop(&mut self) {
            drop(self.shutdown.take());
            if let Some(handle) = self.handle.take() {
                handle.join().unwrap();
            }
        }
    }

    #[test]
    fn test_full_batch_flushes_before_period() {
        let mut harness = Harness::start(2, Duration::from_secs(5));
        harness.add("rec1");
        assert!(matches!(harness.add("rec2"), SwapResult::Queued { len: 2 }));

        let batches = harness.client.wait_for_batches(1, Duration::from_secs(2));
        assert_eq!(batches[0], vec!["rec1", "rec2"]);
        harness.stop();
    }

    #[test]
    fn test_period_flushes_partial_batch() {
        let mut harness = Harness::start(100, Duration::from_millis(10));
        harness.add("only");

        let batches = harness.client.wait_for_batches(1, Duration::from_secs(2));
        assert_eq!(batches[0], vec!["only"]);
        harness.stop();
    }

    #[test]
    fn test_idle_periods_do_not_push() {
        let mut harness = Harness::start(100, Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(harness.client.batch_count(), 0);
        harness.stop();
    }

    #[test]
    fn test_shutdown_drains_remaining() {
        let mut harness = Harness::start(100, Duration::from_secs(60));
        harness.add("a");
        harness.add("b");
        harness.stop();

        assert_eq!(harness.client.batches(), vec![vec!["a", "b"]]);
        assert_eq!(harness.state.get(), SchedulerState::Stopped);
        assert_eq!(harness.buffer.pool().pooled(), 0);
    }

    #[test]
    fn test_delivery_follows_detach_order() {
        let mut harness = Harness::start(3, Duration::from_secs(60));
        for i in 0..10 {
            harness.add(&format!("{}", i));
        }
        harness.stop();

        let flattened: Vec<String> = harness.client.batches().into_iter().flatten().collect();
        let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(flattened, expected);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SchedulerState::Draining.to_string(), "Draining");
        let cell = StateCell::new(SchedulerState::Flushing);
        assert_eq!(cell.get(), SchedulerState::Flushing);
    }
}
