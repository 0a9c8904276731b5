//! In-memory push client
//!
//! Captures every pushed batch instead of sending it. Used by tests,
//! benchmarks and the demo; clones share the same capture.

use super::PushClient;
use crate::core::{LogRecord, LoggerError, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Capture {
    batches: Mutex<Vec<Vec<LogRecord>>>,
    pushed: Condvar,
    failing: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MemoryPushClient {
    capture: Arc<Capture>,
}

impl MemoryPushClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent pushes fail (and record nothing)
    pub fn set_failing(&self, failing: bool) {
        self.capture.failing.store(failing, Ordering::SeqCst);
    }

    pub fn batch_count(&self) -> usize {
        self.capture.batches.lock().len()
    }

    pub fn record_count(&self) -> usize {
        self.capture.batches.lock().iter().map(Vec::len).sum()
    }

    /// Lines of every captured batch, in push order
    pub fn batches(&self) -> Vec<Vec<String>> {
        lines(&self.capture.batches.lock())
    }

    /// Full records of every captured batch
    pub fn records(&self) -> Vec<Vec<LogRecord>> {
        self.capture.batches.lock().clone()
    }

    /// Block until at least `count` batches arrived or `timeout` passed
    pub fn wait_for_batches(&self, count: usize, timeout: Duration) -> Vec<Vec<String>> {
        let deadline = Instant::now() + timeout;
        let mut batches = self.capture.batches.lock();
        while batches.len() < count {
            if self.capture.pushed.wait_until(&mut batches, deadline).timed_out() {
                break;
            }
        }
        lines(&batches)
    }
}

fn lines(batches: &[Vec<LogRecord>]) -> Vec<Vec<String>> {
    batches
        .iter()
        .map(|batch| batch.iter().map(|r| r.line().to_string()).collect())
        .collect()
}

impl PushClient for MemoryPushClient {
    fn push(&mut self, records: &[LogRecord]) -> Result<()> {
        if self.capture.failing.load(Ordering::SeqCst) {
            return Err(LoggerError::other("memory client set to fail"));
        }
        self.capture.batches.lock().push(records.to_vec());
        self.capture.pushed.notify_all();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LabelSet;

    #[test]
    fn test_clones_share_capture() {
        let client = MemoryPushClient::new();
        let mut writer = client.clone();
        writer
            .push(&[LogRecord::now(LabelSet::new(), "one")])
            .unwrap();

        assert_eq!(client.batches(), vec![vec!["one"]]);
        assert_eq!(client.record_count(), 1);
    }

    #[test]
    fn test_failing_mode() {
        let mut client = MemoryPushClient::new();
        client.set_failing(true);
        assert!(client.push(&[LogRecord::now(LabelSet::new(), "x")]).is_err());
        assert_eq!(client.batch_count(), 0);
    }

    #[test]
    fn test_wait_times_out() {
        let client = MemoryPushClient::new();
        let start = Instant::now();
        assert!(client.wait_for_batches(1, Duration::from_millis(20)).is_empty());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
