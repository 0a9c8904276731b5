//! Sink metrics for observability
//!
//! Counters for monitoring sink health: records accepted and dropped,
//! batches delivered and failed, and pending-queue overflow events.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for sink observability
///
/// # Example
///
/// ```
/// use rust_loki_logger::SinkMetrics;
///
/// let metrics = SinkMetrics::new();
///
/// metrics.record_enqueued();
/// metrics.record_flushed(1);
///
/// assert_eq!(metrics.enqueued_count(), 1);
/// assert_eq!(metrics.flushed_records(), 1);
/// assert_eq!(metrics.flushed_batches(), 1);
/// ```
#[derive(Debug)]
pub struct SinkMetrics {
    /// Records accepted into the batch buffer
    enqueued: AtomicU64,

    /// Records discarded (sink draining, pending queue full, failed push)
    dropped: AtomicU64,

    /// Records delivered by successful pushes
    flushed_records: AtomicU64,

    /// Successful pushes
    flushed_batches: AtomicU64,

    /// Pushes that ended in an error
    failed_batches: AtomicU64,

    /// Number of times a full batch found the pending queue full
    queue_full_events: AtomicU64,
}

impl SinkMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            flushed_records: AtomicU64::new(0),
            flushed_batches: AtomicU64::new(0),
            failed_batches: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flushed_records(&self) -> u64 {
        self.flushed_records.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flushed_batches(&self) -> u64 {
        self.flushed_batches.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_batches(&self) -> u64 {
        self.failed_batches.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.enqueued.fetch_add(1, Ordering::Relaxed)
    }

    /// Record `count` discarded records
    #[inline]
    pub fn record_dropped(&self, count: u64) -> u64 {
        self.dropped.fetch_add(count, Ordering::Relaxed)
    }

    /// Record a successful push of `count` records
    #[inline]
    pub fn record_flushed(&self, count: u64) {
        self.flushed_records.fetch_add(count, Ordering::Relaxed);
        self.flushed_batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed push; its records count as dropped
    #[inline]
    pub fn record_failed(&self, count: u64) {
        self.failed_batches.fetch_add(1, Ordering::Relaxed);
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Drop rate as a percentage (0.0 - 100.0) of all records seen
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.enqueued_count() as f64;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total * 100.0).min(100.0)
        }
    }
}

impl Default for SinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SinkMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            enqueued: AtomicU64::new(self.enqueued_count()),
            dropped: AtomicU64::new(self.dropped_count()),
            flushed_records: AtomicU64::new(self.flushed_records()),
            flushed_batches: AtomicU64::new(self.flushed_batches()),
            failed_batches: AtomicU64::new(self.failed_batches()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
        }
    }
}
