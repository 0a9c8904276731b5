//! Double-buffered record accumulator
//!
//! [`BatchBuffer`] holds one active slot behind a mutex. Producers append to
//! it; when an append fills the slot it is detached as a [`Batch`] and a fresh
//! slot is taken from the [`BufferPool`]. A detached batch goes back to the
//! pool when the flush path releases (or drops) it, so at any instant a slot
//! is either accepting writes, awaiting flush, or pooled.
//!
//! Every detached batch carries a sequence number assigned under the mutex,
//! which gives the detach order across both full and forced swaps.

use super::log_record::LogRecord;
use crossbeam_channel::{Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Default number of idle slots kept for reuse
pub const DEFAULT_POOLED_SLOTS: usize = 4;

/// Pool of reusable slot storage
#[derive(Debug)]
pub struct BufferPool {
    slot_capacity: usize,
    max_pooled: usize,
    free: Mutex<Vec<Vec<LogRecord>>>,
}

impl BufferPool {
    pub fn new(slot_capacity: usize, max_pooled: usize) -> Self {
        Self {
            slot_capacity,
            max_pooled,
            free: Mutex::new(Vec::new()),
        }
    }

    /// Take an empty slot, allocating if the pool is empty
    pub fn acquire(&self) -> Vec<LogRecord> {
        self.free
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.slot_capacity))
    }

    /// Give a consumed slot back
    pub fn release(&self, mut slot: Vec<LogRecord>) {
        slot.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_pooled {
            free.push(slot);
        }
    }

    /// Free every pooled slot
    pub fn clear(&self) {
        self.free.lock().clear();
    }

    pub fn pooled(&self) -> usize {
        self.free.lock().len()
    }

    pub fn slot_capacity(&self) -> usize {
        self.slot_capacity
    }
}

/// A detached slot, owned by the flush path
///
/// Its storage returns to the pool on [`Batch::release`] or drop.
#[derive(Debug)]
pub struct Batch {
    records: Vec<LogRecord>,
    sequence: u64,
    pool: Option<Arc<BufferPool>>,
}

impl Batch {
    fn new(records: Vec<LogRecord>, sequence: u64, pool: Arc<BufferPool>) -> Self {
        Self {
            records,
            sequence,
            pool: Some(pool),
        }
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position in detach order
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Return the storage to the pool
    pub fn release(self) {
        drop(self);
    }

    /// Take the records out; the storage is not pooled
    pub fn into_records(mut self) -> Vec<LogRecord> {
        self.pool = None;
        std::mem::take(&mut self.records)
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(std::mem::take(&mut self.records));
        }
    }
}

/// Outcome of [`BatchBuffer::add`]
#[derive(Debug)]
pub enum SwapResult {
    /// The record was appended; the slot is not full yet
    NotSwapped,
    /// The slot filled up and was detached
    Swapped(Batch),
    /// The slot filled up and was handed to the flush queue
    Queued { len: usize },
    /// The record would have filled the slot while the flush queue was full;
    /// only that record was discarded. `pending` is the queue length seen.
    Overflowed { len: usize, pending: usize },
}

impl SwapResult {
    pub fn is_swapped(&self) -> bool {
        !matches!(self, SwapResult::NotSwapped)
    }
}

struct ActiveSlot {
    records: Vec<LogRecord>,
    next_sequence: u64,
}

/// Fixed-capacity, thread-safe accumulator
pub struct BatchBuffer {
    capacity: usize,
    active: Mutex<ActiveSlot>,
    pool: Arc<BufferPool>,
    flush_queue: Option<Sender<Batch>>,
}

impl BatchBuffer {
    /// Buffer whose full slots are returned to the caller of `add`
    pub fn new(capacity: usize, pool: Arc<BufferPool>) -> Self {
        Self::build(capacity, pool, None)
    }

    /// Buffer whose full slots are pushed into `flush_queue`
    ///
    /// The push happens under the buffer mutex, so queue order equals
    /// detach order.
    pub fn with_flush_queue(capacity: usize, pool: Arc<BufferPool>, flush_queue: Sender<Batch>) -> Self {
        Self::build(capacity, pool, Some(flush_queue))
    }

    fn build(capacity: usize, pool: Arc<BufferPool>, flush_queue: Option<Sender<Batch>>) -> Self {
        let capacity = capacity.max(1);
        let records = pool.acquire();
        Self {
            capacity,
            active: Mutex::new(ActiveSlot {
                records,
                next_sequence: 0,
            }),
            pool,
            flush_queue,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records currently in the active slot
    pub fn len(&self) -> usize {
        self.active.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Append a record, detaching the slot when it reaches capacity
    ///
    /// With a flush queue, a record that would fill the slot while the queue
    /// is full is rejected and the slot keeps what it already holds.
    pub fn add(&self, record: LogRecord) -> SwapResult {
        let mut active = self.active.lock();
        let fills_slot = active.records.len() + 1 >= self.capacity;

        // Only producers send, and they do so under this mutex, so the queue
        // cannot fill up between this check and the send below.
        if let Some(queue) = &self.flush_queue {
            if fills_slot && queue.is_full() {
                return SwapResult::Overflowed {
                    len: 1,
                    pending: queue.len(),
                };
            }
        }

        active.records.push(record);
        if !fills_slot {
            return SwapResult::NotSwapped;
        }

        let batch = self.detach(&mut active);
        let len = batch.len();
        match &self.flush_queue {
            None => SwapResult::Swapped(batch),
            Some(queue) => match queue.try_send(batch) {
                Ok(()) => SwapResult::Queued { len },
                Err(TrySendError::Full(batch)) | Err(TrySendError::Disconnected(batch)) => {
                    // Worker gone: nothing will flush this batch
                    SwapResult::Overflowed {
                        len: batch.len(),
                        pending: queue.len(),
                    }
                }
            },
        }
    }

    /// Detach whatever the active slot holds, possibly nothing
    pub fn swap(&self) -> Batch {
        let mut active = self.active.lock();
        self.detach(&mut active)
    }

    fn detach(&self, active: &mut ActiveSlot) -> Batch {
        let fresh = self.pool.acquire();
        let records = std::mem::replace(&mut active.records, fresh);
        let sequence = active.next_sequence;
        active.next_sequence += 1;
        Batch::new(records, sequence, Arc::clone(&self.pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::labels::LabelSet;
    use crossbeam_channel::bounded;

    fn record(i: usize) -> LogRecord {
        LogRecord::now(LabelSet::new(), format!("line {}", i))
    }

    fn lines(batch: &Batch) -> Vec<String> {
        batch.records().iter().map(|r| r.line().to_string()).collect()
    }

    #[test]
    fn test_partial_swap_preserves_order() {
        let buffer = BatchBuffer::new(10, Arc::new(BufferPool::new(10, 2)));
        for i in 0..4 {
            assert!(matches!(buffer.add(record(i)), SwapResult::NotSwapped));
        }

        let batch = buffer.swap();
        assert_eq!(lines(&batch), vec!["line 0", "line 1", "line 2", "line 3"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_full_slot_swaps_immediately() {
        let buffer = BatchBuffer::new(3, Arc::new(BufferPool::new(3, 2)));
        assert!(!buffer.add(record(0)).is_swapped());
        assert!(!buffer.add(record(1)).is_swapped());

        match buffer.add(record(2)) {
            SwapResult::Swapped(batch) => {
                assert_eq!(batch.len(), 3);
                assert_eq!(batch.sequence(), 0);
            }
            other => panic!("expected swap, got {:?}", other),
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_empty_swap() {
        let buffer = BatchBuffer::new(3, Arc::new(BufferPool::new(3, 2)));
        let batch = buffer.swap();
        assert!(batch.is_empty());
        assert_eq!(buffer.swap().sequence(), 1);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let buffer = BatchBuffer::new(4, Arc::new(BufferPool::new(4, 2)));
        for i in 0..50 {
            if let SwapResult::Swapped(batch) = buffer.add(record(i)) {
                assert_eq!(batch.len(), 4);
            }
            assert!(buffer.len() < 4);
        }
    }

    #[test]
    fn test_released_slots_are_reused() {
        let pool = Arc::new(BufferPool::new(2, 2));
        let buffer = BatchBuffer::new(2, Arc::clone(&pool));
        assert_eq!(pool.pooled(), 0);

        buffer.add(record(0));
        let batch = match buffer.add(record(1)) {
            SwapResult::Swapped(batch) => batch,
            other => panic!("expected swap, got {:?}", other),
        };
        assert_eq!(pool.pooled(), 0);

        batch.release();
        assert_eq!(pool.pooled(), 1);

        // Next swap takes the pooled slot
        buffer.swap().release();
        assert_eq!(pool.pooled(), 1);

        pool.clear();
        assert_eq!(pool.pooled(), 0);
    }

    #[test]
    fn test_into_records_detaches_from_pool() {
        let pool = Arc::new(BufferPool::new(2, 2));
        let buffer = BatchBuffer::new(2, Arc::clone(&pool));
        buffer.add(record(0));
        let records = buffer.swap().into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(pool.pooled(), 0);
    }

    #[test]
    fn test_flush_queue_keeps_detach_order() {
        let (tx, rx) = bounded(8);
        let buffer = BatchBuffer::with_flush_queue(2, Arc::new(BufferPool::new(2, 2)), tx);

        for i in 0..6 {
            let result = buffer.add(record(i));
            if i % 2 == 1 {
                assert!(matches!(result, SwapResult::Queued { len: 2 }));
            }
        }

        let sequences: Vec<u64> = rx.try_iter().map(|b| b.sequence()).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn test_flush_queue_overflow() {
        let (tx, _rx) = bounded(1);
        let buffer = BatchBuffer::with_flush_queue(1, Arc::new(BufferPool::new(1, 2)), tx);

        assert!(matches!(buffer.add(record(0)), SwapResult::Queued { len: 1 }));
        assert!(matches!(
            buffer.add(record(1)),
            SwapResult::Overflowed { len: 1, pending: 1 }
        ));
    }

    #[test]
    fn test_overflow_keeps_accepted_records() {
        let (tx, rx) = bounded(1);
        let buffer = BatchBuffer::with_flush_queue(2, Arc::new(BufferPool::new(2, 2)), tx);

        buffer.add(record(0));
        assert!(matches!(buffer.add(record(1)), SwapResult::Queued { len: 2 }));

        // Accepted into the active slot while the queue is full
        assert!(matches!(buffer.add(record(2)), SwapResult::NotSwapped));
        // Would fill the slot: rejected on its own
        assert!(matches!(
            buffer.add(record(3)),
            SwapResult::Overflowed { len: 1, pending: 1 }
        ));
        assert_eq!(buffer.len(), 1);

        // Once the queue drains the slot fills and ships normally
        assert_eq!(lines(&rx.try_recv().unwrap()), vec!["line 0", "line 1"]);
        assert!(matches!(buffer.add(record(4)), SwapResult::Queued { len: 2 }));
        assert_eq!(lines(&rx.try_recv().unwrap()), vec!["line 2", "line 4"]);
    }

    #[test]
    fn test_concurrent_adds_lose_nothing() {
        let buffer = Arc::new(BatchBuffer::new(7, Arc::new(BufferPool::new(7, 4))));
        let mut handles = Vec::new();

        for t in 0..8 {
            let buffer = Arc::clone(&buffer);
            handles.push(std::thread::spawn(move || {
                let mut seen = Vec::new();
                for i in 0..500 {
                    if let SwapResult::Swapped(batch) = buffer.add(record(t * 1000 + i)) {
                        seen.extend(lines(&batch));
                    }
                }
                seen
            }));
        }

        let mut all: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.extend(lines(&buffer.swap()));

        assert_eq!(all.len(), 8 * 500);
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 8 * 500);
    }
}
