//! Stress tests for the batching pipeline
//!
//! These tests verify:
//! - No record is lost or duplicated under concurrent producers
//! - Delivery order per producer survives batching
//! - Shutdown and reload under load drain everything accepted
//! - Pending-queue overflow drops only the incoming record and reports it

use rust_loki_logger::core::{
    BatchOptions, LabelSet, LogRecord, LoggerError, LokiLoggerOptions, LokiSink, Notifications,
    PushClientKind,
};
use rust_loki_logger::push::{MemoryPushClient, PushClient};
use rust_loki_logger::LokiLoggerProvider;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn sink(client: &MemoryPushClient, batch_size: usize, period: Duration) -> LokiSink {
    LokiSink::new(
        Box::new(client.clone()),
        &BatchOptions {
            batch_size,
            period,
            max_pending_batches: 64,
        },
        Notifications::new(),
    )
    .expect("Failed to build sink")
}

/// N producers × M records each arrive exactly once
#[test]
fn test_concurrent_producers_lose_nothing() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 250;

    let client = MemoryPushClient::new();
    let sink = Arc::new(sink(&client, 100, Duration::from_millis(5)));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    sink.enqueue_message(LogRecord::now(LabelSet::new(), format!("{}-{}", p, i)));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("producer panicked");
    }

    assert!(sink.shutdown(Duration::from_secs(5)));

    let lines: Vec<String> = client.batches().into_iter().flatten().collect();
    assert_eq!(lines.len(), PRODUCERS * PER_PRODUCER);
    let unique: HashSet<&String> = lines.iter().collect();
    assert_eq!(unique.len(), PRODUCERS * PER_PRODUCER);

    for batch in client.batches() {
        assert!(batch.len() <= 100);
    }
    assert_eq!(sink.metrics().dropped_count(), 0);
}

/// Records from one producer keep their relative order across batches
#[test]
fn test_per_producer_order_is_preserved() {
    let client = MemoryPushClient::new();
    let sink = Arc::new(sink(&client, 7, Duration::from_millis(1)));

    let handles: Vec<_> = (0..3)
        .map(|p| {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                for i in 0..300 {
                    sink.enqueue_message(LogRecord::now(LabelSet::new(), format!("{}:{}", p, i)));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("producer panicked");
    }
    assert!(sink.shutdown(Duration::from_secs(5)));

    let mut last_seen = [None::<usize>; 3];
    for line in client.batches().into_iter().flatten() {
        let (producer, seq) = line.split_once(':').expect("malformed line");
        let producer: usize = producer.parse().unwrap();
        let seq: usize = seq.parse().unwrap();
        if let Some(previous) = last_seen[producer] {
            assert!(seq > previous, "producer {} went from {} to {}", producer, previous, seq);
        }
        last_seen[producer] = Some(seq);
    }
    assert_eq!(last_seen, [Some(299); 3]);
}

/// Shutdown racing producers: everything accepted is delivered, the rest dropped
#[test]
fn test_shutdown_during_load_accounts_for_every_record() {
    let client = MemoryPushClient::new();
    let sink = Arc::new(sink(&client, 50, Duration::from_millis(2)));
    let attempted = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|p| {
            let sink = Arc::clone(&sink);
            let attempted = Arc::clone(&attempted);
            thread::spawn(move || {
                for i in 0..500 {
                    sink.enqueue_message(LogRecord::now(LabelSet::new(), format!("{}-{}", p, i)));
                    attempted.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(5));
    assert!(sink.shutdown(Duration::from_secs(5)));
    for handle in handles {
        handle.join().expect("producer panicked");
    }

    let metrics = sink.metrics();
    let delivered = client.record_count() as u64;
    assert!(delivered <= metrics.enqueued_count());
    assert_eq!(delivered, metrics.flushed_records());
    assert_eq!(
        delivered + metrics.dropped_count(),
        attempted.load(Ordering::SeqCst) as u64
    );
}

/// A stalled transport fills the pending queue; only records arriving while
/// it is full are dropped, never records already buffered
#[test]
fn test_pending_queue_overflow_keeps_buffered_records() {
    struct StalledClient(Arc<AtomicUsize>);

    impl PushClient for StalledClient {
        fn push(&mut self, records: &[LogRecord]) -> rust_loki_logger::Result<()> {
            thread::sleep(Duration::from_millis(200));
            self.0.fetch_add(records.len(), Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    let delivered = Arc::new(AtomicUsize::new(0));
    let notifications = Notifications::new();
    let overflows = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&overflows);
    notifications.on_notification(move |n| {
        if matches!(n.error(), Some(LoggerError::QueueFull { .. })) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let sink = LokiSink::new(
        Box::new(StalledClient(Arc::clone(&delivered))),
        &BatchOptions {
            batch_size: 3,
            period: Duration::from_secs(60),
            max_pending_batches: 2,
        },
        notifications,
    )
    .unwrap();

    for i in 0..20 {
        sink.enqueue_message(LogRecord::now(LabelSet::new(), format!("{}", i)));
    }
    assert!(sink.shutdown(Duration::from_secs(10)));

    let metrics = sink.metrics();
    assert!(metrics.queue_full_events() > 0);
    assert_eq!(overflows.load(Ordering::SeqCst) as u64, metrics.queue_full_events());
    // One record per overflow, nothing that was already buffered
    assert_eq!(metrics.dropped_count(), metrics.queue_full_events());
    assert_eq!(
        delivered.load(Ordering::SeqCst) as u64 + metrics.dropped_count(),
        20
    );
    assert_eq!(delivered.load(Ordering::SeqCst) as u64, metrics.enqueued_count());
}

/// Reloading while producers log neither loses nor duplicates records
#[test]
fn test_reload_under_load() {
    let client = MemoryPushClient::new();
    let capture = client.clone();

    let mut options = LokiLoggerOptions::default();
    options.client = PushClientKind::Http;
    options.batch.batch_size = 25;
    options.batch.period = Duration::from_millis(5);

    let provider = Arc::new(
        LokiLoggerProvider::builder()
            .options(options.clone())
            .push_client_factory(Arc::new(move |_: &LokiLoggerOptions| {
                Ok(Some(Box::new(capture.clone()) as Box<dyn PushClient>))
            }))
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..3)
        .map(|p| {
            let logger = provider.create_logger(&format!("producer{}", p)).unwrap();
            thread::spawn(move || {
                for i in 0..400 {
                    logger.info(format!("{}-{}", p, i));
                }
            })
        })
        .collect();

    for _ in 0..5 {
        thread::sleep(Duration::from_millis(2));
        provider.reload(options.clone()).unwrap();
    }
    for handle in handles {
        handle.join().expect("producer panicked");
    }
    provider.dispose();

    // Calls racing a reload move on to the new sink: exactly once each
    let lines: Vec<String> = client.batches().into_iter().flatten().collect();
    let unique: HashSet<&String> = lines.iter().collect();
    assert_eq!(unique.len(), lines.len());
    assert_eq!(lines.len(), 3 * 400);
}
