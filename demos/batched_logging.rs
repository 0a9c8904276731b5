//! Batched logging example
//!
//! Demonstrates labels, scopes, activities and push notifications.
//! Records are captured in memory unless LOKI_ADDRESS points at a Loki
//! instance (for example `http://localhost:3100`).
//!
//! Run with: cargo run --example batched_logging

use rust_loki_logger::prelude::*;
use rust_loki_logger::push::{MemoryPushClient, PushClient};
use rust_loki_logger::{loki_info, loki_log};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Loki Logger - Batched Logging Example ===\n");

    let mut options = LokiLoggerOptions::default();
    options.client = PushClientKind::Http;
    options.formatter = FormatterKind::Logfmt;
    options.batch.batch_size = 10;
    options.batch.period = Duration::from_millis(200);
    options.static_labels.job_name = "demo".to_string();
    options.dynamic_labels.include_category = true;
    options.logfmt_formatter.include_scopes = true;

    let capture = MemoryPushClient::new();
    let mut builder = LokiLoggerProvider::builder().options(options.clone());
    match std::env::var("LOKI_ADDRESS") {
        Ok(address) => {
            println!("Pushing to {}", address);
            options.http.address = address;
            builder = builder.options(options.clone());
        }
        Err(_) => {
            println!("LOKI_ADDRESS not set, capturing pushes in memory");
            let client = capture.clone();
            builder = builder.push_client_factory(Arc::new(move |_: &LokiLoggerOptions| {
                Ok(Some(Box::new(client.clone()) as Box<dyn PushClient>))
            }));
        }
    }
    let provider = builder.build()?;

    provider.notifications().on_notification(|n| match &n.kind {
        NotificationKind::FlushCompleted { count } => {
            println!("   [{}] pushed {} records", n.sender, count)
        }
        NotificationKind::ExceptionRaised(err) => {
            println!("   [{}] push failed: {}", n.sender, err)
        }
    });

    println!("\n1. Size-triggered batches:");
    let logger = provider.create_logger("demo::orders")?;
    for i in 0..25 {
        loki_info!(logger, "Order #{} accepted", i);
    }
    thread::sleep(Duration::from_millis(400));

    println!("\n2. Scopes and activities:");
    {
        let _scope = logger.begin_scope(LogState::fields().with_field("tenant", "acme"));
        let _activity = TracingContext::new_w3c().enter();
        loki_log!(logger, LogLevel::Warning; "orderId" => 7, "retries" => 2; "Order {} slow", 7);
        logger.log_error(
            LogLevel::Error,
            "Payment lookup failed",
            &std::io::Error::new(std::io::ErrorKind::TimedOut, "gateway timeout"),
        );
    }
    thread::sleep(Duration::from_millis(400));

    println!("\n3. Multi-threaded logging:");
    let mut handles = vec![];
    for thread_id in 0..4 {
        let logger = provider.create_logger(&format!("demo::worker{}", thread_id))?;
        handles.push(thread::spawn(move || {
            for i in 0..20 {
                logger.info(format!("Thread {} - Message {}", thread_id, i));
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker panicked");
    }

    println!("\n4. Reloading with JSON bodies:");
    options.formatter = FormatterKind::Json;
    provider.reload(options)?;
    logger.info("Rendered as JSON after reload");

    if let Some(metrics) = provider.metrics() {
        println!(
            "   enqueued={} dropped={}",
            metrics.enqueued_count(),
            metrics.dropped_count()
        );
    }

    provider.dispose();

    if capture.batch_count() > 0 {
        println!("\nCaptured lines:");
        for line in capture.batches().into_iter().flatten().take(5) {
            println!("   {}", line.trim_end());
        }
    }

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
