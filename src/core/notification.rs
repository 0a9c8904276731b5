//! Push outcome notifications
//!
//! Every provider owns one [`Notifications`] hub, shared with the sinks it
//! builds. Flush outcomes and internal failures are published here instead of
//! being raised at the logging call site. Handlers run on the flush worker;
//! a panicking handler is isolated and reported on stderr.

use super::error::LoggerError;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(1);

/// Events buffered per subscriber; later events are dropped until it reads
pub const SUBSCRIBER_CAPACITY: usize = 1024;

/// Identifies the sink that raised a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(u64);

impl SinkId {
    pub(crate) fn next() -> Self {
        SinkId(NEXT_SINK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum NotificationKind {
    /// A batch of `count` records was accepted by the endpoint
    FlushCompleted { count: usize },
    /// Something failed; the affected batch (if any) was discarded
    ExceptionRaised(Arc<LoggerError>),
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub sender: SinkId,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn flushed_count(&self) -> Option<usize> {
        match self.kind {
            NotificationKind::FlushCompleted { count } => Some(count),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LoggerError> {
        match &self.kind {
            NotificationKind::ExceptionRaised(err) => Some(err),
            _ => None,
        }
    }
}

/// Callback type for notifications
pub type NotificationCallback = Arc<dyn Fn(&Notification) + Send + Sync>;

#[derive(Default)]
struct Inner {
    callbacks: RwLock<Vec<NotificationCallback>>,
    subscribers: Mutex<Vec<Sender<Notification>>>,
}

/// Per-instance notification hub
#[derive(Clone, Default)]
pub struct Notifications {
    inner: Arc<Inner>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked for every notification
    pub fn on_notification<F>(&self, callback: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.inner.callbacks.write().push(Arc::new(callback));
    }

    /// Receive notifications through a channel
    ///
    /// Dropping the receiver unsubscribes it. A subscriber holding
    /// [`SUBSCRIBER_CAPACITY`] unread events misses further ones.
    pub fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = bounded(SUBSCRIBER_CAPACITY);
        self.inner.subscribers.lock().push(tx);
        rx
    }

    pub fn flush_completed(&self, sender: SinkId, count: usize) {
        self.publish(Notification {
            sender,
            kind: NotificationKind::FlushCompleted { count },
        });
    }

    pub fn exception_raised(&self, sender: SinkId, error: LoggerError) {
        self.publish(Notification {
            sender,
            kind: NotificationKind::ExceptionRaised(Arc::new(error)),
        });
    }

    /// Deliver to every callback and subscriber; never panics
    pub fn publish(&self, notification: Notification) {
        // Snapshot so a callback may register further callbacks
        let callbacks: Vec<NotificationCallback> = self.inner.callbacks.read().clone();

        for (idx, callback) in callbacks.iter().enumerate() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(&notification)
            }));
            if let Err(panic_info) = result {
                eprintln!(
                    "[LOKI CRITICAL] Notification handler #{} panicked: {}. \
                     Other handlers continue to function.",
                    idx,
                    panic_message(panic_info.as_ref())
                );
            }
        }

        let delivered = {
            let mut subscribers = self.inner.subscribers.lock();
            subscribers.retain(|tx| match tx.try_send(notification.clone()) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
            !subscribers.is_empty()
        };

        if callbacks.is_empty() && !delivered {
            if let NotificationKind::ExceptionRaised(err) = &notification.kind {
                eprintln!("[LOKI ERROR] {}: {}", notification.sender, err);
            }
        }
    }

    pub fn callback_count(&self) -> usize {
        self.inner.callbacks.read().len()
    }
}

impl fmt::Debug for Notifications {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifications")
            .field("callbacks", &self.inner.callbacks.read().len())
            .field("subscribers", &self.inner.subscribers.lock().len())
            .finish()
    }
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
