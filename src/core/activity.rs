//! Activity (distributed tracing) context
//!
//! Formatters that include activity tracking read the span, trace and parent
//! ids of the activity that was current when the entry was logged.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Id scheme of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityIdFormat {
    /// W3C trace context: 32-hex trace id, 16-hex span id
    W3C,
    /// Dotted ids rooted at `|root.`
    Hierarchical,
}

thread_local! {
    static CURRENT_ACTIVITY: RefCell<Option<TracingContext>> = const { RefCell::new(None) };
}

/// Tracing context for an activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingContext {
    format: ActivityIdFormat,

    /// Trace ID for request correlation
    trace_id: String,

    /// Span ID for this operation
    span_id: String,

    /// Parent span ID (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,

    #[serde(skip)]
    children: Arc<AtomicU64>,
}

impl TracingContext {
    /// Start a new root activity with W3C ids
    pub fn new_w3c() -> Self {
        Self {
            format: ActivityIdFormat::W3C,
            trace_id: random_hex::<16>(),
            span_id: random_hex::<8>(),
            parent_id: None,
            children: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start a new root activity with hierarchical ids
    pub fn new_hierarchical(root_id: impl Into<String>) -> Self {
        let root_id = root_id.into();
        Self {
            format: ActivityIdFormat::Hierarchical,
            span_id: format!("|{}.", root_id),
            trace_id: root_id,
            parent_id: None,
            children: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Adopt ids received from an upstream W3C `traceparent`
    pub fn from_w3c_ids(
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
        parent_id: Option<String>,
    ) -> Self {
        Self {
            format: ActivityIdFormat::W3C,
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            parent_id,
            children: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a child activity in the same trace
    #[must_use]
    pub fn child(&self) -> Self {
        let span_id = match self.format {
            ActivityIdFormat::W3C => random_hex::<8>(),
            ActivityIdFormat::Hierarchical => {
                let n = self.children.fetch_add(1, Ordering::Relaxed) + 1;
                format!("{}{}.", self.span_id, n)
            }
        };

        Self {
            format: self.format,
            trace_id: self.trace_id.clone(),
            span_id,
            parent_id: Some(self.span_id.clone()),
            children: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn format(&self) -> ActivityIdFormat {
        self.format
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Make this the current activity of the calling thread
    ///
    /// The previous activity is restored when the guard drops.
    pub fn enter(self) -> ActivityGuard {
        let previous = CURRENT_ACTIVITY.with(|current| current.borrow_mut().replace(self));
        ActivityGuard {
            previous,
            _not_send: PhantomData,
        }
    }

    /// The activity current on this thread, if any
    pub fn current() -> Option<TracingContext> {
        CURRENT_ACTIVITY.with(|current| current.borrow().clone())
    }
}

/// Restores the previously current activity on drop
#[must_use = "the activity stops being current as soon as the guard is dropped"]
pub struct ActivityGuard {
    previous: Option<TracingContext>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_ACTIVITY.with(|current| *current.borrow_mut() = previous);
    }
}

fn random_hex<const N: usize>() -> String {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; N];
    // All-zero ids are invalid in W3C trace context
    while bytes.iter().all(|b| *b == 0) {
        rng.fill(&mut bytes[..]);
    }
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_w3c_id_lengths() {
        let activity = TracingContext::new_w3c();
        assert_eq!(activity.trace_id().len(), 32);
        assert_eq!(activity.span_id().len(), 16);
        assert!(activity.parent_id().is_none());
        assert!(activity.trace_id().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_w3c_child_keeps_trace() {
        let parent = TracingContext::new_w3c();
        let child = parent.child();
        assert_eq!(child.trace_id(), parent.trace_id());
        assert_eq!(child.parent_id(), Some(parent.span_id()));
        assert_ne!(child.span_id(), parent.span_id());
    }

    #[test]
    fn test_hierarchical_ids() {
        let root = TracingContext::new_hierarchical("abc");
        assert_eq!(root.span_id(), "|abc.");
        assert_eq!(root.trace_id(), "abc");

        let first = root.child();
        let second = root.child();
        assert_eq!(first.span_id(), "|abc.1.");
        assert_eq!(second.span_id(), "|abc.2.");
        assert_eq!(first.parent_id(), Some("|abc."));
        assert_eq!(first.child().span_id(), "|abc.1.1.");
    }

    #[test]
    fn test_current_activity_guard() {
        assert!(TracingContext::current().is_none());
        {
            let _outer = TracingContext::new_hierarchical("outer").enter();
            {
                let _inner = TracingContext::new_hierarchical("inner").enter();
                assert_eq!(TracingContext::current().unwrap().trace_id(), "inner");
            }
            assert_eq!(TracingContext::current().unwrap().trace_id(), "outer");
        }
        assert!(TracingContext::current().is_none());
    }
}
