//! Logging scopes
//!
//! A scope is a piece of state pushed for the duration of an operation and
//! rendered by formatters that include scopes. The default provider keeps a
//! per-thread stack; the returned [`ScopeGuard`] pops the scope when dropped.

use super::log_context::LogState;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SCOPE_TOKEN: AtomicU64 = AtomicU64::new(1);

struct ScopeFrame {
    provider: u64,
    token: u64,
    state: Arc<LogState>,
}

thread_local! {
    static SCOPES: RefCell<Vec<ScopeFrame>> = const { RefCell::new(Vec::new()) };
}

/// Source of the scope chain visible to formatters
pub trait ScopeProvider: Send + Sync {
    /// Push a scope; it stays active until the guard is dropped
    fn push(&self, state: LogState) -> ScopeGuard;

    /// Visit active scopes, outermost first
    fn for_each_scope(&self, visit: &mut dyn FnMut(&LogState));
}

/// RAII guard for a pushed scope
///
/// Scopes are tied to the thread that pushed them, so the guard is `!Send`.
#[must_use = "the scope is popped as soon as the guard is dropped"]
pub struct ScopeGuard {
    on_drop: Option<Box<dyn FnOnce()>>,
    _not_send: PhantomData<*const ()>,
}

impl ScopeGuard {
    pub fn new(on_drop: impl FnOnce() + 'static) -> Self {
        Self {
            on_drop: Some(Box::new(on_drop)),
            _not_send: PhantomData,
        }
    }

    /// Guard that does nothing on drop
    pub fn noop() -> Self {
        Self {
            on_drop: None,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Some(on_drop) = self.on_drop.take() {
            on_drop();
        }
    }
}

/// Per-thread scope stack, isolated per provider instance
#[derive(Debug)]
pub struct ThreadScopeProvider {
    id: u64,
}

impl ThreadScopeProvider {
    pub fn new() -> Self {
        Self {
            id: NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl Default for ThreadScopeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeProvider for ThreadScopeProvider {
    fn push(&self, state: LogState) -> ScopeGuard {
        let token = NEXT_SCOPE_TOKEN.fetch_add(1, Ordering::Relaxed);
        SCOPES.with(|scopes| {
            scopes.borrow_mut().push(ScopeFrame {
                provider: self.id,
                token,
                state: Arc::new(state),
            });
        });

        ScopeGuard::new(move || {
            SCOPES.with(|scopes| {
                let mut scopes = scopes.borrow_mut();
                // Guards are usually dropped in reverse order; search from the top
                if let Some(pos) = scopes.iter().rposition(|frame| frame.token == token) {
                    scopes.remove(pos);
                }
            });
        })
    }

    fn for_each_scope(&self, visit: &mut dyn FnMut(&LogState)) {
        // Clone the handles so a visitor may push scopes without a RefCell conflict
        let states: Vec<Arc<LogState>> = SCOPES.with(|scopes| {
            scopes
                .borrow()
                .iter()
                .filter(|frame| frame.provider == self.id)
                .map(|frame| Arc::clone(&frame.state))
                .collect()
        });

        for state in &states {
            visit(state);
        }
    }
}

/// Provider with no scopes
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScopeProvider;

impl ScopeProvider for NullScopeProvider {
    fn push(&self, _state: LogState) -> ScopeGuard {
        ScopeGuard::noop()
    }

    fn for_each_scope(&self, _visit: &mut dyn FnMut(&LogState)) {}
}
