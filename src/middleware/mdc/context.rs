//! The per-request diagnostic context.
//!
//! A [`DiagnosticContext`] is an ordered key/value store bound to the tokio
//! task that handles one request. Server dispatch opens the scope with
//! [`DiagnosticContext::scope`]; the interceptor writes into it; the logging
//! sink reads it through [`DiagnosticContext::current`] when an event is
//! emitted. Because the slot is task-local, it follows the logical request
//! across worker threads and is never visible to a concurrent request.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;

tokio::task_local! {
    static CURRENT: DiagnosticContext;
}

/// Handle to one request's diagnostic context. Clones share the same store.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticContext {
    entries: Arc<Mutex<IndexMap<String, String>>>,
}

impl DiagnosticContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The context of the request running on the current task, if any.
    pub fn current() -> Option<Self> {
        CURRENT.try_with(Self::clone).ok()
    }

    /// Runs `fut` as a request scope with `self` as its context.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CURRENT.scope(self, fut).await
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Removes every entry, not only the ones the caller wrote.
    pub fn clear_all(&self) {
        self.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A copy of the current entries in insertion order.
    pub fn snapshot(&self) -> IndexMap<String, String> {
        self.lock().clone()
    }

    /// The store holds plain strings, so a panic mid-insert cannot leave it
    /// inconsistent; recover from poisoning instead of propagating it.
    fn lock(&self) -> MutexGuard<'_, IndexMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the whole context when dropped.
///
/// Held across the delegate call, so the clear runs on return, on panic
/// unwinding, and when the request future is dropped mid-flight.
pub(crate) struct ClearOnDrop(pub(crate) DiagnosticContext);

impl Drop for ClearOnDrop {
    fn drop(&mut self) {
        self.0.clear_all();
        tracing::trace!("diagnostic context cleared");
    }
}
