//! The authoritative counter.
//!
//! Exactly one [`Counter`] lives here for the lifetime of the handle. The only
//! mutation is [`AuthoritativeStore::increment`], which runs inside a
//! `parking_lot::Mutex` critical section: concurrent callers are serialized so
//! every call produces its own version, none are lost and none are repeated.

use std::sync::Arc;

use parking_lot::Mutex;
use tally_types::Counter;
use tracing::trace;

/// Shared, thread-safe handle to a store.
pub type SharedStore = Arc<AuthoritativeStore>;

/// Create a fresh store at `{0, 0}` wrapped for sharing.
pub fn shared_store() -> SharedStore {
    Arc::new(AuthoritativeStore::new())
}

/// Holds the single source of truth.
#[derive(Debug, Default)]
pub struct AuthoritativeStore {
    initial: Counter,
    current: Mutex<Counter>,
}

impl AuthoritativeStore {
    /// A store initialized to `{value: 0, version: 0}`.
    pub fn new() -> Self {
        Self::with_initial(Counter::ZERO)
    }

    /// A store seeded with an arbitrary starting snapshot (tests, restarts).
    ///
    /// A seed at `i64::MAX` keeps that value on increment; see
    /// [`Counter::incremented`].
    pub fn with_initial(initial: Counter) -> Self {
        Self {
            initial,
            current: Mutex::new(initial),
        }
    }

    /// Snapshot of the current state. No side effect.
    pub fn read(&self) -> Counter {
        *self.current.lock()
    }

    /// Apply one increment and return the resulting snapshot.
    pub fn increment(&self) -> Counter {
        let mut current = self.current.lock();
        let next = current.incremented();
        *current = next;
        trace!(value = next.value, version = next.version, "store incremented");
        next
    }

    /// Increments applied since construction.
    pub fn increment_count(&self) -> u64 {
        self.read().version - self.initial.version
    }
}

// ============================================================================
// Tests
// ============================================================================
