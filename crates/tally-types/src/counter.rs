//! The versioned counter snapshot.
//!
//! A `Counter` is a value object: once produced by the store it never changes.
//! The store hands out a new instance per successful increment, bumping
//! `version` by exactly one. Two snapshots with the same version always carry
//! the same value, so version alone decides which of two snapshots is newer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Immutable `(value, version)` snapshot of the authoritative counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counter {
    /// The counted quantity.
    pub value: i64,
    /// Generation number, bumped once per successful mutation.
    pub version: u64,
}

impl Counter {
    /// The state every store starts from: `{value: 0, version: 0}`.
    pub const ZERO: Counter = Counter { value: 0, version: 0 };

    pub const fn new(value: i64, version: u64) -> Self {
        Self { value, version }
    }

    /// The snapshot a single successful increment produces from `self`.
    ///
    /// `value` saturates at `i64::MAX`; `version` still advances, so the
    /// snapshot is newer even when the value cannot grow.
    pub const fn incremented(self) -> Self {
        Self {
            value: self.value.saturating_add(1),
            version: self.version + 1,
        }
    }

    /// True when `self` was produced after `other`.
    ///
    /// Strict: equal versions are never newer.
    pub fn is_newer_than(&self, other: &Counter) -> bool {
        self.version > other.version
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.value, self.version)
    }
}

// ============================================================================
// Tests
// ============================================================================
