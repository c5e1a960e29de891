//! Typed session identifier.
//!
//! Wraps a UUIDv7 (time-ordered, globally unique). Displays as standard UUID
//! text for logging; the `short()` form (first 8 hex chars) is for human-facing
//! output only and never used as a lookup key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A client session identifier (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Create a new time-ordered ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// First 8 hex characters — for human display only.
    pub fn short(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }

    /// Prefer a label for display; fall back to short hex.
    pub fn display_or(&self, label: Option<&str>) -> String {
        match label {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => self.short(),
        }
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.short())
    }
}
