//! Display-value actions.
//!
//! Every change to the speculative value goes through [`reduce`], so the
//! arithmetic lives in one pure function and the reconciler only decides
//! *which* action to apply.

/// A change to the displayed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterAction {
    Increment,
    Decrement,
    /// Replace the value outright (resync to a confirmed snapshot).
    SyncTo(i64),
}

/// Apply `action` to `state`. Steps saturate at the `i64` bounds.
pub fn reduce(state: i64, action: CounterAction) -> i64 {
    match action {
        CounterAction::Increment => state.saturating_add(1),
        CounterAction::Decrement => state.saturating_sub(1),
        CounterAction::SyncTo(value) => value,
    }
}
