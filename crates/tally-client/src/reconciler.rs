//! Version-based reconciliation of optimistic counter state.
//!
//! This module holds the decision logic independent of any runtime or UI, so
//! the session driver stays thin and every transition is unit-testable.
//!
//! # Per-request state machine
//!
//! ```text
//!   Idle ──begin_increment()──▶ Speculating ──▶ AwaitingRemote
//!                               (speculative += 1)     │
//!                      ┌───────────────────────────────┴──────────────┐
//!                      │ Applied                                      │ Rejected / transport error
//!                      ▼                                              ▼
//!        newer? adopt : skip as stale                           RollingBack
//!                      │                                   (pending_error set)
//!                      ▼                                              │ rollback()
//!                 Reconciled ──▶ Idle                                 ▼
//!                                                     RolledBack ──▶ Idle
//!                                              (speculative = confirmed.value)
//! ```
//!
//! `Speculating` is synchronous inside [`Reconciler::begin_increment`];
//! `Reconciled` and `RolledBack` are reported through [`ReconcileResult`] and
//! the request returns to idle in the same call.
//!
//! # Display rule
//!
//! `speculative` is a running accumulator shared by every in-flight request,
//! not a per-request value. Successful responses never pull it below the
//! confirmed value, and once no request is live it is resynced to exactly
//! `confirmed.value`. A rollback always resyncs to `confirmed.value`.

use std::collections::BTreeMap;
use std::fmt;

use tally_server::TransportError;
use tally_types::{Counter, MutationOutcome};
use tracing::{debug, info, trace, warn};

use crate::action::{CounterAction, reduce};

/// Identifies one `request_increment` within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Observable phase of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    /// Not live: never issued, or already reconciled / rolled back.
    Idle,
    /// Speculation applied, waiting for the endpoint.
    AwaitingRemote,
    /// Failure observed, waiting for the rollback delay to elapse.
    RollingBack,
}

/// What a reconciliation step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileResult {
    /// The response was newer than `confirmed` and replaced it.
    Adopted { confirmed: Counter },
    /// Nothing changed (see reason).
    Skipped { reason: SkipReason },
    /// The attempt failed; `rollback` must be called after the delay.
    RollbackScheduled { error: String },
    /// The display was resynced to the confirmed value.
    RolledBack { value: i64 },
}

/// Why a reconciliation step was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The response is not newer than what we already confirmed.
    Stale { incoming: Counter, confirmed: Counter },
    /// The request is not in a phase that accepts this step (duplicate or
    /// unknown id).
    NotAwaiting(RequestId),
}

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySnapshot {
    /// Value shown to the user (optimistic).
    pub value: i64,
    /// Last surfaced failure, shown alongside the value.
    pub error: Option<String>,
    /// Last snapshot accepted as authoritative.
    pub confirmed: Counter,
    /// Requests not yet back to idle.
    pub in_flight: usize,
}

/// Client display state plus the per-request phase table.
#[derive(Debug, Clone)]
pub struct Reconciler {
    confirmed: Counter,
    speculative: i64,
    pending_error: Option<String>,
    requests: BTreeMap<RequestId, RequestPhase>,
    next_request: u64,
}

impl Reconciler {
    /// Seed from an authoritative read.
    pub fn new(initial: Counter) -> Self {
        Self {
            confirmed: initial,
            speculative: initial.value,
            pending_error: None,
            requests: BTreeMap::new(),
            next_request: 1,
        }
    }

    pub fn confirmed(&self) -> Counter {
        self.confirmed
    }

    pub fn speculative(&self) -> i64 {
        self.speculative
    }

    pub fn pending_error(&self) -> Option<&str> {
        self.pending_error.as_deref()
    }

    /// Number of requests that have not returned to idle.
    pub fn in_flight(&self) -> usize {
        self.requests.len()
    }

    pub fn phase(&self, id: RequestId) -> RequestPhase {
        self.requests.get(&id).copied().unwrap_or(RequestPhase::Idle)
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            value: self.speculative,
            error: self.pending_error.clone(),
            confirmed: self.confirmed,
            in_flight: self.requests.len(),
        }
    }

    /// Apply an increment locally, before the endpoint is called.
    ///
    /// Clears any surfaced error. The caller must later feed the endpoint's
    /// answer to [`apply_outcome`](Self::apply_outcome) or
    /// [`apply_transport_error`](Self::apply_transport_error) with the
    /// returned id.
    pub fn begin_increment(&mut self) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;

        self.pending_error = None;
        self.speculative = reduce(self.speculative, CounterAction::Increment);
        self.requests.insert(id, RequestPhase::AwaitingRemote);

        trace!(
            request = %id,
            speculative = self.speculative,
            in_flight = self.requests.len(),
            "speculative increment"
        );
        id
    }

    /// Reconcile the endpoint's answer for `id`.
    ///
    /// - `Applied` newer than `confirmed` → adopt; otherwise skip as stale.
    /// - `Rejected` → record the error and schedule a rollback. The snapshot
    ///   carried by the rejection is adopted if newer, so the rollback lands
    ///   on the freshest authoritative value this session has seen.
    pub fn apply_outcome(&mut self, id: RequestId, outcome: MutationOutcome) -> ReconcileResult {
        if self.phase(id) != RequestPhase::AwaitingRemote {
            warn!(request = %id, phase = ?self.phase(id), "outcome for request not awaiting remote, skipping");
            return ReconcileResult::Skipped {
                reason: SkipReason::NotAwaiting(id),
            };
        }

        match outcome {
            MutationOutcome::Applied { counter } => {
                self.requests.remove(&id);
                let result = if self.adopt(counter) {
                    debug!(request = %id, confirmed = %counter, "adopted authoritative counter");
                    ReconcileResult::Adopted { confirmed: counter }
                } else {
                    debug!(
                        request = %id,
                        incoming = %counter,
                        confirmed = %self.confirmed,
                        "stale response, keeping confirmed"
                    );
                    ReconcileResult::Skipped {
                        reason: SkipReason::Stale {
                            incoming: counter,
                            confirmed: self.confirmed,
                        },
                    }
                };
                self.settle_display();
                result
            }
            MutationOutcome::Rejected { failure, counter } => {
                if self.adopt(counter) {
                    debug!(request = %id, confirmed = %counter, "adopted snapshot from rejection");
                }
                self.schedule_rollback(id, failure.to_string())
            }
        }
    }

    /// Treat a transport failure for `id` like a rejection, minus the snapshot.
    pub fn apply_transport_error(&mut self, id: RequestId, err: &TransportError) -> ReconcileResult {
        if self.phase(id) != RequestPhase::AwaitingRemote {
            warn!(request = %id, "transport error for request not awaiting remote, skipping");
            return ReconcileResult::Skipped {
                reason: SkipReason::NotAwaiting(id),
            };
        }
        self.schedule_rollback(id, err.to_string())
    }

    /// Resync the display to the confirmed value after a failure.
    ///
    /// Full resync rather than a decrement: other speculation may have
    /// happened since `id` was issued.
    pub fn rollback(&mut self, id: RequestId) -> ReconcileResult {
        if self.phase(id) != RequestPhase::RollingBack {
            warn!(request = %id, phase = ?self.phase(id), "rollback for request not rolling back, skipping");
            return ReconcileResult::Skipped {
                reason: SkipReason::NotAwaiting(id),
            };
        }

        self.requests.remove(&id);
        let from = self.speculative;
        self.speculative = reduce(self.speculative, CounterAction::SyncTo(self.confirmed.value));
        info!(
            request = %id,
            from,
            to = self.speculative,
            confirmed = %self.confirmed,
            "rolled back speculative value"
        );
        ReconcileResult::RolledBack {
            value: self.speculative,
        }
    }

    /// Adopt a snapshot from a fresh read if it is newer.
    pub fn refresh(&mut self, counter: Counter) -> bool {
        let adopted = self.adopt(counter);
        if adopted {
            debug!(confirmed = %counter, "refreshed from read endpoint");
            self.settle_display();
        }
        adopted
    }

    fn schedule_rollback(&mut self, id: RequestId, error: String) -> ReconcileResult {
        warn!(request = %id, %error, speculative = self.speculative, "increment failed, rollback scheduled");
        self.pending_error = Some(error.clone());
        self.requests.insert(id, RequestPhase::RollingBack);
        ReconcileResult::RollbackScheduled { error }
    }

    /// Monotonic acceptance: only strictly newer versions replace `confirmed`.
    fn adopt(&mut self, counter: Counter) -> bool {
        if counter.is_newer_than(&self.confirmed) {
            self.confirmed = counter;
            true
        } else {
            false
        }
    }

    fn settle_display(&mut self) {
        let target = if self.requests.is_empty() {
            self.confirmed.value
        } else {
            self.speculative.max(self.confirmed.value)
        };
        self.speculative = reduce(self.speculative, CounterAction::SyncTo(target));
    }
}

// ============================================================================
// Tests
// ============================================================================
