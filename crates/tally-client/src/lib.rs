//! Optimistic counter client for tally.
//!
//! Two layers, mirroring how the reconciliation is tested:
//!
//! - [`Reconciler`] — pure, synchronous state machine. Owns the confirmed
//!   snapshot, the speculative display value and the pending error. No
//!   runtime, no I/O; every transition is unit-testable.
//! - [`ClientSession`] — async driver. Speculates immediately, calls the
//!   [`MutationEndpoint`](tally_server::MutationEndpoint), feeds the response
//!   back into the reconciler and schedules rollbacks. Publishes every change
//!   as a [`DisplaySnapshot`] on a `watch` channel for whatever renders it.

pub mod action;
pub mod config;
pub mod constants;
pub mod reconciler;
pub mod session;

pub use action::{CounterAction, reduce};
pub use config::SessionConfig;
pub use reconciler::{
    DisplaySnapshot, ReconcileResult, Reconciler, RequestId, RequestPhase, SkipReason,
};
pub use session::{ClientSession, PendingIncrement, SessionError};
