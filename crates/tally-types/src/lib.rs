//! Shared counter types for tally.
//!
//! This crate is the leaf every other tally crate builds on: the versioned
//! [`Counter`] snapshot, the [`MutationOutcome`] returned by the mutation
//! endpoint, and the single modeled failure kind. It has **no internal tally
//! dependencies**.
//!
//! # Key Types
//!
//! |---------------------|--------------------------------------------------|
//! | Type                | Purpose                                          |
//! |---------------------|--------------------------------------------------|
//! | [`Counter`]         | Immutable `(value, version)` snapshot            |
//! | [`MutationOutcome`] | Discriminated result of one increment attempt    |
//! | [`MutationFailure`] | Recoverable business failure of an attempt       |
//! | [`SessionId`]       | Which client session (UUIDv7)                    |
//! |---------------------|--------------------------------------------------|

pub mod counter;
pub mod ids;
pub mod outcome;

pub use counter::Counter;
pub use ids::SessionId;
pub use outcome::{MutationFailure, MutationOutcome, WireError};
