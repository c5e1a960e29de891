//! Server side of tally: the authoritative counter and the gateway clients
//! mutate it through.
//!
//! ```text
//!   ClientSession ──attempt_increment()──▶ MutationGateway
//!                                           │ capture `before`
//!                                           │ sleep(latency.sample())
//!                                           │ failure.should_fail()?
//!                                           ├── yes ─▶ Rejected { before }
//!                                           └── no  ─▶ store.increment() ─▶ Applied { after }
//! ```
//!
//! The store is an explicitly owned [`SharedStore`] handle rather than a
//! process global, so each test (or each simulated process) gets its own.

pub mod config;
pub mod constants;
pub mod failure;
pub mod gateway;
pub mod latency;
pub mod store;

pub use config::{ConfigError, GatewayConfig};
pub use failure::{AlwaysFail, AlwaysSucceed, FailurePolicy, RandomFailure, ScriptedFailure};
pub use gateway::{GatewayStats, MutationEndpoint, MutationGateway, TransportError};
pub use latency::{FixedLatency, LatencyModel, NoLatency, UniformLatency};
pub use store::{AuthoritativeStore, SharedStore, shared_store};
