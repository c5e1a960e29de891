//! Multi-session simulation for tally.
//!
//! Several named client sessions (one per page showing the counter) share a
//! single authoritative store behind one simulated gateway. Each session
//! clicks repeatedly without waiting for earlier clicks to resolve; at the end
//! every session refreshes and must show exactly the store's value.

pub mod config;
pub mod sim;

pub use config::{ConfigError, SimConfig};
pub use sim::{SessionReport, SimError, SimReport, run};
