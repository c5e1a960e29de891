//! Server configuration constants.
//!
//! Centralizes the simulation defaults for easier configuration and documentation.

use std::time::Duration;

/// Upper bound of the simulated network latency. Samples are uniform over
/// `[0, MAX_SIMULATED_LATENCY]`.
pub const MAX_SIMULATED_LATENCY: Duration = Duration::from_millis(700);

/// Probability that a single increment attempt is rejected.
pub const DEFAULT_FAILURE_PROBABILITY: f64 = 0.3;
