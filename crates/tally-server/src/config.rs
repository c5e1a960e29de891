//! Gateway configuration.
//!
//! Deserializable (any serde format; the simulator uses RON). Missing fields
//! fall back to the defaults in [`crate::constants`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_FAILURE_PROBABILITY, MAX_SIMULATED_LATENCY};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("failure probability must be within [0, 1], got {0}")]
    InvalidProbability(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Upper bound of the uniform latency distribution, in milliseconds.
    pub max_latency_ms: u64,
    /// Chance that an attempt is rejected.
    pub failure_probability: f64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_latency_ms: MAX_SIMULATED_LATENCY.as_millis() as u64,
            failure_probability: DEFAULT_FAILURE_PROBABILITY,
        }
    }
}

impl GatewayConfig {
    pub fn max_latency(&self) -> Duration {
        Duration::from_millis(self.max_latency_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(ConfigError::InvalidProbability(self.failure_probability));
        }
        Ok(())
    }
}
