use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::ROLLBACK_DELAY;

/// Per-session tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Delay between observing a failure and rolling the display back.
    pub rollback_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rollback_delay_ms: ROLLBACK_DELAY.as_millis() as u64,
        }
    }
}

impl SessionConfig {
    pub fn rollback_delay(&self) -> Duration {
        Duration::from_millis(self.rollback_delay_ms)
    }
}
