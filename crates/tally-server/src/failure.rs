//! Simulated mutation failure.
//!
//! A [`FailurePolicy`] decides, once per attempt and after the latency has
//! elapsed, whether the attempt is rejected. [`RandomFailure`] is the
//! production policy; the rest exist so tests can force an outcome.

use std::collections::VecDeque;

use parking_lot::Mutex;
use rand::Rng;

use crate::config::ConfigError;
use crate::constants::DEFAULT_FAILURE_PROBABILITY;

/// Decides whether an attempt fails.
pub trait FailurePolicy: Send + Sync {
    fn should_fail(&self) -> bool;
}

/// Fails with a fixed probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomFailure {
    probability: f64,
}

impl RandomFailure {
    /// Probability must be within `[0, 1]`.
    pub fn new(probability: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigError::InvalidProbability(probability));
        }
        Ok(Self { probability })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl Default for RandomFailure {
    fn default() -> Self {
        Self {
            probability: DEFAULT_FAILURE_PROBABILITY,
        }
    }
}

impl FailurePolicy for RandomFailure {
    fn should_fail(&self) -> bool {
        rand::thread_rng().gen_bool(self.probability)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSucceed;

impl FailurePolicy for AlwaysSucceed {
    fn should_fail(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFail;

impl FailurePolicy for AlwaysFail {
    fn should_fail(&self) -> bool {
        true
    }
}

/// Replays a queue of decisions (`true` = fail), in order.
///
/// Once the queue is drained every further attempt succeeds.
#[derive(Debug, Default)]
pub struct ScriptedFailure {
    script: Mutex<VecDeque<bool>>,
}

impl ScriptedFailure {
    pub fn new(script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    /// Append one decision to the end of the script.
    pub fn push(&self, fail: bool) {
        self.script.lock().push_back(fail);
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl FailurePolicy for ScriptedFailure {
    fn should_fail(&self) -> bool {
        self.script.lock().pop_front().unwrap_or(false)
    }
}
