//! Simulated network latency.
//!
//! The gateway asks a [`LatencyModel`] how long to suspend before resolving an
//! attempt. Production uses [`UniformLatency`]; tests pin it with
//! [`FixedLatency`] or [`NoLatency`].

use std::time::Duration;

use rand::Rng;

use crate::constants::MAX_SIMULATED_LATENCY;

/// Source of per-attempt latency.
pub trait LatencyModel: Send + Sync {
    fn sample(&self) -> Duration;
}

/// Uniform over `[0, max]`, millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLatency {
    max: Duration,
}

impl UniformLatency {
    pub fn new(max: Duration) -> Self {
        Self { max }
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

impl Default for UniformLatency {
    fn default() -> Self {
        Self::new(MAX_SIMULATED_LATENCY)
    }
}

impl LatencyModel for UniformLatency {
    fn sample(&self) -> Duration {
        let max_ms = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

/// Always the same delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedLatency(pub Duration);

impl LatencyModel for FixedLatency {
    fn sample(&self) -> Duration {
        self.0
    }
}

/// Resolve immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoLatency;

impl LatencyModel for NoLatency {
    fn sample(&self) -> Duration {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_stays_in_range() {
        let model = UniformLatency::default();
        for _ in 0..1_000 {
            assert!(model.sample() <= MAX_SIMULATED_LATENCY);
        }
    }

    #[test]
    fn test_uniform_default_max() {
        assert_eq!(UniformLatency::default().max(), MAX_SIMULATED_LATENCY);
        assert_eq!(UniformLatency::new(Duration::from_millis(5)).max(), Duration::from_millis(5));
    }

    #[test]
    fn test_uniform_zero_max() {
        let model = UniformLatency::new(Duration::ZERO);
        assert_eq!(model.sample(), Duration::ZERO);
    }

    #[test]
    fn test_fixed_and_none() {
        assert_eq!(FixedLatency(Duration::from_millis(42)).sample(), Duration::from_millis(42));
        assert_eq!(NoLatency.sample(), Duration::ZERO);
    }
}
