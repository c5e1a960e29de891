//! The mutation endpoint clients call to increment the counter.
//!
//! [`MutationEndpoint`] is the server boundary as seen by a client session:
//! a synchronous read used to seed display state and an asynchronous
//! increment attempt. [`MutationGateway`] is the in-process implementation
//! that simulates an unreliable network in front of an [`AuthoritativeStore`].
//!
//! A rejected attempt is `Ok(MutationOutcome::Rejected { .. })`, never `Err`.
//! `Err(TransportError)` is reserved for real transports and is not produced
//! here.
//!
//! [`AuthoritativeStore`]: crate::AuthoritativeStore

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tally_types::{Counter, MutationFailure, MutationOutcome};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{ConfigError, GatewayConfig};
use crate::failure::{FailurePolicy, RandomFailure};
use crate::latency::{LatencyModel, UniformLatency};
use crate::store::SharedStore;

/// Failure to reach the endpoint at all.
///
/// Distinct from [`MutationFailure`], which is a well-formed answer from the
/// server. The simulated gateway never returns this.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("endpoint unavailable: {0}")]
    Unavailable(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Server boundary consumed by client sessions.
#[async_trait]
pub trait MutationEndpoint: Send + Sync {
    /// Current authoritative snapshot.
    fn read(&self) -> Counter;

    /// Try to apply one increment.
    async fn attempt_increment(&self) -> Result<MutationOutcome, TransportError>;
}

/// Point-in-time attempt counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    pub attempts: u64,
    pub applied: u64,
    pub rejected: u64,
}

/// Simulated unreliable gateway in front of a [`SharedStore`].
pub struct MutationGateway {
    store: SharedStore,
    latency: Box<dyn LatencyModel>,
    failure: Box<dyn FailurePolicy>,
    attempts: AtomicU64,
    applied: AtomicU64,
    rejected: AtomicU64,
}

impl MutationGateway {
    /// Gateway with the default models: uniform `[0, 700]` ms latency and a
    /// 0.3 failure rate.
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            latency: Box::new(UniformLatency::default()),
            failure: Box::new(RandomFailure::default()),
            attempts: AtomicU64::new(0),
            applied: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn from_config(store: SharedStore, config: &GatewayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(store)
            .with_latency(UniformLatency::new(config.max_latency()))
            .with_failure_policy(RandomFailure::new(config.failure_probability)?))
    }

    pub fn with_latency(mut self, latency: impl LatencyModel + 'static) -> Self {
        self.latency = Box::new(latency);
        self
    }

    pub fn with_failure_policy(mut self, failure: impl FailurePolicy + 'static) -> Self {
        self.failure = Box::new(failure);
        self
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl MutationEndpoint for MutationGateway {
    fn read(&self) -> Counter {
        self.store.read()
    }

    async fn attempt_increment(&self) -> Result<MutationOutcome, TransportError> {
        let before = self.store.read();
        let delay = self.latency.sample();
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(attempt, %before, delay_ms = delay.as_millis() as u64, "increment attempt started");

        tokio::time::sleep(delay).await;

        if self.failure.should_fail() {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            debug!(attempt, %before, "increment attempt rejected");
            return Ok(MutationOutcome::rejected(
                MutationFailure::RemoteMutationFailed,
                before,
            ));
        }

        let after = self.store.increment();
        self.applied.fetch_add(1, Ordering::Relaxed);
        debug!(attempt, %before, %after, "increment attempt applied");
        Ok(MutationOutcome::applied(after))
    }
}

// ============================================================================
// Tests
// ============================================================================
