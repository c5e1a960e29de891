//! Async driver for one client session.
//!
//! ```text
//!   request_increment()            spawned task
//!   ┌──────────────────────┐       ┌─────────────────────────────────────────┐
//!   │ lock reconciler      │       │ endpoint.attempt_increment().await      │
//!   │ begin_increment()    │──────▶│ lock → apply_outcome() → publish        │
//!   │ publish snapshot     │       │ if rollback scheduled:                  │
//!   └──────────────────────┘       │   sleep(rollback_delay).await           │
//!        returns immediately       │   lock → rollback() → publish           │
//!                                  └─────────────────────────────────────────┘
//! ```
//!
//! Every reconciliation step runs under one `parking_lot::Mutex` and the lock
//! is never held across an `.await`, so overlapping requests interleave only
//! at the endpoint call and the rollback delay.

use std::sync::Arc;

use parking_lot::Mutex;
use tally_server::MutationEndpoint;
use tally_types::SessionId;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::reconciler::{DisplaySnapshot, ReconcileResult, Reconciler, RequestId};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("reconciliation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

struct SessionInner {
    id: SessionId,
    label: Option<String>,
    endpoint: Arc<dyn MutationEndpoint>,
    config: SessionConfig,
    reconciler: Mutex<Reconciler>,
    display: watch::Sender<DisplaySnapshot>,
}

impl SessionInner {
    fn name(&self) -> String {
        self.id.display_or(self.label.as_deref())
    }

    /// Run `f` against the reconciler and publish the resulting display state.
    fn update<T>(&self, f: impl FnOnce(&mut Reconciler) -> T) -> T {
        let mut reconciler = self.reconciler.lock();
        let out = f(&mut reconciler);
        self.display.send_replace(reconciler.snapshot());
        out
    }

    async fn drive(self: Arc<Self>, id: RequestId) -> ReconcileResult {
        let response = self.endpoint.attempt_increment().await;

        let result = self.update(|r| match response {
            Ok(outcome) => r.apply_outcome(id, outcome),
            Err(err) => r.apply_transport_error(id, &err),
        });
        debug!(session = %self.name(), request = %id, ?result, "reconciled");

        if !matches!(result, ReconcileResult::RollbackScheduled { .. }) {
            return result;
        }

        tokio::time::sleep(self.config.rollback_delay()).await;
        self.update(|r| r.rollback(id))
    }
}

/// A request whose remote leg is still running.
#[derive(Debug)]
pub struct PendingIncrement {
    id: RequestId,
    handle: JoinHandle<ReconcileResult>,
}

impl PendingIncrement {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the request to return to idle (including any rollback delay).
    pub async fn wait(self) -> Result<ReconcileResult, SessionError> {
        Ok(self.handle.await?)
    }
}

/// One client's view of the counter.
///
/// Cheap to clone; clones share the same display state.
#[derive(Clone)]
pub struct ClientSession {
    inner: Arc<SessionInner>,
}

impl ClientSession {
    /// Open a session seeded from the endpoint's read.
    pub fn connect(endpoint: Arc<dyn MutationEndpoint>, config: SessionConfig) -> Self {
        Self::open(endpoint, config, None)
    }

    /// Open a labeled session (labels only affect logs).
    pub fn connect_labeled(
        endpoint: Arc<dyn MutationEndpoint>,
        config: SessionConfig,
        label: impl Into<String>,
    ) -> Self {
        Self::open(endpoint, config, Some(label.into()))
    }

    fn open(
        endpoint: Arc<dyn MutationEndpoint>,
        config: SessionConfig,
        label: Option<String>,
    ) -> Self {
        let initial = endpoint.read();
        let reconciler = Reconciler::new(initial);
        let (display, _) = watch::channel(reconciler.snapshot());
        let id = SessionId::new();
        info!(session = %id.display_or(label.as_deref()), %initial, "session connected");

        Self {
            inner: Arc::new(SessionInner {
                id,
                label,
                endpoint,
                config,
                reconciler: Mutex::new(reconciler),
                display,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn name(&self) -> String {
        self.inner.name()
    }

    /// Increment optimistically and reconcile in the background.
    ///
    /// The display reflects the speculation before this returns. Must be
    /// called from within a Tokio runtime.
    pub fn request_increment(&self) -> PendingIncrement {
        let id = self.inner.update(|r| r.begin_increment());
        debug!(session = %self.name(), request = %id, "increment requested");

        let inner = self.inner.clone();
        let handle = tokio::spawn(inner.drive(id));
        PendingIncrement { id, handle }
    }

    /// Re-read the endpoint and adopt the snapshot if it is newer.
    pub fn refresh(&self) -> bool {
        let counter = self.inner.endpoint.read();
        self.inner.update(|r| r.refresh(counter))
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        self.inner.reconciler.lock().snapshot()
    }

    /// Receive every display change.
    pub fn subscribe(&self) -> watch::Receiver<DisplaySnapshot> {
        self.inner.display.subscribe()
    }
}
