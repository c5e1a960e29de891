use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tally_client::{ClientSession, DisplaySnapshot, ReconcileResult, SessionError};
use tally_server::{GatewayStats, MutationEndpoint, MutationGateway, shared_store};
use tally_types::{Counter, SessionId};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, SimConfig};

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<tally_server::ConfigError> for SimError {
    fn from(err: tally_server::ConfigError) -> Self {
        Self::Config(ConfigError::Gateway(err))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub id: SessionId,
    pub name: String,
    pub display: DisplaySnapshot,
    pub rolled_back: u32,
    pub stale: u32,
}

impl SessionReport {
    pub fn converged_to(&self, store: Counter) -> bool {
        self.display.in_flight == 0
            && self.display.confirmed == store
            && self.display.value == store.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimReport {
    pub store: Counter,
    pub gateway: GatewayStats,
    pub sessions: Vec<SessionReport>,
}

impl SimReport {
    pub fn converged(&self) -> bool {
        self.sessions.iter().all(|s| s.converged_to(self.store))
    }
}

impl fmt::Display for SimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "store      {}", self.store)?;
        writeln!(
            f,
            "gateway    {} attempts, {} applied, {} rejected",
            self.gateway.attempts, self.gateway.applied, self.gateway.rejected
        )?;
        for s in &self.sessions {
            writeln!(
                f,
                "{:<10} shows {:>4} (confirmed {}, {} rolled back, {} stale){}",
                s.name,
                s.display.value,
                s.display.confirmed,
                s.rolled_back,
                s.stale,
                s.display
                    .error
                    .as_deref()
                    .map(|e| format!("  last error: {e}"))
                    .unwrap_or_default(),
            )?;
        }
        write!(f, "converged  {}", if self.converged() { "yes" } else { "NO" })
    }
}

/// Run every configured session to completion and report the final state.
pub async fn run(config: &SimConfig) -> Result<SimReport, SimError> {
    config.validate()?;

    let gateway = Arc::new(MutationGateway::from_config(shared_store(), &config.gateway)?);
    let endpoint: Arc<dyn MutationEndpoint> = gateway.clone();

    let sessions: Vec<ClientSession> = config
        .sessions
        .iter()
        .map(|label| ClientSession::connect_labeled(endpoint.clone(), config.session.clone(), label))
        .collect();

    info!(
        sessions = sessions.len(),
        clicks = config.clicks,
        failure_probability = config.gateway.failure_probability,
        "simulation started"
    );

    let runs = sessions.iter().map(|session| click_loop(session, config));
    let tallies = join_all(runs).await;

    let authoritative = gateway.store().read();
    let mut reports = Vec::with_capacity(sessions.len());
    for (session, tally) in sessions.iter().zip(tallies) {
        let (rolled_back, stale) = tally?;
        session.refresh();
        let report = SessionReport {
            id: session.id(),
            name: session.name(),
            display: session.snapshot(),
            rolled_back,
            stale,
        };
        if !report.converged_to(authoritative) {
            warn!(session = %report.name, id = %report.id, display = ?report.display, store = %authoritative, "session did not converge");
        }
        reports.push(report);
    }

    Ok(SimReport {
        store: authoritative,
        gateway: gateway.stats(),
        sessions: reports,
    })
}

/// Click `config.clicks` times without waiting on earlier clicks, then wait
/// for all of them. Returns `(rolled_back, stale)` counts.
async fn click_loop(session: &ClientSession, config: &SimConfig) -> Result<(u32, u32), SessionError> {
    let mut pending = Vec::with_capacity(config.clicks as usize);
    for _ in 0..config.clicks {
        pending.push(session.request_increment());
        tokio::time::sleep(config.click_interval()).await;
    }

    let mut rolled_back = 0;
    let mut stale = 0;
    for p in pending {
        match p.wait().await? {
            ReconcileResult::RolledBack { .. } => rolled_back += 1,
            ReconcileResult::Skipped { .. } => stale += 1,
            _ => {}
        }
    }
    Ok((rolled_back, stale))
}
