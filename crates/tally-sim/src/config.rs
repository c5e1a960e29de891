//! Simulator configuration, loaded from RON.
//!
//! ```ron
//! (
//!     gateway: (max_latency_ms: 700, failure_probability: 0.3),
//!     session: (rollback_delay_ms: 500),
//!     sessions: ["home", "counter-a", "counter-b"],
//!     clicks: 10,
//!     click_interval_ms: 120,
//! )
//! ```
//!
//! Every field is optional; omitted ones take the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_client::SessionConfig;
use tally_server::GatewayConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error(transparent)]
    Gateway(#[from] tally_server::ConfigError),
    #[error("at least one session is required")]
    NoSessions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub gateway: GatewayConfig,
    pub session: SessionConfig,
    /// Session labels; the original pages were `/`, `counter-a` and `counter-b`.
    pub sessions: Vec<String>,
    /// Clicks issued per session.
    pub clicks: u32,
    /// Pause between two clicks of the same session.
    pub click_interval_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            session: SessionConfig::default(),
            sessions: vec!["home".into(), "counter-a".into(), "counter-b".into()],
            clicks: 10,
            click_interval_ms: 120,
        }
    }
}

impl SimConfig {
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;
        if self.sessions.is_empty() {
            return Err(ConfigError::NoSessions);
        }
        Ok(())
    }

    pub fn click_interval(&self) -> Duration {
        Duration::from_millis(self.click_interval_ms)
    }
}
