//! tally-sim binary
//!
//! ## Usage
//!
//! ```bash
//! # Three sessions, ten clicks each, default 30% failure rate
//! tally-sim
//!
//! # Load a RON config, then override parts of it
//! tally-sim --config sim.ron --clicks 25 --failure-probability 0.5
//!
//! # Watch every reconciliation step
//! RUST_LOG=tally_client=debug tally-sim --sessions solo
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tally_sim::SimConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "tally-sim", about = "Optimistic counter sessions against a flaky simulated server")]
struct Cli {
    /// RON config file; CLI flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session labels, one session each.
    #[arg(long, num_args = 1..)]
    sessions: Option<Vec<String>>,

    /// Clicks per session.
    #[arg(long)]
    clicks: Option<u32>,

    /// Pause between clicks of one session, in milliseconds.
    #[arg(long)]
    click_interval_ms: Option<u64>,

    /// Chance that a single attempt is rejected.
    #[arg(long)]
    failure_probability: Option<f64>,

    /// Upper bound of simulated latency, in milliseconds.
    #[arg(long)]
    max_latency_ms: Option<u64>,

    /// Delay before a failed click is rolled back, in milliseconds.
    #[arg(long)]
    rollback_delay_ms: Option<u64>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SimConfig::default(),
        };

        if let Some(sessions) = self.sessions {
            config.sessions = sessions;
        }
        if let Some(clicks) = self.clicks {
            config.clicks = clicks;
        }
        if let Some(ms) = self.click_interval_ms {
            config.click_interval_ms = ms;
        }
        if let Some(p) = self.failure_probability {
            config.gateway.failure_probability = p;
        }
        if let Some(ms) = self.max_latency_ms {
            config.gateway.max_latency_ms = ms;
        }
        if let Some(ms) = self.rollback_delay_ms {
            config.session.rollback_delay_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match tally_sim::run(&config).await {
        Ok(report) => {
            println!("{report}");
            if report.converged() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!("Simulation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
