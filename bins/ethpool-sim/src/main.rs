//! ETHPool scenario simulator.
//!
//! Deploys a pool in memory, funds the scenario accounts, replays every step
//! and prints a JSON report of the resulting state.

mod config;
mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ethpool_core::{RemainderPolicy, RewardAccess};
use tracing::info;

use crate::config::SimConfig;

#[derive(Parser, Debug)]
#[command(
    name = "ethpool-sim",
    version,
    about = "Replay an ETHPool scenario against an in-memory pool"
)]
struct Args {
    /// Scenario file (JSON)
    scenario: PathBuf,

    /// Configuration file (TOML); `ETHPOOL_*` environment variables also apply
    #[arg(long)]
    config: Option<PathBuf>,

    /// Deployer account (label or 0x hex), overrides the config file
    #[arg(long)]
    deployer: Option<String>,

    /// Who may inject rewards ("open" or "team_only")
    #[arg(long)]
    reward_access: Option<RewardAccess>,

    /// What happens to rounding remainders ("carry_forward" or "retain")
    #[arg(long)]
    remainder_policy: Option<RemainderPolicy>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long)]
    log_format: Option<String>,

    /// Stop at the first failing step
    #[arg(long)]
    fail_fast: bool,

    /// Write the report here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Args {
    fn apply_overrides(&self, config: &mut SimConfig) {
        if let Some(deployer) = &self.deployer {
            config.deployer = deployer.clone();
        }
        if let Some(access) = self.reward_access {
            config.pool.reward_access = access;
        }
        if let Some(policy) = self.remainder_policy {
            config.pool.remainder_policy = policy;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = SimConfig::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);

    init_logging(&config.log_level, &config.log_format);
    info!("ETHPool simulator v{}", env!("CARGO_PKG_VERSION"));
    info!(
        reward_access = %config.pool.reward_access,
        remainder_policy = %config.pool.remainder_policy,
        "pool config"
    );

    let scenario = scenario::load(&args.scenario)?;
    let report = scenario::replay(&scenario, &config, args.fail_fast)?;
    info!(
        steps = report.steps.len(),
        failures = report.failures,
        positions = report.positions.len(),
        "replay finished"
    );

    let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
    match &args.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

/// Initialize the tracing subscriber with the given level and format.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    // Logs go to stderr so the report on stdout stays parseable.
    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
