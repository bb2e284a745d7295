//! Simulator configuration: optional TOML file layered with `ETHPOOL_*`
//! environment variables. CLI flags override both in `main`.

use std::path::Path;

use anyhow::{Context, Result};
use ethpool_core::PoolConfig;
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `ETHPOOL_LOG_LEVEL`,
/// `ETHPOOL_POOL__REWARD_ACCESS`.
pub const ENV_PREFIX: &str = "ETHPOOL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SimConfig {
    /// Deployer account: a `0x` hex identity or a label.
    pub deployer: String,
    /// Pool policy.
    pub pool: PoolConfig,
    /// Log level filter string (e.g. "info", "ethpool_core=debug").
    pub log_level: String,
    /// Log output format ("text" or "json").
    pub log_format: String,
    /// Clock reading when the scenario starts.
    pub start_time: u64,
    /// Ticks the clock advances after every operation step.
    pub ticks_per_step: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            deployer: "owner".to_string(),
            pool: PoolConfig::default(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            start_time: 1,
            ticks_per_step: 1,
        }
    }
}

impl SimConfig {
    /// Load from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );
        builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }
}
