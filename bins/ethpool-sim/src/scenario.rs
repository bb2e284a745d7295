//! Scenario files and their replay against an in-memory pool.
//!
//! A scenario names the funded accounts and lists operation steps. Every
//! step is applied through the public [`Pool`] surface on a [`ManualClock`];
//! failures are recorded in the report rather than aborting the replay
//! (unless `fail_fast` is set).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use ethpool_core::traits::{Clock, ValueTransfer};
use ethpool_core::error::IdentityError;
use ethpool_core::{
    Amount, Identity, ManualClock, MemoryVault, Pool, PoolEvent, Position, PositionId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SimConfig;

/// A replayable scenario.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Scenario {
    /// Starting wallet balance per account, in base units.
    pub accounts: BTreeMap<String, Amount>,
    pub steps: Vec<Step>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Deposit { caller: String, amount: Amount },
    Withdraw { caller: String, position: u64 },
    InjectRewards { caller: String, amount: Amount },
    AddTeamMember { caller: String, member: String },
    TransferPosition { caller: String, position: u64, to: String },
    /// Move the clock forward without touching the pool.
    Advance { ticks: u64 },
    /// Run the bookkeeping audit.
    Audit,
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::InjectRewards { .. } => "inject_rewards",
            Step::AddTeamMember { .. } => "add_team_member",
            Step::TransferPosition { .. } => "transfer_position",
            Step::Advance { .. } => "advance",
            Step::Audit => "audit",
        }
    }
}

/// Outcome of one step.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub index: usize,
    pub op: &'static str,
    pub at: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final state of the pool after replay.
#[derive(Serialize, Debug, Clone)]
pub struct Report {
    pub steps: Vec<StepResult>,
    pub failures: usize,
    pub positions: Vec<Position>,
    pub members: Vec<Identity>,
    pub last_reward_timestamp: u64,
    pub undistributed: Amount,
    pub total_distributed: Amount,
    pub custody: Amount,
    pub wallets: BTreeMap<String, Amount>,
    pub events: Vec<PoolEvent>,
}

/// Resolve an account reference: a `0x` hex identity, or a label.
///
/// Anything starting with `0x` must be a well-formed identity.
pub fn resolve_identity(name: &str) -> Result<Identity, IdentityError> {
    if name.starts_with("0x") {
        name.parse()
    } else {
        Ok(Identity::from_label(name))
    }
}

/// Read a scenario from a JSON file.
pub fn load(path: &Path) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid scenario {}", path.display()))
}

/// Deploy a pool per `config`, fund the scenario accounts, and apply every step.
pub fn replay(scenario: &Scenario, config: &SimConfig, fail_fast: bool) -> Result<Report> {
    let vault = Arc::new(MemoryVault::new());
    let clock = Arc::new(ManualClock::new(config.start_time));
    let deployer = resolve_identity(&config.deployer)
        .with_context(|| format!("invalid deployer {:?}", config.deployer))?;

    let mut accounts = BTreeMap::new();
    for (name, balance) in &scenario.accounts {
        let account = resolve_identity(name).with_context(|| format!("invalid account {name:?}"))?;
        vault.credit(&account, *balance);
        accounts.insert(name.clone(), account);
    }
    let mut pool = Pool::with_config(deployer, config.pool, vault.clone(), clock.clone());
    info!(
        deployer = %deployer,
        accounts = scenario.accounts.len(),
        steps = scenario.steps.len(),
        "replaying scenario"
    );

    let mut results = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let at = clock.now();
        let outcome = apply(&mut pool, &clock, step);
        let result = match outcome {
            Ok(value) => {
                debug!(index, op = step.name(), "step ok");
                StepResult {
                    index,
                    op: step.name(),
                    at,
                    ok: true,
                    value,
                    error: None,
                }
            }
            Err(e) => {
                warn!(index, op = step.name(), error = %e, "step failed");
                if fail_fast {
                    bail!("step {index} ({}) failed: {e}", step.name());
                }
                StepResult {
                    index,
                    op: step.name(),
                    at,
                    ok: false,
                    value: None,
                    error: Some(e.to_string()),
                }
            }
        };
        results.push(result);
        if !matches!(step, Step::Advance { .. }) {
            clock.advance(config.ticks_per_step);
        }
    }

    let failures = results.iter().filter(|r| !r.ok).count();
    let wallets = accounts
        .into_iter()
        .map(|(name, account)| (name, vault.balance_of(&account)))
        .collect();

    Ok(Report {
        steps: results,
        failures,
        positions: pool.ledger().iter().cloned().collect(),
        members: pool.registry().members().copied().collect(),
        last_reward_timestamp: pool.last_reward_timestamp(),
        undistributed: pool.undistributed_remainder(),
        total_distributed: pool.total_distributed(),
        custody: vault.custody_balance(),
        wallets,
        events: pool.take_events(),
    })
}

fn apply(
    pool: &mut Pool,
    clock: &ManualClock,
    step: &Step,
) -> Result<Option<serde_json::Value>, Box<dyn std::error::Error + Send + Sync>> {
    let value = match step {
        Step::Deposit { caller, amount } => {
            let id = pool.deposit(&resolve_identity(caller)?, *amount)?;
            Some(serde_json::to_value(id)?)
        }
        Step::Withdraw { caller, position } => {
            let paid = pool.withdraw(&resolve_identity(caller)?, PositionId(*position))?;
            Some(serde_json::to_value(paid)?)
        }
        Step::InjectRewards { caller, amount } => {
            let outcome = pool.inject_rewards(&resolve_identity(caller)?, *amount)?;
            Some(serde_json::to_value(outcome)?)
        }
        Step::AddTeamMember { caller, member } => {
            pool.add_team_member(&resolve_identity(caller)?, resolve_identity(member)?)?;
            None
        }
        Step::TransferPosition { caller, position, to } => {
            pool.transfer_position(
                &resolve_identity(caller)?,
                PositionId(*position),
                resolve_identity(to)?,
            )?;
            None
        }
        Step::Advance { ticks } => Some(serde_json::to_value(clock.advance(*ticks))?),
        Step::Audit => {
            pool.audit()?;
            None
        }
    };
    Ok(value)
}
