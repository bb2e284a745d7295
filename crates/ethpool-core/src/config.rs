//! Pool policy configuration.
//!
//! [`PoolConfig`] carries the two policy choices the pool exposes: who may
//! inject rewards, and what happens to the integer remainder of a split.
//! Defaults: anyone may inject rewards, and rounding remainders roll into the next split.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Who may call `inject_rewards`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RewardAccess {
    /// Anyone may fund rewards.
    #[default]
    Open,
    /// Only team members may fund rewards.
    TeamOnly,
}

impl FromStr for RewardAccess {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "team_only" | "team-only" => Ok(Self::TeamOnly),
            other => Err(ConfigError::UnknownRewardAccess(other.to_string())),
        }
    }
}

impl fmt::Display for RewardAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::TeamOnly => f.write_str("team_only"),
        }
    }
}

/// What to do with `amount - Σ share` after floor division.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Hold the remainder and add it to the next injection.
    #[default]
    CarryForward,
    /// Hold the remainder in a pool-level accumulator permanently.
    Retain,
}

impl FromStr for RemainderPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "carry_forward" | "carry-forward" => Ok(Self::CarryForward),
            "retain" => Ok(Self::Retain),
            other => Err(ConfigError::UnknownRemainderPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for RemainderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CarryForward => f.write_str("carry_forward"),
            Self::Retain => f.write_str("retain"),
        }
    }
}

/// Configuration for a pool instance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PoolConfig {
    /// Who may inject rewards.
    pub reward_access: RewardAccess,
    /// Remainder handling for reward splits.
    pub remainder_policy: RemainderPolicy,
}
