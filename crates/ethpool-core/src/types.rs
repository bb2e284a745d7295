//! Core pool types: identities, positions, events.
//!
//! All monetary values are in base units (see [`UNIT`](crate::constants::UNIT)).
//! Time is a discrete tick count supplied by a [`Clock`](crate::traits::Clock).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::IDENTITY_LEN;
use crate::error::IdentityError;

/// Pooled value in base units.
pub type Amount = u64;

/// Discrete time (block height or seconds), as reported by a clock.
pub type Timestamp = u64;

/// A 20-byte account identifier.
///
/// Rendered and parsed as `0x`-prefixed lowercase hex. Serde uses the same
/// string form so identities read naturally in config and scenario files.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(pub [u8; IDENTITY_LEN]);

impl Identity {
    /// The all-zero identity. Never a valid caller.
    pub const ZERO: Self = Self([0u8; IDENTITY_LEN]);

    /// Create an identity from raw bytes.
    pub fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Deterministic identity derived from a human label.
    ///
    /// First 20 bytes of `BLAKE3(label)`. Used by tests and scenario files to
    /// name accounts without writing out hex.
    pub fn from_label(label: &str) -> Self {
        let digest = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; IDENTITY_LEN];
        bytes.copy_from_slice(&digest.as_bytes()[..IDENTITY_LEN]);
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Check if this is the zero identity.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; IDENTITY_LEN]
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != IDENTITY_LEN * 2 {
            return Err(IdentityError::InvalidLength(digits.len()));
        }
        let mut bytes = [0u8; IDENTITY_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| IdentityError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.to_string()
    }
}

impl From<[u8; IDENTITY_LEN]> for Identity {
    fn from(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }
}

/// Sequential position identifier. `PositionId(0)` is never assigned.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(transparent)]
pub struct PositionId(pub u64);

impl PositionId {
    /// The reserved id. No position ever carries it.
    pub const RESERVED: Self = Self(0);

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for PositionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// One deposit, tracked independently of every other deposit.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Position {
    /// Sequential id, starting at 1.
    pub id: PositionId,
    /// Current holder. May change through a position transfer.
    pub owner: Identity,
    /// Principal contributed at creation.
    pub deposited: Amount,
    /// Rewards allocated since creation.
    pub accrued_reward: Amount,
    /// Tick at which the position was opened; start of its weight clock.
    pub created_at: Timestamp,
    /// False once withdrawn. Inactive positions never receive rewards.
    pub active: bool,
}

impl Position {
    /// Redeemable balance: principal plus accrued reward.
    ///
    /// Saturates instead of overflowing; the ledger never lets the sum exceed
    /// the custody balance, which is itself an `Amount`.
    pub fn balance(&self) -> Amount {
        self.deposited.saturating_add(self.accrued_reward)
    }

    /// Start of the window that counts toward the next distribution.
    ///
    /// The later of the creation tick and the previous distribution tick.
    pub fn eligible_since(&self, last_reward_timestamp: Timestamp) -> Timestamp {
        self.created_at.max(last_reward_timestamp)
    }
}

/// Observable pool events, appended only when an operation commits.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    /// A deposit opened a new position.
    LiquidityAdded {
        id: PositionId,
        owner: Identity,
        amount: Amount,
    },
    /// A position was withdrawn and its balance paid out.
    LiquidityRemoved {
        id: PositionId,
        owner: Identity,
        amount: Amount,
    },
    /// A reward injection was split across active positions.
    RewardsDistributed {
        amount: Amount,
        distributed: Amount,
        remainder: Amount,
        recipients: usize,
        timestamp: Timestamp,
    },
    /// A new identity joined the team.
    TeamMemberAdded { member: Identity, added_by: Identity },
    /// Ownership of a position changed hands.
    PositionTransferred {
        id: PositionId,
        from: Identity,
        to: Identity,
    },
}
