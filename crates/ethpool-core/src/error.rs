//! Error types for the pool.
use thiserror::Error;

use crate::types::{Amount, Identity, PositionId, Timestamp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid identity length: {0} hex digits")] InvalidLength(usize),
    #[error("invalid identity hex: {0}")] InvalidHex(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("unauthorized: {0} is not a team member")] Unauthorized(Identity),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid amount: must be greater than zero")] InvalidAmount,
    #[error("position not found: {0}")] NotFound(PositionId),
    #[error("unauthorized: {caller} does not own position {id}")] Unauthorized { id: PositionId, caller: Identity },
    #[error("position already inactive: {0}")] AlreadyInactive(PositionId),
    #[error("position still active: {0}")] StillActive(PositionId),
    #[error("invalid recipient: {0}")] InvalidRecipient(Identity),
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewardError {
    #[error("invalid amount: must be greater than zero")] InvalidAmount,
    #[error("no deposits yet")] NoActivePositions,
    #[error("no eligible weight: every active position has zero elapsed time")] NoEligibleWeight,
    #[error("stale timestamp: now {now} precedes last reward at {last}")] StaleTimestamp { now: Timestamp, last: Timestamp },
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient funds for {account}: have {have}, need {need}")] InsufficientFunds { account: Identity, have: Amount, need: Amount },
    #[error("custody shortfall: have {have}, need {need}")] CustodyShortfall { have: Amount, need: Amount },
    #[error("transfer rejected: {0}")] Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown reward access policy: {0}")] UnknownRewardAccess(String),
    #[error("unknown remainder policy: {0}")] UnknownRemainderPolicy(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error(transparent)] Access(#[from] AccessError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Reward(#[from] RewardError),
    #[error(transparent)] Transfer(#[from] TransferError),
}

impl PoolError {
    /// Whether the failure was a privilege or ownership check.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Access(AccessError::Unauthorized(_))
                | Self::Ledger(LedgerError::Unauthorized { .. })
        )
    }

    /// Whether the failure was a zero amount where a positive one is required.
    pub fn is_invalid_amount(&self) -> bool {
        matches!(
            self,
            Self::Ledger(LedgerError::InvalidAmount) | Self::Reward(RewardError::InvalidAmount)
        )
    }
}
