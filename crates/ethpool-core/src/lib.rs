//! # ethpool-core
//! Position ledger, access registry and time-weighted reward engine for ETHPool.
//!
//! All arithmetic is integer-only. Reward splits use 256-bit products and
//! floor division; the integer remainder is tracked explicitly by the
//! [`distributor`] instead of being lost.

pub mod access;
pub mod clock;
pub mod config;
pub mod constants;
pub mod distributor;
pub mod error;
pub mod invariants;
pub mod ledger;
pub mod pool;
pub mod shared;
pub mod traits;
pub mod types;
pub mod vault;

pub use access::AccessRegistry;
pub use clock::{ManualClock, SystemClock, TickingClock};
pub use config::{PoolConfig, RemainderPolicy, RewardAccess};
pub use distributor::{DistributionOutcome, RewardDistributor};
pub use error::PoolError;
pub use ledger::PositionLedger;
pub use pool::Pool;
pub use shared::SharedPool;
pub use types::{Amount, Identity, PoolEvent, Position, PositionId, Timestamp};
pub use vault::MemoryVault;
