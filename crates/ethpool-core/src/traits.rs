//! Trait interfaces for the collaborators the pool depends on.
//!
//! - [`ValueTransfer`]: moves funds into and out of pool custody
//!   ([`MemoryVault`](crate::vault::MemoryVault) implements it for tests and replay)
//! - [`Clock`]: monotonic time or block-height source
//!   ([`clock`](crate::clock) provides manual, ticking and wall-clock sources)
//!
//! Caller identity is not a trait: every pool operation takes the caller
//! explicitly.

use crate::error::TransferError;
use crate::types::{Amount, Identity, Timestamp};

/// Custody of pooled value.
///
/// Each call is atomic: it either moves the full amount or moves nothing and
/// returns an error. Implementations must be safe to share across threads.
pub trait ValueTransfer: Send + Sync {
    /// Move `amount` from `from` into pool custody.
    fn collect(&self, from: &Identity, amount: Amount) -> Result<(), TransferError>;

    /// Move `amount` out of pool custody to `to`.
    fn pay(&self, to: &Identity, amount: Amount) -> Result<(), TransferError>;

    /// Total value currently held in custody.
    fn custody_balance(&self) -> Amount;
}

/// Monotonic time source.
///
/// Readings must never decrease. The unit is whatever the host provides
/// (block height, seconds); the reward engine only relies on differences.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Timestamp;
}
