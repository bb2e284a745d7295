//! Bookkeeping invariants.
//!
//! - **CountBound**: active positions never outnumber positions created
//! - **ActiveIndex**: the active count equals the number of active records
//! - **CustodyBalance**: custody equals Σ(active principal + active reward)
//!   plus the pool-level undistributed remainder
//!
//! [`check`] takes the actual state and reports the first violation. Unlike
//! a consensus engine, a pool keeps serving after a violation is reported;
//! callers decide whether to halt.

use std::fmt;

use crate::ledger::PositionLedger;
use crate::types::Amount;

/// A bookkeeping property that must hold between operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolInvariant {
    CountBound,
    ActiveIndex,
    CustodyBalance,
}

/// A failed invariant with the observed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub invariant: PoolInvariant,
    pub expected: u128,
    pub observed: u128,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} violated: expected {}, observed {}",
            self.invariant, self.expected, self.observed
        )
    }
}

impl std::error::Error for InvariantViolation {}

/// Check every invariant against a ledger, its undistributed remainder and
/// the custody balance reported by the value-transfer collaborator.
pub fn check(
    ledger: &PositionLedger,
    undistributed: Amount,
    custody: Amount,
) -> Result<(), InvariantViolation> {
    if ledger.active_count() > ledger.total_created() {
        return Err(InvariantViolation {
            invariant: PoolInvariant::CountBound,
            expected: ledger.total_created() as u128,
            observed: ledger.active_count() as u128,
        });
    }

    let flagged = ledger.iter().filter(|p| p.active).count() as u64;
    if flagged != ledger.active_count() {
        return Err(InvariantViolation {
            invariant: PoolInvariant::ActiveIndex,
            expected: flagged as u128,
            observed: ledger.active_count() as u128,
        });
    }

    // u128 so the sum itself cannot overflow.
    let owed: u128 = ledger
        .active_positions()
        .map(|p| p.deposited as u128 + p.accrued_reward as u128)
        .sum::<u128>()
        + undistributed as u128;
    if owed != custody as u128 {
        return Err(InvariantViolation {
            invariant: PoolInvariant::CustodyBalance,
            expected: owed,
            observed: custody as u128,
        });
    }

    Ok(())
}
