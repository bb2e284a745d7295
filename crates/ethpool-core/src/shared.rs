//! Single-writer wrapper for sharing a [`Pool`] across threads.
//!
//! Every operation holds the lock for its full duration, so operations from
//! different callers are applied one at a time in lock-acquisition order and
//! no caller ever observes a half-applied operation.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::distributor::DistributionOutcome;
use crate::error::PoolError;
use crate::invariants::InvariantViolation;
use crate::pool::Pool;
use crate::types::{Amount, Identity, PoolEvent, Position, PositionId, Timestamp};

/// Cloneable handle to a pool behind a mutex.
#[derive(Clone)]
pub struct SharedPool {
    inner: Arc<Mutex<Pool>>,
}

impl SharedPool {
    /// Wrap a pool.
    pub fn new(pool: Pool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    /// Run `f` with exclusive access. Use for multi-step reads that must see
    /// one consistent state.
    pub fn with<R>(&self, f: impl FnOnce(&mut Pool) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// See [`Pool::deposit`].
    pub fn deposit(&self, caller: &Identity, amount: Amount) -> Result<PositionId, PoolError> {
        self.inner.lock().deposit(caller, amount)
    }

    /// See [`Pool::withdraw`].
    pub fn withdraw(&self, caller: &Identity, id: PositionId) -> Result<Amount, PoolError> {
        self.inner.lock().withdraw(caller, id)
    }

    /// See [`Pool::inject_rewards`].
    pub fn inject_rewards(
        &self,
        caller: &Identity,
        amount: Amount,
    ) -> Result<DistributionOutcome, PoolError> {
        self.inner.lock().inject_rewards(caller, amount)
    }

    /// See [`Pool::add_team_member`].
    pub fn add_team_member(&self, caller: &Identity, member: Identity) -> Result<(), PoolError> {
        self.inner.lock().add_team_member(caller, member)
    }

    /// See [`Pool::transfer_position`].
    pub fn transfer_position(
        &self,
        caller: &Identity,
        id: PositionId,
        to: Identity,
    ) -> Result<(), PoolError> {
        self.inner.lock().transfer_position(caller, id, to)
    }

    /// Whether `identity` is a team member.
    pub fn is_team_member(&self, identity: &Identity) -> bool {
        self.inner.lock().is_team_member(identity)
    }

    /// Whether the position id was ever issued.
    pub fn exists(&self, id: PositionId) -> bool {
        self.inner.lock().exists(id)
    }

    /// Number of positions ever created.
    pub fn tokens_amount(&self) -> u64 {
        self.inner.lock().tokens_amount()
    }

    /// Number of active positions.
    pub fn active_tokens(&self) -> u64 {
        self.inner.lock().active_tokens()
    }

    /// Number of position records held by `owner`.
    pub fn balance_of_owner(&self, owner: &Identity) -> u64 {
        self.inner.lock().balance_of_owner(owner)
    }

    /// Principal plus accrued reward of a position.
    pub fn balance_of_position(&self, id: PositionId) -> Result<Amount, PoolError> {
        self.inner.lock().balance_of_position(id)
    }

    /// Cloned position record.
    pub fn position(&self, id: PositionId) -> Result<Position, PoolError> {
        self.inner.lock().position(id).cloned()
    }

    /// Tick of the last reward injection; `0` before the first.
    pub fn last_reward_timestamp(&self) -> Timestamp {
        self.inner.lock().last_reward_timestamp()
    }

    /// Drain committed events in commit order.
    pub fn take_events(&self) -> Vec<PoolEvent> {
        self.inner.lock().take_events()
    }

    /// Check bookkeeping invariants against the custody balance.
    pub fn audit(&self) -> Result<(), InvariantViolation> {
        self.inner.lock().audit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::vault::MemoryVault;

    #[test]
    fn handles_share_one_pool() {
        let vault = Arc::new(MemoryVault::new());
        let alice = Identity::from_label("alice");
        vault.credit(&alice, 10);
        let pool = Pool::new(alice, vault, Arc::new(ManualClock::new(1)));
        let a = SharedPool::new(pool);
        let b = a.clone();
        let id = a.deposit(&alice, 10).unwrap();
        assert!(b.exists(id));
        assert_eq!(b.balance_of_owner(&alice), 1);
        assert_eq!(b.with(|p| p.deposit_of(id)).unwrap(), 10);
    }
}
