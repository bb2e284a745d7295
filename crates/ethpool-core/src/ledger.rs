//! Position ledger: the id → position table and its counters.
//!
//! Ids are issued sequentially from [`FIRST_POSITION_ID`] and never reused,
//! so the table is a dense `Vec` indexed by `id - 1`. Withdrawn positions stay
//! in the table: "exists" and "active" are separate predicates.
//!
//! The ledger has no notion of custody. It reports what a withdrawal should
//! pay (a [`Redemption`]) and can undo a deactivation if the payout fails.

use std::collections::{BTreeSet, HashMap};

use crate::constants::FIRST_POSITION_ID;
use crate::error::LedgerError;
use crate::types::{Amount, Identity, Position, PositionId, Timestamp};

/// Receipt for a deactivated position.
///
/// Carries everything needed to pay the holder, or to restore the position
/// through [`PositionLedger::reactivate`] if the payout fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redemption {
    /// The deactivated position.
    pub id: PositionId,
    /// Holder at the time of deactivation.
    pub owner: Identity,
    /// Principal being returned.
    pub deposited: Amount,
    /// Reward being returned.
    pub accrued_reward: Amount,
}

impl Redemption {
    /// Total to pay out.
    pub fn amount(&self) -> Amount {
        self.deposited.saturating_add(self.accrued_reward)
    }
}

/// All positions ever opened, plus active-set and ownership indexes.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    /// Position `id` lives at index `id - 1`.
    positions: Vec<Position>,
    /// Ids with `active == true`, ascending.
    active: BTreeSet<PositionId>,
    /// Ids held per owner, active or not.
    owned: HashMap<Identity, BTreeSet<PositionId>>,
}

impl PositionLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new active position for `owner` holding `amount`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] if `amount` is zero
    /// - [`LedgerError::InvalidRecipient`] if `owner` is the zero identity
    pub fn create(
        &mut self,
        owner: Identity,
        amount: Amount,
        now: Timestamp,
    ) -> Result<PositionId, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if owner.is_zero() {
            return Err(LedgerError::InvalidRecipient(owner));
        }
        let id = PositionId(self.total_created() + FIRST_POSITION_ID);
        self.positions.push(Position {
            id,
            owner,
            deposited: amount,
            accrued_reward: 0,
            created_at: now,
            active: true,
        });
        self.active.insert(id);
        self.owned.entry(owner).or_default().insert(id);
        Ok(id)
    }

    /// Deactivate a position on behalf of its owner.
    ///
    /// The record is kept. The returned receipt says how much to pay.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if the id was never issued
    /// - [`LedgerError::Unauthorized`] if `caller` is not the owner
    /// - [`LedgerError::AlreadyInactive`] if it was already withdrawn
    pub fn deactivate(
        &mut self,
        id: PositionId,
        caller: &Identity,
    ) -> Result<Redemption, LedgerError> {
        let position = self.get_mut(id)?;
        if position.owner != *caller {
            return Err(LedgerError::Unauthorized { id, caller: *caller });
        }
        if !position.active {
            return Err(LedgerError::AlreadyInactive(id));
        }
        position.active = false;
        let redemption = Redemption {
            id,
            owner: position.owner,
            deposited: position.deposited,
            accrued_reward: position.accrued_reward,
        };
        self.active.remove(&id);
        Ok(redemption)
    }

    /// Undo a [`deactivate`](Self::deactivate) whose payout failed.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if the receipt names an unknown id
    /// - [`LedgerError::StillActive`] if the position is already active
    pub fn reactivate(&mut self, redemption: &Redemption) -> Result<(), LedgerError> {
        let position = self.get_mut(redemption.id)?;
        if position.active {
            return Err(LedgerError::StillActive(redemption.id));
        }
        position.active = true;
        self.active.insert(redemption.id);
        Ok(())
    }

    /// Hand a position to a new owner. Financial state is untouched.
    ///
    /// Transferring to the current owner is a successful no-op.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if the id was never issued
    /// - [`LedgerError::Unauthorized`] if `caller` is not the owner
    /// - [`LedgerError::InvalidRecipient`] if `to` is the zero identity
    pub fn transfer(
        &mut self,
        id: PositionId,
        caller: &Identity,
        to: Identity,
    ) -> Result<(), LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient(to));
        }
        let position = self.get_mut(id)?;
        if position.owner != *caller {
            return Err(LedgerError::Unauthorized { id, caller: *caller });
        }
        if to == *caller {
            return Ok(());
        }
        position.owner = to;
        if let Some(held) = self.owned.get_mut(caller) {
            held.remove(&id);
            if held.is_empty() {
                self.owned.remove(caller);
            }
        }
        self.owned.entry(to).or_default().insert(id);
        Ok(())
    }

    /// Add `share` to an active position's accrued reward.
    pub(crate) fn credit_reward(
        &mut self,
        id: PositionId,
        share: Amount,
    ) -> Result<(), LedgerError> {
        let position = self.get_mut(id)?;
        if !position.active {
            return Err(LedgerError::AlreadyInactive(id));
        }
        position.accrued_reward = position
            .accrued_reward
            .checked_add(share)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Whether `id` was ever issued, regardless of active state.
    pub fn exists(&self, id: PositionId) -> bool {
        id.get() >= FIRST_POSITION_ID && id.get() <= self.total_created()
    }

    /// Look up a position by id.
    pub fn get(&self, id: PositionId) -> Result<&Position, LedgerError> {
        self.index(id)
            .and_then(|i| self.positions.get(i))
            .ok_or(LedgerError::NotFound(id))
    }

    fn get_mut(&mut self, id: PositionId) -> Result<&mut Position, LedgerError> {
        let index = self.index(id).ok_or(LedgerError::NotFound(id))?;
        self.positions
            .get_mut(index)
            .ok_or(LedgerError::NotFound(id))
    }

    fn index(&self, id: PositionId) -> Option<usize> {
        if !self.exists(id) {
            return None;
        }
        usize::try_from(id.get() - FIRST_POSITION_ID).ok()
    }

    /// Active ids in ascending order.
    pub fn active_ids(&self) -> impl Iterator<Item = PositionId> + '_ {
        self.active.iter().copied()
    }

    /// Active positions in ascending id order.
    pub fn active_positions(&self) -> impl Iterator<Item = &Position> + '_ {
        self.active.iter().filter_map(|id| self.get(*id).ok())
    }

    /// Every position ever opened, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Position> + '_ {
        self.positions.iter()
    }

    /// Number of positions ever opened. Never decreases.
    pub fn total_created(&self) -> u64 {
        self.positions.len() as u64
    }

    /// Number of active positions.
    pub fn active_count(&self) -> u64 {
        self.active.len() as u64
    }

    /// Number of position records held by `owner`, active or withdrawn.
    pub fn balance_of_owner(&self, owner: &Identity) -> u64 {
        self.owned.get(owner).map_or(0, |held| held.len() as u64)
    }

    /// Ids held by `owner`, ascending.
    pub fn positions_of(&self, owner: &Identity) -> Vec<PositionId> {
        self.owned
            .get(owner)
            .map(|held| held.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Sum of principal over active positions.
    pub fn active_principal(&self) -> Result<Amount, LedgerError> {
        self.active_positions().try_fold(0 as Amount, |acc, p| {
            acc.checked_add(p.deposited).ok_or(LedgerError::ArithmeticOverflow)
        })
    }

    /// Sum of redeemable balance (principal + reward) over active positions.
    pub fn active_balance(&self) -> Result<Amount, LedgerError> {
        self.active_positions().try_fold(0 as Amount, |acc, p| {
            acc.checked_add(p.deposited)
                .and_then(|v| v.checked_add(p.accrued_reward))
                .ok_or(LedgerError::ArithmeticOverflow)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::from_label("alice")
    }

    fn bob() -> Identity {
        Identity::from_label("bob")
    }

    // ------------------------------------------------------------------
    // create
    // ------------------------------------------------------------------

    #[test]
    fn empty_ledger() {
        let l = PositionLedger::new();
        assert_eq!(l.total_created(), 0);
        assert_eq!(l.active_count(), 0);
        assert!(!l.exists(PositionId(0)));
        assert!(!l.exists(PositionId(1)));
    }

    #[test]
    fn ids_start_at_one_and_are_sequential() {
        let mut l = PositionLedger::new();
        assert_eq!(l.create(alice(), 10, 0).unwrap(), PositionId(1));
        assert_eq!(l.create(bob(), 20, 1).unwrap(), PositionId(2));
        assert_eq!(l.create(alice(), 30, 2).unwrap(), PositionId(3));
        assert_eq!(l.total_created(), 3);
        assert_eq!(l.active_count(), 3);
        assert!(!l.exists(PositionId::RESERVED));
    }

    #[test]
    fn create_records_position() {
        let mut l = PositionLedger::new();
        let id = l.create(alice(), 500, 7).unwrap();
        let p = l.get(id).unwrap();
        assert_eq!(p.owner, alice());
        assert_eq!(p.deposited, 500);
        assert_eq!(p.accrued_reward, 0);
        assert_eq!(p.created_at, 7);
        assert!(p.active);
    }

    #[test]
    fn create_rejects_zero_amount() {
        let mut l = PositionLedger::new();
        assert_eq!(l.create(alice(), 0, 0), Err(LedgerError::InvalidAmount));
        assert_eq!(l.total_created(), 0);
    }

    #[test]
    fn create_rejects_zero_owner() {
        let mut l = PositionLedger::new();
        assert_eq!(
            l.create(Identity::ZERO, 1, 0),
            Err(LedgerError::InvalidRecipient(Identity::ZERO))
        );
    }

    // ------------------------------------------------------------------
    // deactivate / reactivate
    // ------------------------------------------------------------------

    #[test]
    fn deactivate_returns_receipt_and_keeps_record() {
        let mut l = PositionLedger::new();
        let id = l.create(alice(), 100, 0).unwrap();
        l.credit_reward(id, 25).unwrap();
        let r = l.deactivate(id, &alice()).unwrap();
        assert_eq!(r.amount(), 125);
        assert_eq!(r.owner, alice());
        assert!(l.exists(id));
        assert!(!l.get(id).unwrap().active);
        assert_eq!(l.active_count(), 0);
        assert_eq!(l.total_created(), 1);
    }

    #[test]
    fn deactivate_unknown_id() {
        let mut l = PositionLedger::new();
        assert_eq!(
            l.deactivate(PositionId(1), &alice()),
            Err(LedgerError::NotFound(PositionId(1)))
        );
    }

    #[test]
    fn deactivate_by_non_owner() {
        let mut l = PositionLedger::new();
        let id = l.create(alice(), 100, 0).unwrap();
        assert_eq!(
            l.deactivate(id, &bob()),
            Err(LedgerError::Unauthorized { id, caller: bob() })
        );
        assert!(l.get(id).unwrap().active);
    }

    #[test]
    fn double_deactivate() {
        let mut l = PositionLedger::new();
        let id = l.create(alice(), 100, 0).unwrap();
        l.deactivate(id, &alice()).unwrap();
        assert_eq!(
            l.deactivate(id, &alice()),
            Err(LedgerError::AlreadyInactive(id))
        );
    }

    #[test]
    fn reactivate_restores_exact_state() {
        let mut l = PositionLedger::new();
        let id = l.create(alice(), 100, 3).unwrap();
        l.create(bob(), 50, 4).unwrap();
        let before: Vec<Position> = l.iter().cloned().collect();
        let r = l.deactivate(id, &alice()).unwrap();
        l.reactivate(&r).unwrap();
        let after: Vec<Position> = l.iter().cloned().collect();
        assert_eq!(before, after);
        assert_eq!(l.active_count(), 2);
        assert_eq!(l.active_ids().collect::<Vec<_>>(), vec![PositionId(1), PositionId(2)]);
    }

    #[test]
    fn reactivate_active_position_fails() {
        let mut l = PositionLedger::new();
        let id = l.create(alice(), 100, 0).unwrap();
        let r = Redemption {
            id,
            owner: alice(),
            deposited: 100,
            accrued_reward: 0,
        };
        assert_eq!(l.reactivate(&r), Err(LedgerError::StillActive(id)));
    }

    // ------------------------------------------------------------------
    // transfer
    // ------------------------------------------------------------------

    #[test]
    fn transfer_moves_ownership_only() {
        let mut l = PositionLedger::new();
        let id = l.create(alice(), 100, 0).unwrap();
        l.credit_reward(id, 9).unwrap();
        l.transfer(id, &alice(), bob()).unwrap();
        let p = l.get(id).unwrap();
        assert_eq!(p.owner, bob());
        assert_eq!(p.balance(), 109);
        assert_eq!(l.balance_of_owner(&alice()), 0);
        assert_eq!(l.balance_of_owner(&bob()), 1);
        assert_eq!(l.positions_of(&bob()), vec![id]);
    }

    #[test]
    fn transfer_requires_owner() {
        let mut l = PositionLedger::new();
        let id = l.create(alice(), 100, 0).unwrap();
        assert_eq!(
            l.transfer(id, &bob(), bob()),
            Err(LedgerError::Unauthorized { id, caller: bob() })
        );
    }

    #[test]
    fn transfer_to_zero_rejected() {
        let mut l = PositionLedger::new();
        let id = l.create(alice(), 100, 0).unwrap();
        assert_eq!(
            l.transfer(id, &alice(), Identity::ZERO),
            Err(LedgerError::InvalidRecipient(Identity::ZERO))
        );
    }

    #[test]
    fn transfer_to_self_is_noop() {
        let mut l = PositionLedger::new();
        let id = l.create(alice(), 100, 0).unwrap();
        l.transfer(id, &alice(), alice()).unwrap();
        assert_eq!(l.balance_of_owner(&alice()), 1);
    }

    #[test]
    fn new_owner_can_withdraw() {
        let mut l = PositionLedger::new();
        let id = l.create(alice(), 100, 0).unwrap();
        l.transfer(id, &alice(), bob()).unwrap();
        assert!(l.deactivate(id, &alice()).is_err());
        assert_eq!(l.deactivate(id, &bob()).unwrap().owner, bob());
    }

    // ------------------------------------------------------------------
    // queries
    // ------------------------------------------------------------------

    #[test]
    fn owner_balance_counts_withdrawn_records() {
        let mut l = PositionLedger::new();
        let a = l.create(alice(), 1, 0).unwrap();
        l.create(alice(), 2, 0).unwrap();
        l.deactivate(a, &alice()).unwrap();
        assert_eq!(l.balance_of_owner(&alice()), 2);
        assert_eq!(l.balance_of_owner(&bob()), 0);
    }

    #[test]
    fn active_ids_ascending_after_gaps() {
        let mut l = PositionLedger::new();
        for i in 0..5 {
            l.create(alice(), 10, i).unwrap();
        }
        l.deactivate(PositionId(2), &alice()).unwrap();
        l.deactivate(PositionId(4), &alice()).unwrap();
        let ids: Vec<u64> = l.active_ids().map(PositionId::get).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn active_sums_exclude_withdrawn() {
        let mut l = PositionLedger::new();
        let a = l.create(alice(), 100, 0).unwrap();
        let b = l.create(bob(), 50, 0).unwrap();
        l.credit_reward(b, 5).unwrap();
        l.deactivate(a, &alice()).unwrap();
        assert_eq!(l.active_principal().unwrap(), 50);
        assert_eq!(l.active_balance().unwrap(), 55);
    }

    #[test]
    fn credit_reward_to_inactive_fails() {
        let mut l = PositionLedger::new();
        let id = l.create(alice(), 100, 0).unwrap();
        l.deactivate(id, &alice()).unwrap();
        assert_eq!(l.credit_reward(id, 1), Err(LedgerError::AlreadyInactive(id)));
    }

    #[test]
    fn credit_reward_overflow() {
        let mut l = PositionLedger::new();
        let id = l.create(alice(), 1, 0).unwrap();
        l.credit_reward(id, Amount::MAX).unwrap();
        assert_eq!(l.credit_reward(id, 1), Err(LedgerError::ArithmeticOverflow));
    }
}
