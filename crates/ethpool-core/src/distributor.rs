//! Time-weighted proportional reward distribution.
//!
//! A position's weight is `deposited × (now − eligible_since)`, where
//! `eligible_since` is the later of its creation tick and the previous
//! distribution tick. Time consumed by one distribution never counts again.
//!
//! Each share is `floor(weight × amount / total_weight)`. Weights are `u128`
//! and the product is formed at 256 bits, so it cannot overflow. Shares never
//! sum to more than `amount`, and equal weights always receive equal shares.
//! The leftover of the floor division goes to a pool-level accumulator
//! handled per [`RemainderPolicy`].
//!
//! Distribution is split into [`RewardDistributor::plan`] (pure) and
//! [`RewardDistributor::apply`] so the caller can collect funds in between
//! and abort without touching the ledger.

use ruint::aliases::U256;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RemainderPolicy;
use crate::constants::NO_REWARD_YET;
use crate::error::RewardError;
use crate::ledger::PositionLedger;
use crate::types::{Amount, PositionId, Timestamp};

/// One position's part of a distribution.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    /// Receiving position.
    pub id: PositionId,
    /// `deposited × eligible elapsed time`.
    pub weight: u128,
    /// Reward credited.
    pub share: Amount,
}

/// A fully computed split, not yet applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistributionPlan {
    /// Fresh funds supplied by the caller.
    pub injected: Amount,
    /// Remainder carried in from earlier distributions.
    pub carried_in: Amount,
    /// Sum of all active weights.
    pub total_weight: u128,
    /// Per-position shares, ascending id.
    pub allocations: Vec<Allocation>,
    /// Distribution tick.
    pub timestamp: Timestamp,
}

impl DistributionPlan {
    /// `injected + carried_in`: the amount actually split.
    pub fn distributable(&self) -> Amount {
        self.injected.saturating_add(self.carried_in)
    }

    /// Sum of shares.
    pub fn distributed(&self) -> Amount {
        self.allocations.iter().map(|a| a.share).sum()
    }

    /// Leftover of the floor division.
    pub fn remainder(&self) -> Amount {
        self.distributable() - self.distributed()
    }
}

/// Summary of an applied distribution.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DistributionOutcome {
    /// Fresh funds supplied by the caller.
    pub amount: Amount,
    /// Total credited to positions.
    pub distributed: Amount,
    /// Leftover added to the pool-level accumulator.
    pub remainder: Amount,
    /// Sum of all active weights.
    pub total_weight: u128,
    /// Per-position shares, ascending id.
    pub recipients: Vec<Allocation>,
    /// Distribution tick.
    pub timestamp: Timestamp,
}

/// Distribution state: last distribution tick and the undistributed remainder.
#[derive(Debug, Clone, Default)]
pub struct RewardDistributor {
    last_reward_timestamp: Timestamp,
    policy: RemainderPolicy,
    /// Leftover funds waiting for the next distribution (CarryForward).
    carried: Amount,
    /// Leftover funds kept by the pool (Retain).
    retained: Amount,
    /// Lifetime statistic; saturates instead of blocking a distribution.
    total_distributed: Amount,
    distributions: u64,
}

/// `floor(weight × amount / total)` for `weight <= total`.
///
/// The product is at most 192 bits wide and the quotient never exceeds `amount`.
fn share_of(weight: u128, amount: Amount, total: u128) -> Result<Amount, RewardError> {
    if total == 0 {
        return Err(RewardError::NoEligibleWeight);
    }
    if weight == total {
        return Ok(amount);
    }
    let num = U256::from(weight)
        .checked_mul(U256::from(amount))
        .ok_or(RewardError::ArithmeticOverflow)?;
    let share = num
        .checked_div(U256::from(total))
        .ok_or(RewardError::NoEligibleWeight)?;
    Amount::try_from(share).map_err(|_| RewardError::ArithmeticOverflow)
}

impl RewardDistributor {
    /// Create a distributor with the given remainder policy.
    pub fn new(policy: RemainderPolicy) -> Self {
        Self {
            last_reward_timestamp: NO_REWARD_YET,
            policy,
            ..Self::default()
        }
    }

    /// Tick of the most recent distribution; `0` before the first.
    pub fn last_reward_timestamp(&self) -> Timestamp {
        self.last_reward_timestamp
    }

    /// Remainder waiting to be added to the next distribution.
    pub fn carried_remainder(&self) -> Amount {
        self.carried
    }

    /// Remainder kept permanently by the pool.
    pub fn retained_remainder(&self) -> Amount {
        self.retained
    }

    /// All undistributed funds held on behalf of the pool itself.
    pub fn undistributed(&self) -> Amount {
        self.carried.saturating_add(self.retained)
    }

    /// Sum of every share ever credited.
    pub fn total_distributed(&self) -> Amount {
        self.total_distributed
    }

    /// Number of applied distributions.
    pub fn distributions(&self) -> u64 {
        self.distributions
    }

    /// Active remainder policy.
    pub fn policy(&self) -> RemainderPolicy {
        self.policy
    }

    /// Weight of every active position at `now`, ascending id.
    pub fn weights(
        &self,
        ledger: &PositionLedger,
        now: Timestamp,
    ) -> Result<Vec<(PositionId, u128)>, RewardError> {
        ledger
            .active_positions()
            .map(|p| {
                let elapsed = now.saturating_sub(p.eligible_since(self.last_reward_timestamp));
                (p.deposited as u128)
                    .checked_mul(elapsed as u128)
                    .map(|w| (p.id, w))
                    .ok_or(RewardError::ArithmeticOverflow)
            })
            .collect()
    }

    /// Compute the split of `amount` at `now` without mutating anything.
    ///
    /// # Errors
    ///
    /// - [`RewardError::InvalidAmount`] if `amount` is zero
    /// - [`RewardError::NoActivePositions`] if nothing is active
    /// - [`RewardError::StaleTimestamp`] if `now` precedes the last distribution
    /// - [`RewardError::NoEligibleWeight`] if every weight is zero
    /// - [`RewardError::ArithmeticOverflow`] if the summed weight exceeds `u128`
    pub fn plan(
        &self,
        ledger: &PositionLedger,
        amount: Amount,
        now: Timestamp,
    ) -> Result<DistributionPlan, RewardError> {
        if amount == 0 {
            return Err(RewardError::InvalidAmount);
        }
        if ledger.active_count() == 0 {
            return Err(RewardError::NoActivePositions);
        }
        if now < self.last_reward_timestamp {
            return Err(RewardError::StaleTimestamp {
                now,
                last: self.last_reward_timestamp,
            });
        }

        let weights = self.weights(ledger, now)?;
        let total_weight = weights.iter().try_fold(0u128, |acc, (_, w)| {
            acc.checked_add(*w).ok_or(RewardError::ArithmeticOverflow)
        })?;
        if total_weight == 0 {
            return Err(RewardError::NoEligibleWeight);
        }

        let carried_in = match self.policy {
            RemainderPolicy::CarryForward => self.carried,
            RemainderPolicy::Retain => 0,
        };
        let distributable = amount
            .checked_add(carried_in)
            .ok_or(RewardError::ArithmeticOverflow)?;

        let allocations = weights
            .into_iter()
            .map(|(id, weight)| {
                let share = share_of(weight, distributable, total_weight)?;
                Ok(Allocation { id, weight, share })
            })
            .collect::<Result<Vec<_>, RewardError>>()?;

        Ok(DistributionPlan {
            injected: amount,
            carried_in,
            total_weight,
            allocations,
            timestamp: now,
        })
    }

    /// Credit a plan's shares to the ledger and advance the distribution tick.
    ///
    /// The plan must come from [`plan`](Self::plan) against the same ledger
    /// state; every credit is checked before any is applied.
    pub fn apply(
        &mut self,
        ledger: &mut PositionLedger,
        plan: DistributionPlan,
    ) -> Result<DistributionOutcome, RewardError> {
        for allocation in &plan.allocations {
            let position = ledger
                .get(allocation.id)
                .map_err(|_| RewardError::NoActivePositions)?;
            if !position.active {
                return Err(RewardError::NoActivePositions);
            }
            position
                .accrued_reward
                .checked_add(allocation.share)
                .ok_or(RewardError::ArithmeticOverflow)?;
        }
        let distributed = plan.distributed();
        let remainder = plan.remainder();

        for allocation in &plan.allocations {
            if allocation.share > 0 {
                ledger
                    .credit_reward(allocation.id, allocation.share)
                    .map_err(|_| RewardError::ArithmeticOverflow)?;
            }
            debug!(
                id = %allocation.id,
                weight = allocation.weight,
                share = allocation.share,
                "reward allocated"
            );
        }

        match self.policy {
            RemainderPolicy::CarryForward => self.carried = remainder,
            RemainderPolicy::Retain => self.retained = self.retained.saturating_add(remainder),
        }
        self.total_distributed = self.total_distributed.saturating_add(distributed);
        self.distributions += 1;
        self.last_reward_timestamp = plan.timestamp;

        Ok(DistributionOutcome {
            amount: plan.injected,
            distributed,
            remainder,
            total_weight: plan.total_weight,
            recipients: plan.allocations,
            timestamp: plan.timestamp,
        })
    }

    /// [`plan`](Self::plan) then [`apply`](Self::apply).
    pub fn distribute(
        &mut self,
        ledger: &mut PositionLedger,
        amount: Amount,
        now: Timestamp,
    ) -> Result<DistributionOutcome, RewardError> {
        let plan = self.plan(ledger, amount, now)?;
        self.apply(ledger, plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::UNIT;
    use crate::types::Identity;
    use proptest::prelude::*;

    fn alice() -> Identity {
        Identity::from_label("alice")
    }

    fn carry() -> RewardDistributor {
        RewardDistributor::new(RemainderPolicy::CarryForward)
    }

    // ------------------------------------------------------------------
    // Preconditions
    // ------------------------------------------------------------------

    #[test]
    fn fails_without_positions() {
        let mut ledger = PositionLedger::new();
        let mut d = carry();
        assert_eq!(
            d.distribute(&mut ledger, UNIT, 10),
            Err(RewardError::NoActivePositions)
        );
        assert_eq!(d.last_reward_timestamp(), 0);
    }

    #[test]
    fn fails_on_zero_amount() {
        let mut ledger = PositionLedger::new();
        ledger.create(alice(), UNIT, 1).unwrap();
        assert_eq!(
            carry().distribute(&mut ledger, 0, 5),
            Err(RewardError::InvalidAmount)
        );
    }

    #[test]
    fn fails_with_zero_elapsed_time() {
        let mut ledger = PositionLedger::new();
        ledger.create(alice(), UNIT, 5).unwrap();
        let mut d = carry();
        assert_eq!(
            d.distribute(&mut ledger, UNIT, 5),
            Err(RewardError::NoEligibleWeight)
        );
        assert_eq!(ledger.get(PositionId(1)).unwrap().accrued_reward, 0);
    }

    #[test]
    fn fails_when_clock_goes_backwards() {
        let mut ledger = PositionLedger::new();
        ledger.create(alice(), UNIT, 1).unwrap();
        let mut d = carry();
        d.distribute(&mut ledger, 10, 10).unwrap();
        assert_eq!(
            d.distribute(&mut ledger, 10, 9),
            Err(RewardError::StaleTimestamp { now: 9, last: 10 })
        );
    }

    #[test]
    fn fails_after_all_withdrawn() {
        let mut ledger = PositionLedger::new();
        let id = ledger.create(alice(), UNIT, 1).unwrap();
        ledger.deactivate(id, &alice()).unwrap();
        assert_eq!(
            carry().distribute(&mut ledger, UNIT, 5),
            Err(RewardError::NoActivePositions)
        );
    }

    // ------------------------------------------------------------------
    // Splits
    // ------------------------------------------------------------------

    #[test]
    fn single_position_takes_everything() {
        let mut ledger = PositionLedger::new();
        let id = ledger.create(alice(), UNIT, 1).unwrap();
        let mut d = carry();
        let out = d.distribute(&mut ledger, UNIT / 2, 2).unwrap();
        assert_eq!(out.distributed, UNIT / 2);
        assert_eq!(out.remainder, 0);
        let p = ledger.get(id).unwrap();
        assert_eq!(p.accrued_reward, UNIT / 2);
        assert_eq!(p.balance(), UNIT + UNIT / 2);
        assert_eq!(d.last_reward_timestamp(), 2);
    }

    #[test]
    fn older_position_earns_more() {
        // Equal deposits at t=1 and t=2, reward at t=3: weights 2:1.
        let mut ledger = PositionLedger::new();
        let a = ledger.create(alice(), UNIT, 1).unwrap();
        let b = ledger.create(alice(), UNIT, 2).unwrap();
        let out = carry().distribute(&mut ledger, 300, 3).unwrap();
        assert_eq!(out.total_weight, 3 * UNIT as u128);
        assert_eq!(ledger.get(a).unwrap().accrued_reward, 200);
        assert_eq!(ledger.get(b).unwrap().accrued_reward, 100);
    }

    #[test]
    fn larger_deposit_earns_more() {
        let mut ledger = PositionLedger::new();
        let a = ledger.create(alice(), 3 * UNIT, 0).unwrap();
        let b = ledger.create(alice(), UNIT, 0).unwrap();
        carry().distribute(&mut ledger, 400, 10).unwrap();
        assert_eq!(ledger.get(a).unwrap().accrued_reward, 300);
        assert_eq!(ledger.get(b).unwrap().accrued_reward, 100);
    }

    #[test]
    fn previous_distribution_resets_clock() {
        // Position #1 at t=0, reward at t=4 consumes 4 ticks.
        // Position #2 at t=6, reward at t=8: #1 counts 8-4=4, #2 counts 8-6=2.
        let mut ledger = PositionLedger::new();
        let a = ledger.create(alice(), UNIT, 0).unwrap();
        let mut d = carry();
        d.distribute(&mut ledger, 50, 4).unwrap();
        let b = ledger.create(alice(), UNIT, 6).unwrap();
        let out = d.distribute(&mut ledger, 60, 8).unwrap();
        assert_eq!(out.recipients[0].weight, 4 * UNIT as u128);
        assert_eq!(out.recipients[1].weight, 2 * UNIT as u128);
        assert_eq!(ledger.get(a).unwrap().accrued_reward, 50 + 40);
        assert_eq!(ledger.get(b).unwrap().accrued_reward, 20);
    }

    #[test]
    fn withdrawn_positions_excluded() {
        let mut ledger = PositionLedger::new();
        let a = ledger.create(alice(), UNIT, 0).unwrap();
        let b = ledger.create(alice(), UNIT, 0).unwrap();
        ledger.deactivate(a, &alice()).unwrap();
        let out = carry().distribute(&mut ledger, 77, 5).unwrap();
        assert_eq!(out.recipients.len(), 1);
        assert_eq!(ledger.get(a).unwrap().accrued_reward, 0);
        assert_eq!(ledger.get(b).unwrap().accrued_reward, 77);
    }

    #[test]
    fn zero_weight_position_gets_nothing() {
        // #2 opens at the distribution tick: weight 0, share 0.
        let mut ledger = PositionLedger::new();
        let a = ledger.create(alice(), UNIT, 0).unwrap();
        let b = ledger.create(alice(), UNIT, 5).unwrap();
        carry().distribute(&mut ledger, 10, 5).unwrap();
        assert_eq!(ledger.get(a).unwrap().accrued_reward, 10);
        assert_eq!(ledger.get(b).unwrap().accrued_reward, 0);
    }

    // ------------------------------------------------------------------
    // Remainder policies
    // ------------------------------------------------------------------

    fn three_equal(ledger: &mut PositionLedger) {
        for _ in 0..3 {
            ledger.create(alice(), UNIT, 0).unwrap();
        }
    }

    #[test]
    fn carry_forward_adds_remainder_to_next_injection() {
        let mut ledger = PositionLedger::new();
        three_equal(&mut ledger);
        let mut d = carry();
        let first = d.distribute(&mut ledger, 10, 1).unwrap();
        assert_eq!(first.distributed, 9);
        assert_eq!(first.remainder, 1);
        assert_eq!(d.carried_remainder(), 1);

        let second = d.distribute(&mut ledger, 11, 2).unwrap();
        assert_eq!(second.distributed, 12);
        assert_eq!(second.remainder, 0);
        assert_eq!(d.carried_remainder(), 0);
        for p in ledger.iter() {
            assert_eq!(p.accrued_reward, 7);
        }
        assert_eq!(d.total_distributed(), 21);
    }

    #[test]
    fn retain_accumulates_remainder() {
        let mut ledger = PositionLedger::new();
        three_equal(&mut ledger);
        let mut d = RewardDistributor::new(RemainderPolicy::Retain);
        d.distribute(&mut ledger, 10, 1).unwrap();
        d.distribute(&mut ledger, 11, 2).unwrap();
        assert_eq!(d.retained_remainder(), 1 + 2);
        assert_eq!(d.carried_remainder(), 0);
        assert_eq!(d.undistributed(), 3);
        for p in ledger.iter() {
            assert_eq!(p.accrued_reward, 3 + 3);
        }
    }

    #[test]
    fn failed_plan_keeps_carried_remainder() {
        let mut ledger = PositionLedger::new();
        three_equal(&mut ledger);
        let mut d = carry();
        d.distribute(&mut ledger, 10, 1).unwrap();
        assert!(d.distribute(&mut ledger, 10, 1).is_err());
        assert_eq!(d.carried_remainder(), 1);
        assert_eq!(d.distributions(), 1);
    }

    #[test]
    fn plan_is_pure() {
        let mut ledger = PositionLedger::new();
        ledger.create(alice(), UNIT, 0).unwrap();
        let d = carry();
        let plan = d.plan(&ledger, 100, 3).unwrap();
        assert_eq!(plan.distributable(), 100);
        assert_eq!(ledger.get(PositionId(1)).unwrap().accrued_reward, 0);
        assert_eq!(d.last_reward_timestamp(), 0);
    }

    #[test]
    fn overflowing_weight_reported() {
        let mut ledger = PositionLedger::new();
        ledger.create(alice(), Amount::MAX, 0).unwrap();
        ledger.create(alice(), Amount::MAX, 0).unwrap();
        assert_eq!(
            carry().distribute(&mut ledger, Amount::MAX, Timestamp::MAX),
            Err(RewardError::ArithmeticOverflow)
        );
    }

    #[test]
    fn year_long_whale_position_takes_whole_reward() {
        // 10M units held for a year of wall-clock seconds: weight ~2^78,
        // and weight × reward is well past u128.
        let start = 1_700_000_000;
        let year = 31_536_000;
        let mut ledger = PositionLedger::new();
        let id = ledger.create(alice(), 10_000_000 * UNIT, start).unwrap();
        let mut d = carry();
        let out = d.distribute(&mut ledger, 2_000_000 * UNIT, start + year).unwrap();
        assert_eq!(out.distributed, 2_000_000 * UNIT);
        assert_eq!(out.remainder, 0);
        assert_eq!(ledger.get(id).unwrap().balance(), 12_000_000 * UNIT);
    }

    #[test]
    fn wide_products_split_exactly() {
        let start = 1_700_000_000;
        let mut ledger = PositionLedger::new();
        let a = ledger.create(alice(), 30_000_000 * UNIT, start).unwrap();
        let b = ledger.create(alice(), 10_000_000 * UNIT, start).unwrap();
        let out = carry()
            .distribute(&mut ledger, 4_000_000 * UNIT, start + 31_536_000)
            .unwrap();
        assert_eq!(ledger.get(a).unwrap().accrued_reward, 3_000_000 * UNIT);
        assert_eq!(ledger.get(b).unwrap().accrued_reward, 1_000_000 * UNIT);
        assert_eq!(out.remainder, 0);
    }

    #[test]
    fn max_amount_to_single_position() {
        let mut ledger = PositionLedger::new();
        let id = ledger.create(alice(), 1, 0).unwrap();
        carry().distribute(&mut ledger, Amount::MAX - 1, Timestamp::MAX).unwrap();
        assert_eq!(ledger.get(id).unwrap().accrued_reward, Amount::MAX - 1);
    }

    #[test]
    fn lifetime_total_saturates() {
        let mut ledger = PositionLedger::new();
        ledger.create(alice(), UNIT, 0).unwrap();
        let mut d = carry();
        d.total_distributed = Amount::MAX - 5;
        let out = d.distribute(&mut ledger, 100, 1).unwrap();
        assert_eq!(out.distributed, 100);
        assert_eq!(d.total_distributed(), Amount::MAX);
        assert_eq!(d.distributions(), 1);
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    proptest! {
        #[test]
        fn shares_never_exceed_amount(
            deposits in prop::collection::vec((1u64..1_000_000 * UNIT, 0u64..1_000), 1..20),
            amount in 1u64..1_000_000 * UNIT,
        ) {
            let mut ledger = PositionLedger::new();
            for (value, created) in &deposits {
                ledger.create(alice(), *value, *created).unwrap();
            }
            let mut d = carry();
            let out = d.distribute(&mut ledger, amount, 1_000).unwrap();
            prop_assert!(out.distributed <= amount);
            prop_assert_eq!(out.distributed + out.remainder, amount);
            prop_assert_eq!(d.carried_remainder(), out.remainder);
        }

        #[test]
        fn full_range_amounts_never_overflow(
            deposits in prop::collection::vec((1u64..=u64::MAX / 16, 0u64..1_000_000_000), 1..8),
            amount in 1u64..=u64::MAX,
            elapsed in 1u64..1_000_000_000,
        ) {
            let mut ledger = PositionLedger::new();
            for (value, created) in &deposits {
                ledger.create(alice(), *value, *created).unwrap();
            }
            let out = carry()
                .distribute(&mut ledger, amount, 1_000_000_000 + elapsed)
                .unwrap();
            prop_assert!(out.distributed <= amount);
            prop_assert_eq!(out.distributed + out.remainder, amount);
            if deposits.len() == 1 {
                prop_assert_eq!(out.distributed, amount);
            }
        }

        #[test]
        fn equal_weights_get_equal_shares(
            count in 2usize..12,
            value in 1u64..1_000 * UNIT,
            amount in 1u64..1_000 * UNIT,
        ) {
            let mut ledger = PositionLedger::new();
            for _ in 0..count {
                ledger.create(alice(), value, 0).unwrap();
            }
            let out = carry().distribute(&mut ledger, amount, 10).unwrap();
            let first = out.recipients[0].share;
            prop_assert!(out.recipients.iter().all(|a| a.share == first));
        }
    }
}
