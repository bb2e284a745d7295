//! Pool orchestration.
//!
//! [`Pool`] composes the [`AccessRegistry`], [`PositionLedger`] and
//! [`RewardDistributor`] with the two external collaborators: a
//! [`ValueTransfer`] custody and a [`Clock`]. Every operation takes the caller
//! explicitly and either commits fully or leaves no trace:
//!
//! - `deposit`: validate, collect funds, open position
//! - `inject_rewards`: check policy, plan split, collect funds, apply split
//! - `withdraw`: deactivate, pay out, reactivate if the payout fails
//!
//! Events are recorded only after an operation commits.
//!
//! Not thread-safe on its own; see [`SharedPool`](crate::shared::SharedPool).

use std::sync::Arc;

use tracing::{info, warn};

use crate::access::AccessRegistry;
use crate::config::{PoolConfig, RewardAccess};
use crate::distributor::{DistributionOutcome, RewardDistributor};
use crate::error::{LedgerError, PoolError};
use crate::invariants::{self, InvariantViolation};
use crate::ledger::PositionLedger;
use crate::traits::{Clock, ValueTransfer};
use crate::types::{Amount, Identity, PoolEvent, Position, PositionId, Timestamp};

/// The liquidity pool.
pub struct Pool {
    config: PoolConfig,
    registry: AccessRegistry,
    ledger: PositionLedger,
    distributor: RewardDistributor,
    transfer: Arc<dyn ValueTransfer>,
    clock: Arc<dyn Clock>,
    events: Vec<PoolEvent>,
}

impl Pool {
    /// Create a pool with default policy. `deployer` becomes the first team member.
    pub fn new(
        deployer: Identity,
        transfer: Arc<dyn ValueTransfer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_config(deployer, PoolConfig::default(), transfer, clock)
    }

    /// Create a pool with explicit policy.
    pub fn with_config(
        deployer: Identity,
        config: PoolConfig,
        transfer: Arc<dyn ValueTransfer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!(
            %deployer,
            reward_access = %config.reward_access,
            remainder_policy = %config.remainder_policy,
            "pool created"
        );
        Self {
            config,
            registry: AccessRegistry::new(deployer),
            ledger: PositionLedger::new(),
            distributor: RewardDistributor::new(config.remainder_policy),
            transfer,
            clock,
            events: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Deposit `amount` from `caller`, opening a new position they own.
    pub fn deposit(&mut self, caller: &Identity, amount: Amount) -> Result<PositionId, PoolError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount.into());
        }
        if caller.is_zero() {
            return Err(LedgerError::InvalidRecipient(*caller).into());
        }
        let now = self.clock.now();
        self.transfer.collect(caller, amount)?;

        let id = match self.ledger.create(*caller, amount, now) {
            Ok(id) => id,
            Err(e) => {
                self.refund(caller, amount);
                return Err(e.into());
            }
        };

        info!(%id, owner = %caller, amount, at = now, "liquidity added");
        self.events.push(PoolEvent::LiquidityAdded {
            id,
            owner: *caller,
            amount,
        });
        Ok(id)
    }

    /// Withdraw a position, paying principal plus reward to `caller`.
    ///
    /// If the payout fails the position is restored and the transfer error
    /// is returned.
    pub fn withdraw(&mut self, caller: &Identity, id: PositionId) -> Result<Amount, PoolError> {
        let redemption = self.ledger.deactivate(id, caller)?;
        let amount = redemption.amount();

        if let Err(e) = self.transfer.pay(caller, amount) {
            warn!(%id, owner = %caller, amount, error = %e, "payout failed, position restored");
            self.ledger.reactivate(&redemption)?;
            return Err(e.into());
        }

        info!(%id, owner = %caller, amount, "liquidity removed");
        self.events.push(PoolEvent::LiquidityRemoved {
            id,
            owner: *caller,
            amount,
        });
        Ok(amount)
    }

    /// Fund `amount` of rewards from `caller` and split it across active positions.
    pub fn inject_rewards(
        &mut self,
        caller: &Identity,
        amount: Amount,
    ) -> Result<DistributionOutcome, PoolError> {
        if self.config.reward_access == RewardAccess::TeamOnly {
            self.registry.ensure_member(caller)?;
        }
        let now = self.clock.now();
        let plan = self.distributor.plan(&self.ledger, amount, now)?;
        self.transfer.collect(caller, amount)?;

        let outcome = match self.distributor.apply(&mut self.ledger, plan) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.refund(caller, amount);
                return Err(e.into());
            }
        };

        info!(
            by = %caller,
            amount,
            distributed = outcome.distributed,
            remainder = outcome.remainder,
            recipients = outcome.recipients.len(),
            at = now,
            "rewards distributed"
        );
        self.events.push(PoolEvent::RewardsDistributed {
            amount,
            distributed: outcome.distributed,
            remainder: outcome.remainder,
            recipients: outcome.recipients.len(),
            timestamp: outcome.timestamp,
        });
        Ok(outcome)
    }

    /// Grant the team-member privilege to `member`. `caller` must be a member.
    pub fn add_team_member(
        &mut self,
        caller: &Identity,
        member: Identity,
    ) -> Result<(), PoolError> {
        if self.registry.add_member(member, caller)? {
            info!(%member, by = %caller, "team member added");
            self.events.push(PoolEvent::TeamMemberAdded {
                member,
                added_by: *caller,
            });
        }
        Ok(())
    }

    /// Hand a position to `to`. Only the current owner may transfer.
    pub fn transfer_position(
        &mut self,
        caller: &Identity,
        id: PositionId,
        to: Identity,
    ) -> Result<(), PoolError> {
        self.ledger.transfer(id, caller, to)?;
        if to != *caller {
            info!(%id, from = %caller, %to, "position transferred");
            self.events.push(PoolEvent::PositionTransferred {
                id,
                from: *caller,
                to,
            });
        }
        Ok(())
    }

    /// Return funds collected for an operation that then failed.
    fn refund(&self, to: &Identity, amount: Amount) {
        if let Err(e) = self.transfer.pay(to, amount) {
            warn!(account = %to, amount, error = %e, "refund failed");
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Whether `identity` is a team member.
    pub fn is_team_member(&self, identity: &Identity) -> bool {
        self.registry.is_member(identity)
    }

    /// Whether `caller` is a team member (convenience form).
    pub fn is_caller_team_member(&self, caller: &Identity) -> bool {
        self.is_team_member(caller)
    }

    /// Whether the position id was ever issued.
    pub fn exists(&self, id: PositionId) -> bool {
        self.ledger.exists(id)
    }

    /// Number of positions ever created.
    pub fn tokens_amount(&self) -> u64 {
        self.ledger.total_created()
    }

    /// Number of active positions.
    pub fn active_tokens(&self) -> u64 {
        self.ledger.active_count()
    }

    /// Number of position records held by `owner`.
    pub fn balance_of_owner(&self, owner: &Identity) -> u64 {
        self.ledger.balance_of_owner(owner)
    }

    /// Ids held by `owner`, ascending.
    pub fn positions_of(&self, owner: &Identity) -> Vec<PositionId> {
        self.ledger.positions_of(owner)
    }

    /// Principal plus accrued reward of a position.
    pub fn balance_of_position(&self, id: PositionId) -> Result<Amount, PoolError> {
        Ok(self.ledger.get(id)?.balance())
    }

    /// Principal of a position.
    pub fn deposit_of(&self, id: PositionId) -> Result<Amount, PoolError> {
        Ok(self.ledger.get(id)?.deposited)
    }

    /// Accrued reward of a position.
    pub fn reward_of(&self, id: PositionId) -> Result<Amount, PoolError> {
        Ok(self.ledger.get(id)?.accrued_reward)
    }

    /// Full position record.
    pub fn position(&self, id: PositionId) -> Result<&Position, PoolError> {
        Ok(self.ledger.get(id)?)
    }

    /// Tick of the last reward injection; `0` before the first.
    pub fn last_reward_timestamp(&self) -> Timestamp {
        self.distributor.last_reward_timestamp()
    }

    /// Funds held by the pool that belong to no position.
    pub fn undistributed_remainder(&self) -> Amount {
        self.distributor.undistributed()
    }

    /// Sum of every reward share ever credited.
    pub fn total_distributed(&self) -> Amount {
        self.distributor.total_distributed()
    }

    /// The active policy.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Read-only access to the position table.
    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// Read-only access to the team registry.
    pub fn registry(&self) -> &AccessRegistry {
        &self.registry
    }

    /// Drain committed events in commit order.
    pub fn take_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }

    /// Check bookkeeping invariants against the custody balance.
    pub fn audit(&self) -> Result<(), InvariantViolation> {
        invariants::check(
            &self.ledger,
            self.distributor.undistributed(),
            self.transfer.custody_balance(),
        )
    }
}
