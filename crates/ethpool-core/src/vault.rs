//! In-memory [`ValueTransfer`] implementation.
//!
//! Keeps account wallets and pool custody in one map behind a single lock so
//! every transfer is atomic. No persistence. Suitable for tests and scenario
//! replay.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::TransferError;
use crate::traits::ValueTransfer;
use crate::types::{Amount, Identity};

#[derive(Debug, Default)]
struct VaultState {
    /// Spendable balance per account.
    wallets: HashMap<Identity, Amount>,
    /// Value held on behalf of the pool.
    custody: Amount,
    /// Accounts that refuse incoming payouts.
    frozen: HashSet<Identity>,
}

/// Wallets plus pool custody, all in memory.
#[derive(Debug, Default)]
pub struct MemoryVault {
    state: Mutex<VaultState>,
}

impl MemoryVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to an account's wallet (external funding).
    pub fn credit(&self, account: &Identity, amount: Amount) {
        let mut state = self.state.lock();
        let wallet = state.wallets.entry(*account).or_insert(0);
        *wallet = wallet.saturating_add(amount);
    }

    /// Current wallet balance of an account.
    pub fn balance_of(&self, account: &Identity) -> Amount {
        self.state.lock().wallets.get(account).copied().unwrap_or(0)
    }

    /// Make payouts to `account` fail until [`unfreeze`](Self::unfreeze).
    pub fn freeze(&self, account: &Identity) {
        self.state.lock().frozen.insert(*account);
    }

    /// Accept payouts to `account` again.
    pub fn unfreeze(&self, account: &Identity) {
        self.state.lock().frozen.remove(account);
    }
}

impl ValueTransfer for MemoryVault {
    fn collect(&self, from: &Identity, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        let have = state.wallets.get(from).copied().unwrap_or(0);
        let remaining = have
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientFunds {
                account: *from,
                have,
                need: amount,
            })?;
        let custody = state
            .custody
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected("custody overflow".to_string()))?;
        state.wallets.insert(*from, remaining);
        state.custody = custody;
        debug!(account = %from, amount, custody, "collected into custody");
        Ok(())
    }

    fn pay(&self, to: &Identity, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        if state.frozen.contains(to) {
            return Err(TransferError::Rejected(format!("recipient {to} is frozen")));
        }
        let custody = state
            .custody
            .checked_sub(amount)
            .ok_or(TransferError::CustodyShortfall {
                have: state.custody,
                need: amount,
            })?;
        let wallet = state.wallets.get(to).copied().unwrap_or(0);
        let credited = wallet
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected("wallet overflow".to_string()))?;
        state.custody = custody;
        state.wallets.insert(*to, credited);
        debug!(account = %to, amount, custody, "paid out of custody");
        Ok(())
    }

    fn custody_balance(&self) -> Amount {
        self.state.lock().custody
    }
}
