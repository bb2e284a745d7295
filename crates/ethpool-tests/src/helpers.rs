//! Shared test helpers for scenario and adversarial tests.

use std::sync::Arc;

use ethpool_core::constants::UNIT;
use ethpool_core::{Identity, ManualClock, MemoryVault, Pool, PoolConfig, TickingClock};

/// Starting wallet balance for every test account.
pub const STARTING_BALANCE: u64 = 10_000 * UNIT;

/// Named test accounts: the deployer first, then five plain signers.
pub struct Accounts {
    pub owner: Identity,
    pub addr1: Identity,
    pub addr2: Identity,
    pub addr3: Identity,
    pub addr4: Identity,
    pub addr5: Identity,
}

impl Accounts {
    pub fn new() -> Self {
        Self {
            owner: Identity::from_label("owner"),
            addr1: Identity::from_label("addr1"),
            addr2: Identity::from_label("addr2"),
            addr3: Identity::from_label("addr3"),
            addr4: Identity::from_label("addr4"),
            addr5: Identity::from_label("addr5"),
        }
    }

    pub fn all(&self) -> [Identity; 6] {
        [self.owner, self.addr1, self.addr2, self.addr3, self.addr4, self.addr5]
    }
}

impl Default for Accounts {
    fn default() -> Self {
        Self::new()
    }
}

/// A pool whose vault has every test account funded.
pub fn funded_vault(accounts: &Accounts) -> Arc<MemoryVault> {
    let vault = Arc::new(MemoryVault::new());
    for who in accounts.all() {
        vault.credit(&who, STARTING_BALANCE);
    }
    vault
}

/// Pool driven by a manual clock starting at `start`.
pub fn manual_pool(
    accounts: &Accounts,
    config: PoolConfig,
    start: u64,
) -> (Pool, Arc<MemoryVault>, Arc<ManualClock>) {
    let vault = funded_vault(accounts);
    let clock = Arc::new(ManualClock::new(start));
    let pool = Pool::with_config(accounts.owner, config, vault.clone(), clock.clone());
    (pool, vault, clock)
}

/// Pool that mines every operation in its own block, first block at height 1.
pub fn automine_pool(accounts: &Accounts) -> (Pool, Arc<MemoryVault>, Arc<TickingClock>) {
    let vault = funded_vault(accounts);
    let clock = Arc::new(TickingClock::new(1));
    let pool = Pool::new(accounts.owner, vault.clone(), clock.clone());
    (pool, vault, clock)
}

/// Parse a decimal amount of whole units ("1.5") into base units.
///
/// Panics on malformed input; test-only.
pub fn units(s: &str) -> u64 {
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    assert!(frac.len() <= 9, "too many decimals: {s}");
    let whole: u64 = whole.parse().expect("whole part");
    let frac_scaled: u64 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<9}").parse().expect("fractional part")
    };
    whole * UNIT + frac_scaled
}
