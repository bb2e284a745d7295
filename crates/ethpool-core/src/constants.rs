//! Pool constants. All monetary values in base units (1 unit = 10^9 base units).

/// Base units per whole unit of pooled value.
pub const UNIT: u64 = 1_000_000_000;

/// First position id ever assigned. Id 0 is reserved and never issued.
pub const FIRST_POSITION_ID: u64 = 1;

/// Length in bytes of an [`Identity`](crate::types::Identity).
pub const IDENTITY_LEN: usize = 20;

/// Value of `last_reward_timestamp` before the first reward injection.
pub const NO_REWARD_YET: u64 = 0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_unit_is_exact() {
        assert_eq!(UNIT / 2 * 2, UNIT);
    }

    #[test]
    fn reserved_id_precedes_first() {
        assert!(FIRST_POSITION_ID > 0);
    }
}
