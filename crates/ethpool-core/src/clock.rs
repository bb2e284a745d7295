//! [`Clock`] implementations.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::traits::Clock;
use crate::types::Timestamp;

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move the clock forward by `ticks`. Returns the new reading.
    pub fn advance(&self, ticks: u64) -> Timestamp {
        let prev = self.now.fetch_add(ticks, Ordering::SeqCst);
        prev.saturating_add(ticks)
    }

    /// Jump to `now`. Ignored if it would move the clock backwards.
    pub fn set(&self, now: Timestamp) {
        self.now.fetch_max(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// Clock that advances one tick on every read.
///
/// Models a chain that mines each submitted operation in its own block:
/// consecutive operations observe consecutive heights.
#[derive(Debug, Default)]
pub struct TickingClock {
    next: AtomicU64,
}

impl TickingClock {
    /// The first read returns `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// The value the next read will return, without consuming it.
    pub fn peek(&self) -> Timestamp {
        self.next.load(Ordering::SeqCst)
    }
}

impl Clock for TickingClock {
    fn now(&self) -> Timestamp {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

/// Wall clock in Unix seconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-epoch readings clamp to zero.
        chrono::Utc::now().timestamp().max(0) as Timestamp
    }
}
