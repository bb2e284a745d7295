//! Scenario and adversarial test suite for ETHPool.
//!
//! Integration tests that drive the public pool surface the way independent
//! callers would, and property tests that try to break its bookkeeping.

pub mod helpers;
