//! # engine::budget
//!
//! **Budget Allocator** — splits spendable cash evenly across the actionable
//! strategies of one trigger event, keeping a fixed reserve untouched.

use tracing::warn;

/// Default reserve in dollars that is never traded.
pub const DEFAULT_CASH_HOLD: f64 = 1000.0;

/// Per-strategy budget. `0.0` means "no budget" and the batch must be dropped.
pub fn budget_per(balance: f64, num_strategies: usize, cash_hold: f64) -> f64 {
    if num_strategies == 0 {
        warn!("No budget without strategies");
        return 0.0;
    }
    round2((balance - cash_hold).max(0.0) / num_strategies as f64)
}

/// Round to cents.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
