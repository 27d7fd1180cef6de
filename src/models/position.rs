//! # models::position
//!
//! [`Position`] — inventory the brokerage holds for the account. Only read,
//! and offset to zero by the closeout task.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub symbol_id: u64,
    /// Signed share count. Negative = short.
    pub open_quantity: f64,
}

impl Position {
    /// Signed whole-share quantity that flattens this position.
    pub fn offsetting_quantity(&self) -> i64 {
        -(self.open_quantity.round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsetting_quantity_negates() {
        let long = Position { symbol: "GM".into(), symbol_id: 1, open_quantity: 12.0 };
        let short = Position { symbol: "F".into(), symbol_id: 2, open_quantity: -7.0 };
        assert_eq!(long.offsetting_quantity(), -12);
        assert_eq!(short.offsetting_quantity(), 7);
    }
}
