//! Account-level values derived from broker state.

use serde::{Deserialize, Serialize};

use crate::domain::TradeRecord;

/// Apply a proportional fee against the trader: buys fill higher, sells lower.
///
/// The sign of `size` picks the direction; a zero size is treated as a buy.
pub fn fee_adjusted(size: f64, price: f64, fee: f64) -> f64 {
    price * (1.0 + fee.copysign(size))
}

/// Compact account observation for a decision-making agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    /// Free assets exceed the fee-inclusive price of one more unit.
    pub affordable: bool,
    /// Directional return of the open position (0 when flat).
    pub pnl_pct: f64,
}

impl AccountState {
    /// `[affordable as 0/1, pnl_pct]`, for agents that want a flat vector.
    pub fn as_array(&self) -> [f64; 2] {
        [if self.affordable { 1.0 } else { 0.0 }, self.pnl_pct]
    }
}

/// What a call to `new_order` did.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    /// Size was zero.
    Ignored,
    Opened { size: f64, entry_price: f64 },
    Closed(TradeRecord),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_works_against_the_trader() {
        assert!((fee_adjusted(10.0, 100.0, 0.001) - 100.1).abs() < 1e-12);
        assert!((fee_adjusted(-10.0, 100.0, 0.001) - 99.9).abs() < 1e-12);
        assert_eq!(fee_adjusted(5.0, 100.0, 0.0), 100.0);
    }

    #[test]
    fn account_state_array_layout() {
        let s = AccountState {
            affordable: true,
            pnl_pct: -0.25,
        };
        assert_eq!(s.as_array(), [1.0, -0.25]);
    }
}
