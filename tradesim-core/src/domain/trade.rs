//! TradeRecord — one realized round trip in the closed-trade ledger.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Direction of a trade or an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn of(size: f64) -> Option<Self> {
        if size > 0.0 {
            Some(Side::Long)
        } else if size < 0.0 {
            Some(Side::Short)
        } else {
            None
        }
    }
}

/// A closed trade. Frozen at the close step; the ledger never revises it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub size: f64,
    /// Fee-adjusted fill price at open.
    pub entry_price: f64,
    /// Close price at the exit step.
    pub exit_price: f64,
    #[serde(rename = "PnL")]
    pub pnl: f64,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
}

impl TradeRecord {
    pub fn side(&self) -> Side {
        if self.size < 0.0 {
            Side::Short
        } else {
            Side::Long
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// Realized PnL as a fraction of the entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.size.abs() * self.entry_price;
        if notional == 0.0 {
            return 0.0;
        }
        self.pnl / notional
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_trade(size: f64, pnl: f64) -> TradeRecord {
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        TradeRecord {
            size,
            entry_price: 100.0,
            exit_price: 110.0,
            pnl,
            entry_time: day.and_hms_opt(0, 0, 0).unwrap(),
            exit_time: day.and_hms_opt(16, 0, 0).unwrap(),
        }
    }

    #[test]
    fn return_pct_calculation() {
        let trade = sample_trade(-5.0, 25.0);
        assert!((trade.return_pct() - 0.05).abs() < 1e-12);
        assert_eq!(trade.side(), Side::Short);
    }

    #[test]
    fn is_winner() {
        assert!(sample_trade(1.0, 0.5).is_winner());
        assert!(!sample_trade(1.0, 0.0).is_winner());
    }

    #[test]
    fn pnl_serializes_under_ledger_column_name() {
        let json = serde_json::to_value(sample_trade(10.0, 99.0)).unwrap();
        assert_eq!(json["PnL"], 99.0);
        assert!(json.get("pnl").is_none());
    }

    #[test]
    fn side_of_size() {
        assert_eq!(Side::of(2.0), Some(Side::Long));
        assert_eq!(Side::of(-2.0), Some(Side::Short));
        assert_eq!(Side::of(0.0), None);
    }
}
