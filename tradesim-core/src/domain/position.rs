//! Position — the zero-or-one open holding owned by a broker.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::trade::{Side, TradeRecord};
use crate::error::BrokerError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct OpenLeg {
    size: f64,
    entry_price: f64,
    entry_time: NaiveDateTime,
}

/// Directional holding: flat, long (`size > 0`) or short (`size < 0`).
///
/// Entry price and entry time exist exactly when the position is open; the
/// representation makes any other combination unrepresentable. Valuation
/// takes the live price as an argument, so a position never needs a handle
/// back to its broker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    leg: Option<OpenLeg>,
}

impl Position {
    pub fn flat() -> Self {
        Self::default()
    }

    /// Signed size; `0.0` when flat.
    pub fn size(&self) -> f64 {
        self.leg.map_or(0.0, |l| l.size)
    }

    pub fn entry_price(&self) -> Option<f64> {
        self.leg.map(|l| l.entry_price)
    }

    pub fn entry_time(&self) -> Option<NaiveDateTime> {
        self.leg.map(|l| l.entry_time)
    }

    pub fn is_flat(&self) -> bool {
        self.leg.is_none()
    }

    pub fn is_long(&self) -> bool {
        self.size() > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.size() < 0.0
    }

    pub fn side(&self) -> Option<Side> {
        Side::of(self.size())
    }

    /// Unrealized PnL in price units against `current_price`.
    ///
    /// Fees are already inside `entry_price`; nothing is deducted here.
    pub fn profit_or_loss(&self, current_price: f64) -> f64 {
        match self.leg {
            None => 0.0,
            Some(l) => l.size * (current_price - l.entry_price),
        }
    }

    /// Directional return: positive whenever price moved in the position's favour.
    pub fn profit_or_loss_pct(&self, current_price: f64) -> f64 {
        match self.leg {
            None => 0.0,
            Some(l) => 1.0_f64.copysign(l.size) * (current_price - l.entry_price) / l.entry_price,
        }
    }

    /// Open from flat. `entry_price` is expected to be fee-adjusted already.
    pub(crate) fn open(
        &mut self,
        size: f64,
        entry_price: f64,
        entry_time: NaiveDateTime,
    ) -> Result<(), BrokerError> {
        if let Some(l) = self.leg {
            return Err(BrokerError::PositionNotFlat { held: l.size });
        }
        if size == 0.0 {
            return Err(BrokerError::ZeroSize);
        }
        self.leg = Some(OpenLeg {
            size,
            entry_price,
            entry_time,
        });
        Ok(())
    }

    /// Close at `exit_price`/`exit_time` and return the frozen trade.
    ///
    /// The caller is responsible for crediting `pnl` to cash and appending the
    /// record; the broker does both in the same call so neither is observable
    /// without the other.
    pub(crate) fn close(
        &mut self,
        exit_price: f64,
        exit_time: NaiveDateTime,
    ) -> Result<TradeRecord, BrokerError> {
        let leg = self.leg.take().ok_or(BrokerError::PositionFlat)?;
        Ok(TradeRecord {
            size: leg.size,
            entry_price: leg.entry_price,
            exit_price,
            pnl: leg.size * (exit_price - leg.entry_price),
            entry_time: leg.entry_time,
            exit_time,
        })
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.leg {
            None => write!(f, "Position(flat)"),
            Some(l) => write!(
                f,
                "Position(size: {}, entry_price: {:.4}, entry_time: {})",
                l.size, l.entry_price, l.entry_time
            ),
        }
    }
}
