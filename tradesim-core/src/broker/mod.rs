//! Broker — cash, the single position, the price cursor and the trade ledger.
//!
//! All derived quantities (equity, free assets, account state) are computed
//! on demand from four pieces of state: `assets`, `position`, `current_step`
//! and `closed_trades`. `assets` only changes when a position closes, by
//! exactly the PnL realized at that step.

pub mod account;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::domain::{Candles, Position, PriceSeries, TradeRecord};
use crate::error::BrokerError;

pub use account::{fee_adjusted, AccountState, OrderOutcome};

/// Single-asset, single-position simulated broker.
#[derive(Debug, Clone)]
pub struct Broker {
    data: PriceSeries,
    current_step: usize,
    initial_assets: f64,
    assets: f64,
    fee: f64,
    position: Position,
    closed_trades: Vec<TradeRecord>,
}

impl Broker {
    pub fn new(data: PriceSeries, assets: f64, fee: f64) -> Result<Self, BrokerError> {
        if !fee.is_finite() || fee < 0.0 {
            return Err(BrokerError::InvalidFee(fee));
        }
        if !assets.is_finite() {
            return Err(BrokerError::InvalidAssets(assets));
        }
        Ok(Self {
            data,
            current_step: 0,
            initial_assets: assets,
            assets,
            fee,
            position: Position::flat(),
            closed_trades: Vec::new(),
        })
    }

    // ── Order processing ──

    /// Open from flat, or close with an exactly offsetting size.
    ///
    /// A zero size is a no-op. Partial closes and reversals are rejected
    /// without touching any state.
    pub fn new_order(&mut self, size: f64, limit_price: f64) -> Result<OrderOutcome, BrokerError> {
        if size == 0.0 {
            return Ok(OrderOutcome::Ignored);
        }
        if self.position.is_flat() {
            let entry_price = self.adjusted_price(size, limit_price);
            let entry_time = self.current_datetime();
            self.position.open(size, entry_price, entry_time)?;
            debug!(
                step = self.current_step,
                size,
                entry_price,
                "opened position"
            );
            return Ok(OrderOutcome::Opened { size, entry_price });
        }

        let held = self.position.size();
        if size != -held {
            return Err(BrokerError::NonOffsettingOrder {
                held,
                requested: size,
            });
        }
        self.close_position().map(OrderOutcome::Closed)
    }

    /// Realize the open position at the current step.
    ///
    /// Credits the PnL to `assets` and appends the trade to the ledger in one
    /// step. Fails if the position is flat.
    pub fn close_position(&mut self) -> Result<TradeRecord, BrokerError> {
        let exit_price = self.current_price();
        let exit_time = self.current_datetime();
        let trade = self.position.close(exit_price, exit_time)?;
        self.assets += trade.pnl;
        debug!(
            step = self.current_step,
            size = trade.size,
            exit_price,
            pnl = trade.pnl,
            assets = self.assets,
            "closed position"
        );
        self.closed_trades.push(trade.clone());
        Ok(trade)
    }

    /// Fee-inclusive quote for `size` at `price`; does not touch state.
    pub fn adjusted_price(&self, size: f64, price: f64) -> f64 {
        fee_adjusted(size, price, self.fee)
    }

    // ── Cursor ──

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn set_step(&mut self, step: usize) -> Result<(), BrokerError> {
        if step >= self.data.len() {
            return Err(BrokerError::StepOutOfRange {
                step,
                len: self.data.len(),
            });
        }
        self.current_step = step;
        Ok(())
    }

    /// Move to the next row. Returns `false` (and stays put) on the last row.
    pub fn advance(&mut self) -> bool {
        if self.current_step + 1 < self.data.len() {
            self.current_step += 1;
            true
        } else {
            false
        }
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step + 1 == self.data.len()
    }

    /// Back to the construction state: step 0, initial assets, flat, empty ledger.
    pub fn reset(&mut self) {
        self.current_step = 0;
        self.assets = self.initial_assets;
        self.position = Position::flat();
        self.closed_trades.clear();
    }

    // ── Market data ──

    pub fn data(&self) -> &PriceSeries {
        &self.data
    }

    /// Raw rows `[start, end)`.
    pub fn get_candles(&self, start: usize, end: usize) -> Result<Candles<'_>, BrokerError> {
        Ok(self.data.candles(start, end)?)
    }

    pub fn latest_candle(&self) -> &[f64] {
        self.data.row(self.current_step)
    }

    pub fn current_price(&self) -> f64 {
        self.data.close(self.current_step)
    }

    pub fn current_datetime(&self) -> NaiveDateTime {
        self.data.timestamp(self.current_step)
    }

    // ── Account ──

    pub fn fee(&self) -> f64 {
        self.fee
    }

    pub fn initial_assets(&self) -> f64 {
        self.initial_assets
    }

    /// Realized cash.
    pub fn assets(&self) -> f64 {
        self.assets
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn closed_trades(&self) -> &[TradeRecord] {
        &self.closed_trades
    }

    /// Unrealized PnL of the open position at the current price.
    pub fn profit_or_loss(&self) -> f64 {
        self.position.profit_or_loss(self.current_price())
    }

    pub fn profit_or_loss_pct(&self) -> f64 {
        self.position.profit_or_loss_pct(self.current_price())
    }

    /// Realized cash plus mark-to-market of the open position.
    pub fn equity(&self) -> f64 {
        self.assets + self.profit_or_loss()
    }

    /// Equity left after reserving the full notional of the open position.
    /// Never negative.
    pub fn free_assets(&self) -> f64 {
        let used_assets = self.position.size().abs() * self.current_price();
        (self.equity() - used_assets).max(0.0)
    }

    pub fn account_state(&self) -> AccountState {
        let price = self.current_price();
        AccountState {
            affordable: self.free_assets() > price * (1.0 + self.fee),
            pnl_pct: self.profit_or_loss_pct(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> PriceSeries {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        PriceSeries::new(
            (0..closes.len())
                .map(|i| base + chrono::Duration::days(i as i64))
                .collect(),
            vec!["Close".into()],
            closes.iter().map(|c| vec![*c]).collect(),
        )
        .unwrap()
    }

    fn broker(closes: &[f64]) -> Broker {
        Broker::new(series(closes), 1000.0, 0.001).unwrap()
    }

    #[test]
    fn zero_size_is_ignored() {
        let mut b = broker(&[100.0]);
        assert_eq!(b.new_order(0.0, 100.0).unwrap(), OrderOutcome::Ignored);
        assert!(b.position().is_flat());
    }

    #[test]
    fn open_sets_fee_adjusted_entry_and_time() {
        let mut b = broker(&[100.0, 101.0]);
        b.set_step(1).unwrap();
        b.new_order(-2.0, 101.0).unwrap();
        let p = b.position();
        assert_eq!(p.size(), -2.0);
        assert!((p.entry_price().unwrap() - 101.0 * 0.999).abs() < 1e-12);
        assert_eq!(p.entry_time(), Some(b.current_datetime()));
        assert_eq!(b.assets(), 1000.0);
    }

    #[test]
    fn non_offsetting_order_leaves_state_untouched() {
        let mut b = broker(&[100.0, 105.0]);
        b.new_order(5.0, 100.0).unwrap();
        b.advance();
        let err = b.new_order(3.0, 105.0).unwrap_err();
        assert_eq!(
            err,
            BrokerError::NonOffsettingOrder {
                held: 5.0,
                requested: 3.0
            }
        );
        assert_eq!(b.position().size(), 5.0);
        assert_eq!(b.assets(), 1000.0);
        assert!(b.closed_trades().is_empty());

        // Reversal in one call is also rejected.
        assert!(b.new_order(-10.0, 105.0).is_err());
    }

    #[test]
    fn close_while_flat_fails() {
        let mut b = broker(&[100.0]);
        assert_eq!(b.close_position(), Err(BrokerError::PositionFlat));
        assert_eq!(b.assets(), 1000.0);
    }

    #[test]
    fn step_bounds_are_checked() {
        let mut b = broker(&[1.0, 2.0]);
        assert_eq!(
            b.set_step(2),
            Err(BrokerError::StepOutOfRange { step: 2, len: 2 })
        );
        assert!(b.advance());
        assert!(b.is_last_step());
        assert!(!b.advance());
        assert_eq!(b.current_step(), 1);
    }

    #[test]
    fn free_assets_floors_at_zero() {
        let mut b = Broker::new(series(&[100.0, 10.0]), 1000.0, 0.0).unwrap();
        b.new_order(-10.0, 100.0).unwrap();
        b.set_step(1).unwrap();
        // Short from 100 to 10: equity 1900, notional 100.
        assert_eq!(b.free_assets(), 1800.0);

        let mut b = Broker::new(series(&[100.0, 300.0]), 1000.0, 0.0).unwrap();
        b.new_order(-10.0, 100.0).unwrap();
        b.set_step(1).unwrap();
        // Equity -1000, notional 3000.
        assert_eq!(b.equity(), -1000.0);
        assert_eq!(b.free_assets(), 0.0);
    }

    #[test]
    fn account_state_flags_affordability() {
        let mut b = Broker::new(series(&[100.0]), 100.0, 0.001).unwrap();
        assert!(!b.account_state().affordable);
        b = Broker::new(series(&[100.0]), 100.2, 0.001).unwrap();
        let s = b.account_state();
        assert!(s.affordable);
        assert_eq!(s.pnl_pct, 0.0);
    }

    #[test]
    fn get_candles_range() {
        let b = broker(&[1.0, 2.0, 3.0]);
        assert_eq!(b.get_candles(0, 2).unwrap().as_slice(), &[1.0, 2.0]);
        assert!(matches!(
            b.get_candles(1, 5),
            Err(BrokerError::Series(_))
        ));
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut b = broker(&[100.0, 110.0]);
        b.new_order(1.0, 100.0).unwrap();
        b.advance();
        b.new_order(-1.0, 110.0).unwrap();
        b.reset();
        assert_eq!(b.current_step(), 0);
        assert_eq!(b.assets(), 1000.0);
        assert!(b.position().is_flat());
        assert!(b.closed_trades().is_empty());
    }

    #[test]
    fn invalid_construction_rejected() {
        assert_eq!(
            Broker::new(series(&[1.0]), 10.0, -0.1).unwrap_err(),
            BrokerError::InvalidFee(-0.1)
        );
        assert!(matches!(
            Broker::new(series(&[1.0]), f64::NAN, 0.0),
            Err(BrokerError::InvalidAssets(_))
        ));
    }
}
