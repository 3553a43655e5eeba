//! Episode — the stepping loop that drives a broker with a policy.
//!
//! One pass over the broker's series:
//! 1. Warmup: steps before `window_size` take no action
//! 2. Decision: the policy's action is translated into at most one order
//! 3. Liquidation: any open position is closed on the last row
//!
//! Equity is recorded after every step, so the curve has one point per row.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use tradesim_core::{Broker, BrokerError, TradeRecord};

use crate::metrics::PerformanceMetrics;
use crate::policy::{Action, Observation, Policy};

/// Stepping-loop parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Rows of history shown to the policy; also the warmup length.
    pub window_size: usize,
    /// Units per opened position.
    pub trade_size: f64,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            trade_size: 1.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error("trade size must be positive and finite, got {0}")]
    InvalidTradeSize(f64),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// How often each action was chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub hold: usize,
    pub buy: usize,
    pub sell: usize,
}

impl ActionCounts {
    fn record(&mut self, action: Action) {
        match action {
            Action::Hold => self.hold += 1,
            Action::Buy => self.buy += 1,
            Action::Sell => self.sell += 1,
        }
    }
}

/// Outcome of one episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub policy: String,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<f64>,
    pub actions: ActionCounts,
    pub initial_assets: f64,
    pub final_assets: f64,
    pub metrics: PerformanceMetrics,
}

/// Run `policy` over the whole series held by `broker`.
///
/// The broker and policy are reset first, so the same pair can be replayed.
/// On return the broker sits on the last row, flat.
pub fn run_episode(
    broker: &mut Broker,
    policy: &mut dyn Policy,
    config: &EpisodeConfig,
) -> Result<EpisodeResult, EpisodeError> {
    if !(config.trade_size.is_finite() && config.trade_size > 0.0) {
        return Err(EpisodeError::InvalidTradeSize(config.trade_size));
    }
    broker.reset();
    policy.reset();

    let close_col = broker.data().close_column();
    let mut equity_curve = Vec::with_capacity(broker.data().len());
    let mut actions = ActionCounts::default();

    loop {
        let step = broker.current_step();

        if broker.is_last_step() {
            if !broker.position().is_flat() {
                broker.close_position()?;
            }
        } else if step >= config.window_size {
            let start = (step + 1).saturating_sub(config.window_size);
            let obs = Observation {
                step,
                window: broker.get_candles(start, step + 1)?,
                close_col,
                account: broker.account_state(),
                position_size: broker.position().size(),
            };
            let action = policy.act(&obs);
            actions.record(action);
            apply_action(broker, action, config.trade_size)?;
        }

        equity_curve.push(broker.equity());
        if !broker.advance() {
            break;
        }
    }

    let trades = broker.closed_trades().to_vec();
    let metrics = PerformanceMetrics::compute(&equity_curve, &trades);
    info!(
        policy = policy.name(),
        rows = equity_curve.len(),
        trades = trades.len(),
        final_assets = broker.assets(),
        total_return = metrics.total_return,
        "episode finished"
    );

    Ok(EpisodeResult {
        policy: policy.name().to_string(),
        trades,
        equity_curve,
        actions,
        initial_assets: broker.initial_assets(),
        final_assets: broker.assets(),
        metrics,
    })
}

/// Translate an action into at most one order at the current close.
///
/// Buy while short closes the short; Buy while flat opens a long if one more
/// unit is affordable. Sell mirrors this. Actions matching the current side
/// are ignored.
fn apply_action(broker: &mut Broker, action: Action, trade_size: f64) -> Result<(), BrokerError> {
    let price = broker.current_price();
    let size = broker.position().size();
    let affordable = broker.account_state().affordable;

    let order = match action {
        Action::Buy if size < 0.0 => Some(-size),
        Action::Buy if size == 0.0 && affordable => Some(trade_size),
        Action::Sell if size > 0.0 => Some(-size),
        Action::Sell if size == 0.0 && affordable => Some(-trade_size),
        _ => None,
    };

    if let Some(order_size) = order {
        let outcome = broker.new_order(order_size, price)?;
        debug!(step = broker.current_step(), ?action, ?outcome, "order filled");
    }
    Ok(())
}
