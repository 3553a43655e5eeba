//! Decision policies driving the stepping loop.
//!
//! A policy sees an [`Observation`] (recent candles plus the broker's account
//! state) and answers with an [`Action`]. Learned agents live outside this
//! crate; the built-ins here are baselines and replay drivers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tradesim_core::{AccountState, Candles};

/// Discrete trading action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Hold,
    Buy,
    Sell,
}

/// Everything a policy may look at for one step.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub step: usize,
    /// Rows ending at (and including) the current step.
    pub window: Candles<'a>,
    /// Column holding the close price inside `window`.
    pub close_col: usize,
    pub account: AccountState,
    pub position_size: f64,
}

impl Observation<'_> {
    pub fn closes(&self) -> Vec<f64> {
        self.window.column(self.close_col)
    }
}

pub trait Policy: Send {
    fn name(&self) -> &str;

    fn act(&mut self, obs: &Observation<'_>) -> Action;

    /// Clear per-episode state.
    fn reset(&mut self) {}
}

// ─── Built-in policies ───────────────────────────────────────────────

/// Never trades.
#[derive(Debug, Clone, Default)]
pub struct AlwaysHold;

impl Policy for AlwaysHold {
    fn name(&self) -> &str {
        "always_hold"
    }

    fn act(&mut self, _obs: &Observation<'_>) -> Action {
        Action::Hold
    }
}

/// Buy while the fast SMA of close is above the slow SMA, sell while below.
#[derive(Debug, Clone)]
pub struct MaCrossover {
    fast: usize,
    slow: usize,
    name: String,
}

impl MaCrossover {
    pub fn new(fast: usize, slow: usize) -> Result<Self, PolicyError> {
        if fast == 0 || slow <= fast {
            return Err(PolicyError::InvalidPeriods { fast, slow });
        }
        Ok(Self {
            fast,
            slow,
            name: format!("ma_crossover_{fast}_{slow}"),
        })
    }

    /// Observation window needed before the policy can act.
    pub fn lookback(&self) -> usize {
        self.slow
    }
}

fn tail_mean(values: &[f64], n: usize) -> f64 {
    let tail = &values[values.len() - n..];
    tail.iter().sum::<f64>() / n as f64
}

impl Policy for MaCrossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&mut self, obs: &Observation<'_>) -> Action {
        let closes = obs.closes();
        if closes.len() < self.slow {
            return Action::Hold;
        }
        let fast = tail_mean(&closes, self.fast);
        let slow = tail_mean(&closes, self.slow);
        if fast > slow {
            Action::Buy
        } else if fast < slow {
            Action::Sell
        } else {
            Action::Hold
        }
    }
}

/// Uniformly random actions from a seeded RNG; deterministic per seed.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    seed: u64,
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &str {
        "random"
    }

    fn act(&mut self, _obs: &Observation<'_>) -> Action {
        match self.rng.gen_range(0..3) {
            0 => Action::Hold,
            1 => Action::Buy,
            _ => Action::Sell,
        }
    }

    fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("invalid moving-average periods: fast={fast}, slow={slow} (need 0 < fast < slow)")]
    InvalidPeriods { fast: usize, slow: usize },
}

/// Serializable policy selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyConfig {
    AlwaysHold,
    MaCrossover { fast: usize, slow: usize },
    Random { seed: u64 },
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig::MaCrossover { fast: 5, slow: 20 }
    }
}

impl PolicyConfig {
    pub fn build(&self) -> Result<Box<dyn Policy>, PolicyError> {
        Ok(match self {
            PolicyConfig::AlwaysHold => Box::new(AlwaysHold),
            PolicyConfig::MaCrossover { fast, slow } => Box::new(MaCrossover::new(*fast, *slow)?),
            PolicyConfig::Random { seed } => Box::new(RandomPolicy::new(*seed)),
        })
    }

    /// Rows of history the policy needs in its observation window.
    pub fn lookback(&self) -> Result<usize, PolicyError> {
        Ok(match self {
            PolicyConfig::MaCrossover { fast, slow } => MaCrossover::new(*fast, *slow)?.lookback(),
            PolicyConfig::AlwaysHold | PolicyConfig::Random { .. } => 0,
        })
    }

    /// Build an independent instance for one fold segment.
    ///
    /// Random policies get a sub-seed derived from `(seed, fold, segment)` so
    /// results do not depend on the order folds are scheduled in.
    pub fn build_for(&self, fold: usize, segment: &str) -> Result<Box<dyn Policy>, PolicyError> {
        match self {
            PolicyConfig::Random { seed } => {
                Ok(Box::new(RandomPolicy::new(sub_seed(*seed, fold, segment))))
            }
            other => other.build(),
        }
    }
}

/// BLAKE3-derived sub-seed for a fold segment.
pub fn sub_seed(master: u64, fold: usize, segment: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master.to_le_bytes());
    hasher.update(&(fold as u64).to_le_bytes());
    hasher.update(segment.as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tradesim_core::PriceSeries;

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

    fn obs(s: &PriceSeries) -> Observation<'_> {
        Observation {
            step: s.len() - 1,
            window: s.candles(0, s.len()).unwrap(),
            close_col: 0,
            account: AccountState {
                affordable: true,
                pnl_pct: 0.0,
            },
            position_size: 0.0,
        }
    }

    #[test]
    fn ma_crossover_follows_trend() {
        let mut p = MaCrossover::new(2, 4).unwrap();
        let up = series(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(p.act(&obs(&up)), Action::Buy);
        let down = series(&[4.0, 3.0, 2.0, 1.0]);
        assert_eq!(p.act(&obs(&down)), Action::Sell);
        let flat = series(&[2.0, 2.0, 2.0, 2.0]);
        assert_eq!(p.act(&obs(&flat)), Action::Hold);
    }

    #[test]
    fn ma_crossover_holds_on_short_window() {
        let mut p = MaCrossover::new(2, 4).unwrap();
        assert_eq!(p.act(&obs(&series(&[1.0, 2.0]))), Action::Hold);
    }

    #[test]
    fn ma_crossover_rejects_bad_periods() {
        assert_eq!(
            MaCrossover::new(5, 5).unwrap_err(),
            PolicyError::InvalidPeriods { fast: 5, slow: 5 }
        );
        assert!(MaCrossover::new(0, 3).is_err());
    }

    #[test]
    fn random_policy_is_deterministic_after_reset() {
        let s = series(&[1.0]);
        let mut p = RandomPolicy::new(7);
        let first: Vec<Action> = (0..20).map(|_| p.act(&obs(&s))).collect();
        p.reset();
        let second: Vec<Action> = (0..20).map(|_| p.act(&obs(&s))).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn sub_seeds_differ_by_fold_and_segment() {
        assert_eq!(sub_seed(1, 0, "train"), sub_seed(1, 0, "train"));
        assert_ne!(sub_seed(1, 0, "train"), sub_seed(1, 1, "train"));
        assert_ne!(sub_seed(1, 0, "train"), sub_seed(1, 0, "eval"));
    }

    #[test]
    fn policy_config_from_toml() {
        let cfg: PolicyConfig = toml::from_str("type = \"ma_crossover\"\nfast = 3\nslow = 9").unwrap();
        assert_eq!(cfg, PolicyConfig::MaCrossover { fast: 3, slow: 9 });
        assert_eq!(cfg.build().unwrap().name(), "ma_crossover_3_9");
    }
}
