//! Blocked cross-validation over time-ordered data.
//!
//! Splits the series into `n_splits` contiguous, non-overlapping blocks. Each
//! block is divided into a train head and an eval tail, so no fold ever sees
//! data from another fold and eval rows always come after train rows.
//!
//! Every fold segment gets its own `Broker` over its own slice of the series;
//! segments run in parallel with rayon and share nothing.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use tradesim_core::{Broker, BrokerError, PriceSeries};

use crate::config::BrokerConfig;
use crate::episode::{run_episode, EpisodeConfig, EpisodeError, EpisodeResult};
use crate::metrics::PerformanceMetrics;
use crate::policy::{PolicyConfig, PolicyError};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossValidationConfig {
    /// Number of blocks (default 5).
    pub n_splits: usize,
    /// Fraction of each block used for training, in (0, 1).
    pub train_fraction: f64,
    /// Minimum rows per block.
    pub min_fold_rows: usize,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            train_fraction: 0.8,
            min_fold_rows: 50,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Row ranges of one fold. All ranges are `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSpec {
    pub fold_index: usize,
    pub train_start: usize,
    pub train_end: usize,
    pub eval_start: usize,
    pub eval_end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldResult {
    pub spec: FoldSpec,
    pub train: EpisodeResult,
    pub eval: EpisodeResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossValidationResult {
    pub folds: Vec<FoldResult>,
    pub mean_train: PerformanceMetrics,
    pub mean_eval: PerformanceMetrics,
}

#[derive(Debug, Error)]
pub enum CrossValidationError {
    #[error("invalid cross-validation config: {0}")]
    InvalidConfig(String),

    #[error("insufficient data: {total_rows} rows cannot hold {n_splits} folds of at least {min_rows} rows")]
    InsufficientData {
        total_rows: usize,
        n_splits: usize,
        min_rows: usize,
    },

    #[error("fold {fold} ({segment}): {source}")]
    Episode {
        fold: usize,
        segment: &'static str,
        #[source]
        source: EpisodeError,
    },

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

// ─── Fold creation ───────────────────────────────────────────────────

/// Create blocked folds over `total_rows`.
///
/// Blocks have `total_rows / n_splits` rows; the last block absorbs the
/// remainder. Train takes `floor(block_len * train_fraction)` rows of each
/// block and eval the rest.
pub fn create_blocked_folds(
    total_rows: usize,
    config: &CrossValidationConfig,
) -> Result<Vec<FoldSpec>, CrossValidationError> {
    let n = config.n_splits;
    if n == 0 {
        return Err(CrossValidationError::InvalidConfig(
            "n_splits must be at least 1".into(),
        ));
    }
    if !(config.train_fraction > 0.0 && config.train_fraction < 1.0) {
        return Err(CrossValidationError::InvalidConfig(format!(
            "train_fraction must be in (0, 1), got {}",
            config.train_fraction
        )));
    }

    let insufficient = || CrossValidationError::InsufficientData {
        total_rows,
        n_splits: n,
        min_rows: config.min_fold_rows.max(2),
    };

    let block = total_rows / n;
    if block < config.min_fold_rows.max(2) {
        return Err(insufficient());
    }

    let mut folds = Vec::with_capacity(n);
    for i in 0..n {
        let start = i * block;
        let end = if i + 1 == n { total_rows } else { start + block };
        let len = end - start;
        let train_len = (len as f64 * config.train_fraction).floor() as usize;
        if train_len == 0 || train_len == len {
            return Err(insufficient());
        }
        folds.push(FoldSpec {
            fold_index: i,
            train_start: start,
            train_end: start + train_len,
            eval_start: start + train_len,
            eval_end: end,
        });
    }
    Ok(folds)
}

// ─── Orchestration ───────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn run_segment(
    series: &PriceSeries,
    start: usize,
    end: usize,
    fold: usize,
    segment: &'static str,
    broker_cfg: &BrokerConfig,
    episode_cfg: &EpisodeConfig,
    policy_cfg: &PolicyConfig,
) -> Result<EpisodeResult, CrossValidationError> {
    let data = series.slice(start, end).map_err(BrokerError::from)?;
    let mut broker = Broker::new(data, broker_cfg.initial_assets, broker_cfg.fee)?;
    let mut policy = policy_cfg.build_for(fold, segment)?;
    run_episode(&mut broker, policy.as_mut(), episode_cfg).map_err(|source| {
        CrossValidationError::Episode {
            fold,
            segment,
            source,
        }
    })
}

/// Run train and eval episodes for every fold and average their metrics.
pub fn run_cross_validation(
    series: &PriceSeries,
    broker_cfg: &BrokerConfig,
    episode_cfg: &EpisodeConfig,
    policy_cfg: &PolicyConfig,
    cv_cfg: &CrossValidationConfig,
) -> Result<CrossValidationResult, CrossValidationError> {
    let specs = create_blocked_folds(series.len(), cv_cfg)?;
    for spec in &specs {
        if spec.eval_end - spec.eval_start <= episode_cfg.window_size {
            warn!(
                fold = spec.fold_index,
                window_size = episode_cfg.window_size,
                "eval segment is not longer than the observation window; the policy will never act"
            );
        }
    }

    let folds = specs
        .par_iter()
        .map(|spec| {
            let run = |start, end, segment| {
                run_segment(
                    series,
                    start,
                    end,
                    spec.fold_index,
                    segment,
                    broker_cfg,
                    episode_cfg,
                    policy_cfg,
                )
            };
            let train = run(spec.train_start, spec.train_end, "train")?;
            let eval = run(spec.eval_start, spec.eval_end, "eval")?;
            Ok(FoldResult {
                spec: *spec,
                train,
                eval,
            })
        })
        .collect::<Result<Vec<_>, CrossValidationError>>()?;

    let mut mean_train = PerformanceMetrics::default();
    let mut mean_eval = PerformanceMetrics::default();
    for (n, fold) in folds.iter().enumerate() {
        mean_train = mean_train.running_mean(n, &fold.train.metrics);
        mean_eval = mean_eval.running_mean(n, &fold.eval.metrics);
    }

    info!(
        folds = folds.len(),
        mean_train_return = mean_train.total_return,
        mean_eval_return = mean_eval.total_return,
        "cross-validation finished"
    );

    Ok(CrossValidationResult {
        folds,
        mean_train,
        mean_eval,
    })
}
