//! Property tests for the runner.
//!
//! 1. Blocked folds tile the series without overlap, train before eval
//! 2. Episodes over random data always end flat with a consistent ledger
//! 3. Drawdown stays within [-1, 0] for positive equity curves

use proptest::prelude::*;
use tradesim_core::Broker;
use tradesim_runner::metrics::max_drawdown;
use tradesim_runner::{
    create_blocked_folds, run_episode, synthetic_series, CrossValidationConfig, EpisodeConfig,
    PolicyConfig,
};

proptest! {
    #[test]
    fn folds_tile_the_series(
        total in 100usize..5_000,
        n_splits in 1usize..10,
        train_fraction in 0.1..0.9_f64,
    ) {
        let cfg = CrossValidationConfig { n_splits, train_fraction, min_fold_rows: 10 };
        let folds = create_blocked_folds(total, &cfg).unwrap();

        prop_assert_eq!(folds.len(), n_splits);
        prop_assert_eq!(folds[0].train_start, 0);
        prop_assert_eq!(folds[n_splits - 1].eval_end, total);
        for w in folds.windows(2) {
            prop_assert_eq!(w[0].eval_end, w[1].train_start);
        }
        for f in &folds {
            prop_assert!(f.train_start < f.train_end);
            prop_assert_eq!(f.train_end, f.eval_start);
            prop_assert!(f.eval_start < f.eval_end);
        }
    }

    #[test]
    fn episodes_end_flat_with_consistent_ledger(
        rows in 10usize..200,
        data_seed in any::<u64>(),
        policy_seed in any::<u64>(),
        window_size in 0usize..8,
    ) {
        let series = synthetic_series(rows, 100.0, data_seed).unwrap();
        let mut broker = Broker::new(series, 10_000.0, 0.001).unwrap();
        let mut policy = PolicyConfig::Random { seed: policy_seed }.build().unwrap();
        let cfg = EpisodeConfig { window_size, trade_size: 1.0 };

        let result = run_episode(&mut broker, policy.as_mut(), &cfg).unwrap();

        prop_assert!(broker.position().is_flat());
        prop_assert_eq!(result.equity_curve.len(), rows);
        let realized: f64 = result.trades.iter().map(|t| t.pnl).sum();
        prop_assert!((result.final_assets - (10_000.0 + realized)).abs() < 1e-6);
        prop_assert_eq!(result.metrics.trade_count, result.trades.len());
        for pair in result.trades.windows(2) {
            prop_assert!(pair[0].exit_time <= pair[1].entry_time);
        }
    }

    #[test]
    fn drawdown_is_bounded(curve in prop::collection::vec(1.0..1_000.0_f64, 1..100)) {
        let dd = max_drawdown(&curve);
        prop_assert!(dd <= 0.0);
        prop_assert!(dd > -1.0);
    }
}
