//! Tradesim Runner — drives the accounting core over real or synthetic data.
//!
//! This crate builds on `tradesim-core` to provide:
//! - The stepping loop (`episode`) that turns policy actions into orders
//! - Built-in baseline policies and a serializable policy selector
//! - Blocked cross-validation with independent broker replicas per fold
//! - Performance metrics over equity curves and trade ledgers
//! - CSV loading, synthetic data, TOML configuration and artifact export

pub mod config;
pub mod cross_validation;
pub mod data_loader;
pub mod episode;
pub mod export;
pub mod metrics;
pub mod policy;

pub use config::{BrokerConfig, ConfigError, RunId, SimConfig};
pub use cross_validation::{
    create_blocked_folds, run_cross_validation, CrossValidationConfig, CrossValidationError,
    CrossValidationResult, FoldResult, FoldSpec,
};
pub use data_loader::{load_csv, synthetic_series, LoadError};
pub use episode::{run_episode, ActionCounts, EpisodeConfig, EpisodeError, EpisodeResult};
pub use export::{save_replay_artifacts, RunManifest};
pub use metrics::PerformanceMetrics;
pub use policy::{Action, AlwaysHold, MaCrossover, Observation, Policy, PolicyConfig, RandomPolicy};
