//! Serializable simulation configuration.
//!
//! A config file is TOML with four optional sections:
//!
//! ```toml
//! [broker]
//! initial_assets = 10000.0
//! fee = 0.001
//!
//! [episode]
//! window_size = 20
//! trade_size = 1.0
//!
//! [policy]
//! type = "ma_crossover"
//! fast = 5
//! slow = 20
//!
//! [cross_validation]
//! n_splits = 5
//! train_fraction = 0.8
//! min_fold_rows = 50
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::cross_validation::CrossValidationConfig;
use crate::episode::EpisodeConfig;
use crate::policy::PolicyConfig;

/// Unique identifier for a run (content hash of the config).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Starting cash and proportional fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub initial_assets: f64,
    pub fee: f64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            initial_assets: 10_000.0,
            fee: 0.001,
        }
    }
}

/// Everything needed to reproduce a replay or cross-validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub broker: BrokerConfig,
    pub episode: EpisodeConfig,
    pub policy: PolicyConfig,
    pub cross_validation: CrossValidationConfig,
}

impl SimConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject values the broker or the stepping loop would refuse later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.broker;
        if !b.initial_assets.is_finite() || b.initial_assets <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "broker.initial_assets must be positive, got {}",
                b.initial_assets
            )));
        }
        if !b.fee.is_finite() || !(0.0..1.0).contains(&b.fee) {
            return Err(ConfigError::Invalid(format!(
                "broker.fee must be in [0, 1), got {}",
                b.fee
            )));
        }
        if !self.episode.trade_size.is_finite() || self.episode.trade_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "episode.trade_size must be positive, got {}",
                self.episode.trade_size
            )));
        }
        let lookback = self
            .policy
            .lookback()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.episode.window_size < lookback {
            return Err(ConfigError::Invalid(format!(
                "episode.window_size ({}) is shorter than the policy lookback ({lookback})",
                self.episode.window_size
            )));
        }
        Ok(())
    }

    /// Deterministic BLAKE3 hash of the config.
    ///
    /// Identical configs share a RunId, which names the output directory.
    pub fn run_id(&self) -> RunId {
        // Serializing plain data structs to JSON cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// First 12 hex characters of the run id.
    pub fn short_run_id(&self) -> String {
        self.run_id()[..12].to_string()
    }
}
