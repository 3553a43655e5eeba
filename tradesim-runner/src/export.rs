//! Artifact export: trade ledger (CSV/JSON), equity curve (CSV), run manifest (JSON).

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use tradesim_core::TradeRecord;

use crate::config::SimConfig;
use crate::episode::EpisodeResult;
use crate::metrics::PerformanceMetrics;

/// Summary written next to the artifacts of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub policy: String,
    pub rows: usize,
    /// Data came from the synthetic generator, not a real file.
    pub synthetic: bool,
    pub config: SimConfig,
    pub metrics: PerformanceMetrics,
}

/// Closed-trade ledger as CSV, one row per trade, columns in ledger order.
pub fn write_trades_csv(path: &Path, trades: &[TradeRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create trades CSV {}", path.display()))?;
    if trades.is_empty() {
        writer.write_record(["size", "entry_price", "exit_price", "PnL", "entry_time", "exit_time"])?;
    }
    for trade in trades {
        writer
            .serialize(trade)
            .with_context(|| format!("Failed to write trade to {}", path.display()))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_trades_json(path: &Path, trades: &[TradeRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(trades).context("Failed to serialize trades")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write trades JSON {}", path.display()))?;
    Ok(())
}

/// Equity curve as `timestamp,equity` rows.
pub fn write_equity_csv(path: &Path, index: &[NaiveDateTime], equity: &[f64]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create equity CSV {}", path.display()))?;
    writer.write_record(["timestamp", "equity"])?;
    for (ts, eq) in index.iter().zip(equity) {
        writer.write_record([ts.to_string(), format!("{eq:.4}")])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    let json =
        serde_json::to_string_pretty(manifest).context("Failed to serialize run manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
    Ok(())
}

/// Write all replay artifacts into `<output_dir>/<short run id>/`.
///
/// Returns the directory written to.
pub fn save_replay_artifacts(
    output_dir: &Path,
    config: &SimConfig,
    index: &[NaiveDateTime],
    result: &EpisodeResult,
    synthetic: bool,
) -> Result<PathBuf> {
    let dir = output_dir.join(config.short_run_id());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    write_trades_csv(&dir.join("trades.csv"), &result.trades)?;
    write_trades_json(&dir.join("trades.json"), &result.trades)?;
    write_equity_csv(&dir.join("equity.csv"), index, &result.equity_curve)?;
    write_manifest(
        &dir.join("manifest.json"),
        &RunManifest {
            run_id: config.run_id(),
            created_at: chrono::Utc::now(),
            policy: result.policy.clone(),
            rows: result.equity_curve.len(),
            synthetic,
            config: config.clone(),
            metrics: result.metrics.clone(),
        },
    )?;

    info!(dir = %dir.display(), trades = result.trades.len(), "artifacts written");
    Ok(dir)
}
