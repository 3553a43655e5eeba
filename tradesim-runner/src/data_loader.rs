//! Price data loading for the runner.
//!
//! Two sources:
//! 1. CSV files: first column is the timestamp, remaining columns numeric,
//!    one of them named `Close`
//! 2. Synthetic data: a seeded geometric random walk, for demos and tests
//!
//! Synthetic data is a developer-only mode; callers tag results produced from it.

use chrono::{NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use thiserror::Error;
use tracing::info;
use tradesim_core::{PriceSeries, SeriesError};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no columns besides the timestamp")]
    NoColumns { path: String },

    #[error("{path}, line {line}: cannot parse timestamp '{value}'")]
    Timestamp {
        path: String,
        line: usize,
        value: String,
    },

    #[error("{path}, line {line}: cannot parse '{value}' in column {column}")]
    Value {
        path: String,
        line: usize,
        column: String,
        value: String,
    },

    #[error("invalid series in {path}: {source}")]
    Series {
        path: String,
        #[source]
        source: SeriesError,
    },
}

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a timestamp in one of the accepted layouts; date-only values map to midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Load a timestamp-indexed CSV file into a [`PriceSeries`].
///
/// Empty numeric cells are read as NaN, except in the Close column, where
/// they are rejected.
pub fn load_csv(path: &Path) -> Result<PriceSeries, LoadError> {
    let shown = path.display().to_string();
    let csv_err = |source| LoadError::Csv {
        path: shown.clone(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let columns: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();
    if columns.is_empty() {
        return Err(LoadError::NoColumns {
            path: shown.clone(),
        });
    }

    let mut index = Vec::new();
    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        // Header is line 1.
        let line = i + 2;
        let raw_ts = record.get(0).unwrap_or_default();
        let ts = parse_timestamp(raw_ts).ok_or_else(|| LoadError::Timestamp {
            path: shown.clone(),
            line,
            value: raw_ts.to_string(),
        })?;

        let mut row = Vec::with_capacity(columns.len());
        for (col, raw) in columns.iter().zip(record.iter().skip(1)) {
            let raw = raw.trim();
            let value = if raw.is_empty() {
                f64::NAN
            } else {
                raw.parse::<f64>().map_err(|_| LoadError::Value {
                    path: shown.clone(),
                    line,
                    column: col.clone(),
                    value: raw.to_string(),
                })?
            };
            row.push(value);
        }
        index.push(ts);
        rows.push(row);
    }

    let series = PriceSeries::new(index, columns, rows).map_err(|source| LoadError::Series {
        path: shown.clone(),
        source,
    })?;
    info!(path = %shown, rows = series.len(), columns = series.width(), "loaded price series");
    Ok(series)
}

/// Seeded geometric random walk with OHLCV columns, one row per day.
///
/// Returns an error only when `rows == 0`.
pub fn synthetic_series(rows: usize, start_price: f64, seed: u64) -> Result<PriceSeries, SeriesError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let base = NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    let mut index = Vec::with_capacity(rows);
    let mut data = Vec::with_capacity(rows);
    let mut close = start_price;
    for i in 0..rows {
        let open = close;
        let ret: f64 = rng.gen_range(-0.02..0.02);
        close = (open * (1.0 + ret)).max(0.01);
        let wick: f64 = rng.gen_range(0.0..0.01);
        let high = open.max(close) * (1.0 + wick);
        let low = open.min(close) * (1.0 - wick);
        let volume = rng.gen_range(1_000.0..10_000.0_f64).round();
        index.push(base + chrono::Duration::days(i as i64));
        data.push(vec![open, high, low, close, volume]);
    }

    let columns = ["Open", "High", "Low", "Close", "Volume"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    PriceSeries::new(index, columns, data)
}
