//! Error types for the accounting core.
//!
//! Every variant is a precondition violation raised by the caller's decision
//! logic or by malformed input data. None of them is retryable: a failed call
//! leaves the broker exactly as it was before the call.

use thiserror::Error;

/// Errors building or slicing a [`PriceSeries`](crate::domain::PriceSeries).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("price series is empty")]
    Empty,

    #[error("price series has no Close column")]
    MissingClose,

    #[error("index has {index} timestamps but {rows} rows were supplied")]
    IndexLength { index: usize, rows: usize },

    #[error("row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row} has a missing or non-finite {column} value")]
    NonFiniteClose { row: usize, column: String },

    #[error("timestamps must be strictly increasing (row {row})")]
    NotIncreasing { row: usize },

    #[error("row range [{start}, {end}) is outside a series of {len} rows")]
    Range { start: usize, end: usize, len: usize },
}

/// Errors from position and broker operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrokerError {
    #[error("cannot close: position is flat")]
    PositionFlat,

    #[error("cannot open: position already holds {held}")]
    PositionNotFlat { held: f64 },

    #[error("cannot open a position of size zero")]
    ZeroSize,

    #[error("order of {requested} does not offset open position of {held}")]
    NonOffsettingOrder { held: f64, requested: f64 },

    #[error("step {step} is out of range for {len} rows")]
    StepOutOfRange { step: usize, len: usize },

    #[error("fee must be a finite non-negative fraction, got {0}")]
    InvalidFee(f64),

    #[error("starting assets must be finite, got {0}")]
    InvalidAssets(f64),

    #[error(transparent)]
    Series(#[from] SeriesError),
}
