//! PriceSeries — the time-indexed table a broker steps through.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::SeriesError;

/// Name of the column every series must carry (matched case-insensitively).
pub const CLOSE_COLUMN: &str = "Close";

/// Timestamp-indexed numeric table, stored row-major.
///
/// Each row holds one value per column. The broker treats the series as
/// read-only for the lifetime of a simulation; replicas for parallel runs
/// are produced with [`PriceSeries::slice`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    index: Vec<NaiveDateTime>,
    columns: Vec<String>,
    values: Vec<f64>,
    close_col: usize,
}

impl PriceSeries {
    /// Build a series from timestamps, column names and one row per timestamp.
    pub fn new(
        index: Vec<NaiveDateTime>,
        columns: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, SeriesError> {
        if index.is_empty() {
            return Err(SeriesError::Empty);
        }
        if index.len() != rows.len() {
            return Err(SeriesError::IndexLength {
                index: index.len(),
                rows: rows.len(),
            });
        }
        let close_col = columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(CLOSE_COLUMN))
            .ok_or(SeriesError::MissingClose)?;

        if let Some(w) = index.windows(2).position(|w| w[0] >= w[1]) {
            return Err(SeriesError::NotIncreasing { row: w + 1 });
        }

        let width = columns.len();
        let mut values = Vec::with_capacity(width * rows.len());
        for (row, r) in rows.into_iter().enumerate() {
            if r.len() != width {
                return Err(SeriesError::RowWidth {
                    row,
                    expected: width,
                    found: r.len(),
                });
            }
            if !r[close_col].is_finite() {
                return Err(SeriesError::NonFiniteClose {
                    row,
                    column: columns[close_col].clone(),
                });
            }
            values.extend(r);
        }

        Ok(Self {
            index,
            columns,
            values,
            close_col,
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    /// Position of a column by name (case-insensitive).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Numeric values of row `i`. Panics if `i` is out of range.
    pub fn row(&self, i: usize) -> &[f64] {
        let w = self.width();
        &self.values[i * w..(i + 1) * w]
    }

    /// Position of the Close column within each row.
    pub fn close_column(&self) -> usize {
        self.close_col
    }

    pub fn close(&self, i: usize) -> f64 {
        self.row(i)[self.close_col]
    }

    pub fn timestamp(&self, i: usize) -> NaiveDateTime {
        self.index[i]
    }

    /// All close prices in order.
    pub fn closes(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.close(i)).collect()
    }

    /// Read-only view of rows `[start, end)`.
    pub fn candles(&self, start: usize, end: usize) -> Result<Candles<'_>, SeriesError> {
        if start > end || end > self.len() {
            return Err(SeriesError::Range {
                start,
                end,
                len: self.len(),
            });
        }
        let w = self.width();
        Ok(Candles {
            values: &self.values[start * w..end * w],
            width: w,
        })
    }

    /// Owned copy of rows `[start, end)`, used to hand each fold its own replica.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self, SeriesError> {
        if start >= end || end > self.len() {
            return Err(SeriesError::Range {
                start,
                end,
                len: self.len(),
            });
        }
        let w = self.width();
        Ok(Self {
            index: self.index[start..end].to_vec(),
            columns: self.columns.clone(),
            values: self.values[start * w..end * w].to_vec(),
            close_col: self.close_col,
        })
    }
}

/// Borrowed row-major window over a [`PriceSeries`].
#[derive(Debug, Clone, Copy)]
pub struct Candles<'a> {
    values: &'a [f64],
    width: usize,
}

impl<'a> Candles<'a> {
    pub fn len(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.values.len() / self.width
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// The flat row-major values.
    pub fn as_slice(&self) -> &'a [f64] {
        self.values
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a [f64]> + 'a {
        self.values.chunks_exact(self.width.max(1))
    }

    /// Values of one column across the window.
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.rows().map(|r| r[col]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample() -> PriceSeries {
        PriceSeries::new(
            vec![ts(1), ts(2), ts(3)],
            vec!["Open".into(), "close".into()],
            vec![vec![99.0, 100.0], vec![100.0, 101.0], vec![101.0, 102.0]],
        )
        .unwrap()
    }

    #[test]
    fn close_column_is_case_insensitive() {
        let s = sample();
        assert_eq!(s.close(1), 101.0);
        assert_eq!(s.column_index("CLOSE"), Some(1));
        assert_eq!(s.close_column(), 1);
    }

    #[test]
    fn candles_view_is_row_major() {
        let s = sample();
        let c = s.candles(1, 3).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c.as_slice(), &[100.0, 101.0, 101.0, 102.0]);
        assert_eq!(c.column(1), vec![101.0, 102.0]);
    }

    #[test]
    fn empty_candle_range_is_allowed() {
        let s = sample();
        assert!(s.candles(2, 2).unwrap().is_empty());
    }

    #[test]
    fn candles_out_of_range_rejected() {
        let s = sample();
        assert!(matches!(s.candles(0, 4), Err(SeriesError::Range { .. })));
        assert!(matches!(s.candles(2, 1), Err(SeriesError::Range { .. })));
    }

    #[test]
    fn missing_close_rejected() {
        let err = PriceSeries::new(vec![ts(1)], vec!["Open".into()], vec![vec![1.0]]);
        assert!(matches!(err, Err(SeriesError::MissingClose)));
    }

    #[test]
    fn unsorted_index_rejected() {
        let err = PriceSeries::new(
            vec![ts(2), ts(1)],
            vec!["Close".into()],
            vec![vec![1.0], vec![2.0]],
        );
        assert!(matches!(err, Err(SeriesError::NotIncreasing { row: 1 })));
    }

    #[test]
    fn non_finite_close_rejected() {
        let err = PriceSeries::new(
            vec![ts(1), ts(2), ts(3)],
            vec!["Open".into(), "close".into()],
            vec![vec![1.0, 1.0], vec![f64::NAN, 2.0], vec![3.0, f64::NAN]],
        );
        assert_eq!(
            err,
            Err(SeriesError::NonFiniteClose {
                row: 2,
                column: "close".into()
            })
        );

        // Gaps outside the Close column are kept.
        let s = PriceSeries::new(
            vec![ts(1), ts(2)],
            vec!["Open".into(), "Close".into()],
            vec![vec![f64::NAN, 1.0], vec![2.0, 2.0]],
        )
        .unwrap();
        assert!(s.row(0)[0].is_nan());
        assert!(PriceSeries::new(vec![ts(1)], vec!["Close".into()], vec![vec![f64::INFINITY]]).is_err());
    }

    #[test]
    fn ragged_rows_rejected() {
        let err = PriceSeries::new(
            vec![ts(1), ts(2)],
            vec!["Open".into(), "Close".into()],
            vec![vec![1.0, 2.0], vec![3.0]],
        );
        assert!(matches!(err, Err(SeriesError::RowWidth { row: 1, .. })));
    }

    #[test]
    fn slice_keeps_close_column() {
        let s = sample().slice(1, 3).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.close(0), 101.0);
        assert_eq!(s.timestamp(0), ts(2));
    }
}
