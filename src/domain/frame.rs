//! Date-indexed columnar time series store.
//!
//! A [`Frame`] holds an ascending, duplicate-free date index and any number of
//! named `f64` columns of the same length. Missing observations are `NaN`.
//! Frames from different sources are aligned with [`outer_join`], which takes
//! the union of the date indexes and fills the gaps with `NaN`.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("date index is not strictly ascending at position {position}")]
    UnsortedIndex { position: usize },

    #[error("column {column} has {found} values, index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl Frame {
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self, FrameError> {
        if let Some(position) = dates.windows(2).position(|w| w[0] >= w[1]) {
            return Err(FrameError::UnsortedIndex {
                position: position + 1,
            });
        }
        Ok(Self {
            dates,
            columns: Vec::new(),
        })
    }

    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, FrameError> {
        let mut frame = Self::new(dates)?;
        for (name, values) in columns {
            frame.push_column(name, values)?;
        }
        Ok(frame)
    }

    pub fn push_column(&mut self, name: String, values: Vec<f64>) -> Result<(), FrameError> {
        if values.len() != self.dates.len() {
            return Err(FrameError::LengthMismatch {
                column: name,
                expected: self.dates.len(),
                found: values.len(),
            });
        }
        if self.columns.iter().any(|c| c.name == name) {
            return Err(FrameError::DuplicateColumn(name));
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// A frame with this frame's date index and no columns.
    pub fn empty_like(&self) -> Frame {
        Frame {
            dates: self.dates.clone(),
            columns: Vec::new(),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Keep only the named columns, in the order given. Unknown names are skipped.
    pub fn select(&self, names: &[String]) -> Frame {
        let columns = names
            .iter()
            .filter_map(|name| self.columns.iter().find(|c| &c.name == name).cloned())
            .collect();
        Frame {
            dates: self.dates.clone(),
            columns,
        }
    }

    /// Keep rows with `start <= date <= end`. Open bounds are unbounded.
    pub fn filter_dates(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Frame {
        let keep: Vec<usize> = self
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| start.is_none_or(|s| **d >= s) && end.is_none_or(|e| **d <= e))
            .map(|(i, _)| i)
            .collect();

        Frame {
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: keep.iter().map(|&i| c.values[i]).collect(),
                })
                .collect(),
        }
    }

    /// Re-express every column on `dates` (which must be ascending). Dates not
    /// present in this frame become `NaN`.
    pub fn reindex(&self, dates: &[NaiveDate]) -> Frame {
        let position: HashMap<NaiveDate, usize> = self
            .dates
            .iter()
            .enumerate()
            .map(|(i, d)| (*d, i))
            .collect();

        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: dates
                    .iter()
                    .map(|d| position.get(d).map_or(f64::NAN, |&i| c.values[i]))
                    .collect(),
            })
            .collect();

        Frame {
            dates: dates.to_vec(),
            columns,
        }
    }

    /// Apply `f` to every column, keeping names and the date index.
    pub fn map_columns<F>(&self, f: F) -> Frame
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        Frame {
            dates: self.dates.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: f(&c.values),
                })
                .collect(),
        }
    }

    /// Row-wise sum over columns, skipping `NaN`. A row with no finite value is `NaN`.
    pub fn row_sum(&self) -> Vec<f64> {
        (0..self.dates.len())
            .map(|i| {
                let mut present = false;
                let mut sum = 0.0;
                for c in &self.columns {
                    let v = c.values[i];
                    if !v.is_nan() {
                        present = true;
                        sum += v;
                    }
                }
                if present { sum } else { f64::NAN }
            })
            .collect()
    }

    /// First and last date with a non-`NaN` value in column `name`, plus the
    /// number of observations.
    pub fn observed_range(&self, name: &str) -> Option<(NaiveDate, NaiveDate, usize)> {
        let values = self.column(name)?;
        let first = values.iter().position(|v| !v.is_nan())?;
        let last = values.iter().rposition(|v| !v.is_nan())?;
        let count = values.iter().filter(|v| !v.is_nan()).count();
        Some((self.dates[first], self.dates[last], count))
    }
}

/// Union of all date indexes, ascending.
pub fn union_index(frames: &[&Frame]) -> Vec<NaiveDate> {
    let unique: BTreeSet<NaiveDate> = frames
        .iter()
        .flat_map(|f| f.dates.iter().copied())
        .collect();
    unique.into_iter().collect()
}

/// Outer join by date. Column names must be unique across the inputs.
pub fn outer_join(frames: &[&Frame]) -> Result<Frame, FrameError> {
    let dates = union_index(frames);
    let mut seen = HashSet::new();
    let mut joined = Frame {
        dates: dates.clone(),
        columns: Vec::new(),
    };

    for frame in frames {
        for column in frame.reindex(&dates).columns {
            if !seen.insert(column.name.clone()) {
                return Err(FrameError::DuplicateColumn(column.name));
            }
            joined.columns.push(column);
        }
    }

    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample() -> Frame {
        Frame::from_columns(
            vec![d(1), d(2), d(3)],
            vec![
                ("SPY".into(), vec![100.0, 101.0, 102.0]),
                ("GLD".into(), vec![f64::NAN, 50.0, 51.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_unsorted_index() {
        let err = Frame::new(vec![d(2), d(1)]).unwrap_err();
        assert_eq!(err, FrameError::UnsortedIndex { position: 1 });
    }

    #[test]
    fn new_rejects_duplicate_dates() {
        assert!(Frame::new(vec![d(1), d(1)]).is_err());
    }

    #[test]
    fn push_column_checks_length_and_name() {
        let mut frame = sample();
        assert!(matches!(
            frame.push_column("X".into(), vec![1.0]),
            Err(FrameError::LengthMismatch { expected: 3, found: 1, .. })
        ));
        assert_eq!(
            frame.push_column("SPY".into(), vec![0.0; 3]),
            Err(FrameError::DuplicateColumn("SPY".into()))
        );
    }

    #[test]
    fn select_keeps_requested_order() {
        let frame = sample().select(&["GLD".into(), "MISSING".into(), "SPY".into()]);
        assert_eq!(frame.column_names(), vec!["GLD", "SPY"]);
    }

    #[test]
    fn filter_dates_is_inclusive() {
        let frame = sample().filter_dates(Some(d(2)), Some(d(3)));
        assert_eq!(frame.dates(), &[d(2), d(3)]);
        assert_eq!(frame.column("SPY").unwrap(), &[101.0, 102.0]);

        let open = sample().filter_dates(None, Some(d(1)));
        assert_eq!(open.len(), 1);
    }

    #[test]
    fn outer_join_fills_missing_with_nan() {
        let a = Frame::from_columns(vec![d(1), d(3)], vec![("A".into(), vec![1.0, 3.0])]).unwrap();
        let b = Frame::from_columns(vec![d(2), d(3)], vec![("B".into(), vec![20.0, 30.0])]).unwrap();

        let joined = outer_join(&[&a, &b]).unwrap();

        assert_eq!(joined.dates(), &[d(1), d(2), d(3)]);
        let a_col = joined.column("A").unwrap();
        assert_eq!(a_col[0], 1.0);
        assert!(a_col[1].is_nan());
        assert_eq!(a_col[2], 3.0);
        let b_col = joined.column("B").unwrap();
        assert!(b_col[0].is_nan());
        assert_eq!(b_col[2], 30.0);
    }

    #[test]
    fn outer_join_rejects_column_collision() {
        let a = sample();
        let b = sample();
        assert!(matches!(
            outer_join(&[&a, &b]),
            Err(FrameError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn row_sum_skips_nan_and_keeps_empty_rows_nan() {
        let frame = Frame::from_columns(
            vec![d(1), d(2)],
            vec![
                ("A".into(), vec![f64::NAN, 1.0]),
                ("B".into(), vec![f64::NAN, 2.0]),
            ],
        )
        .unwrap();
        let sums = frame.row_sum();
        assert!(sums[0].is_nan());
        assert_eq!(sums[1], 3.0);
    }

    #[test]
    fn observed_range_ignores_leading_nan() {
        let frame = sample();
        assert_eq!(frame.observed_range("GLD"), Some((d(2), d(3), 2)));
        assert_eq!(frame.observed_range("NOPE"), None);
    }
}
