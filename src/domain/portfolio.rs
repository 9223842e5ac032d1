//! Portfolio return aggregation.
//!
//! Portfolio return at t is the sum over instruments of return * weight, on
//! the outer join of the return and weight indexes. Missing terms follow one
//! rule:
//!
//! - before an instrument's first finite return it is not part of the sum;
//! - from then on a `NaN` return or weight contributes zero;
//! - a date on which no instrument has started is `NaN`.

use super::frame::{union_index, Frame, FrameError};

pub const PORTFOLIO_COLUMN: &str = "portfolio";

/// Aggregate per-instrument `returns` with `weights` into a one-column frame
/// named [`PORTFOLIO_COLUMN`]. Instruments are taken from `returns`; an
/// instrument with no weight column is treated as having `NaN` weight.
pub fn aggregate_returns(returns: &Frame, weights: &Frame) -> Result<Frame, FrameError> {
    let dates = union_index(&[returns, weights]);
    let returns = returns.reindex(&dates);
    let weights = weights.reindex(&dates);

    let mut total = vec![f64::NAN; dates.len()];

    for column in returns.columns() {
        let Some(start) = column.values.iter().position(|r| r.is_finite()) else {
            continue;
        };
        let weight = weights.column(&column.name);

        for (i, slot) in total.iter_mut().enumerate().skip(start) {
            let r = column.values[i];
            let w = weight.map_or(f64::NAN, |ws| ws[i]);
            let term = if r.is_nan() || w.is_nan() { 0.0 } else { r * w };
            *slot = if slot.is_nan() { term } else { *slot + term };
        }
    }

    Frame::from_columns(dates, vec![(PORTFOLIO_COLUMN.to_string(), total)])
}
