//! Forward adjustment of continuous futures series.
//!
//! A backward-adjusted continuous series keeps the day-over-day moves across
//! contract rolls but shifts historical levels to today's contract. The
//! forward-adjusted series keeps the same absolute differences and anchors the
//! level at the true close of the earliest contract instead.
//!
//! Returns taken from the adjusted series use the adjusted price as the
//! denominator, not the price actually paid for the contract on that day.
//! This is a known bias relative to a manually rolled P&L and is kept as is.

use super::frame::{Frame, FrameError};
use std::collections::BTreeMap;

/// Forward-adjust one backward-adjusted column.
///
/// The value at the first observation equals `first_price`; every later
/// observation adds the backward series' difference to the previous
/// observation. Dates with no observation between the first and last one carry
/// the last value forward; dates outside that span stay `NaN`.
pub fn forward_adjust_series(backward: &[f64], first_price: f64) -> Vec<f64> {
    let mut adjusted = vec![f64::NAN; backward.len()];

    let Some(first) = backward.iter().position(|v| !v.is_nan()) else {
        return adjusted;
    };
    let Some(last) = backward.iter().rposition(|v| !v.is_nan()) else {
        return adjusted;
    };

    let mut level = first_price;
    let mut prev_observed = backward[first];
    adjusted[first] = level;

    for i in (first + 1)..=last {
        let price = backward[i];
        if !price.is_nan() {
            level += price - prev_observed;
            prev_observed = price;
        }
        adjusted[i] = level;
    }

    adjusted
}

/// Forward-adjust every column of `backward` that has a first price.
///
/// Columns without an entry in `first_prices` are dropped.
pub fn forward_adjust(
    backward: &Frame,
    first_prices: &BTreeMap<String, f64>,
) -> Result<Frame, FrameError> {
    let columns = backward
        .columns()
        .iter()
        .filter_map(|column| match first_prices.get(&column.name) {
            Some(&first_price) => Some((
                column.name.clone(),
                forward_adjust_series(&column.values, first_price),
            )),
            None => {
                tracing::warn!(instrument = %column.name, "no first price, dropping from adjusted set");
                None
            }
        })
        .collect();

    Frame::from_columns(backward.dates().to_vec(), columns)
}
