//! Position weights: static tables and inverse-volatility risk budgets.

use super::frame::{Frame, FrameError};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Per-instrument risk budget scalars. Budgets are applied independently and
/// need not sum to one.
pub type RiskBudget = BTreeMap<String, f64>;

/// 1 / (vol * budget). Zero vol or zero budget gives `inf`; `NaN` vol gives `NaN`.
pub fn inverse_vol_weight(vol: f64, budget: f64) -> f64 {
    1.0 / (vol * budget)
}

/// Inverse-volatility weights for every column of `vols`. Instruments without
/// a budget get an all-`NaN` column.
pub fn inverse_vol_weights(vols: &Frame, budgets: &RiskBudget) -> Result<Frame, FrameError> {
    let mut weights = vols.empty_like();
    for column in vols.columns() {
        let values = match budgets.get(&column.name) {
            Some(&budget) => column
                .values
                .iter()
                .map(|&v| inverse_vol_weight(v, budget))
                .collect(),
            None => {
                tracing::warn!(instrument = %column.name, "no risk budget, weights undefined");
                vec![f64::NAN; column.values.len()]
            }
        };
        weights.push_column(column.name.clone(), values)?;
    }
    Ok(weights)
}

/// Restrict a weight table to `instruments`, optionally scaling every weight
/// by 1/N where N is the number of instruments.
pub fn static_weights(table: &Frame, instruments: &[String], equal_allocation: bool) -> Frame {
    let selected = table.select(instruments);
    if !equal_allocation || instruments.is_empty() {
        return selected;
    }
    let allocation = 1.0 / instruments.len() as f64;
    selected.map_columns(|values| values.iter().map(|w| w * allocation).collect())
}

/// Constant 1/N weights on the given index.
pub fn equal_weights(dates: &[NaiveDate], instruments: &[String]) -> Result<Frame, FrameError> {
    let weight = if instruments.is_empty() {
        0.0
    } else {
        1.0 / instruments.len() as f64
    };
    let columns = instruments
        .iter()
        .map(|name| (name.clone(), vec![weight; dates.len()]))
        .collect();
    Frame::from_columns(dates.to_vec(), columns)
}
