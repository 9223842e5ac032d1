//! Raw per-contract observations and the values derived from them.

use super::frame::{Frame, FrameError};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One close observation of an underlying contract, keyed by the instrument
/// identifier it rolls into.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractRecord {
    pub name: String,
    pub date: NaiveDate,
    pub close: f64,
}

/// Close of the chronologically earliest record for each instrument.
///
/// Records with a missing close are ignored. Ties on the earliest date keep
/// the record that appears first in the input.
pub fn first_prices(records: &[ContractRecord]) -> BTreeMap<String, f64> {
    let mut earliest: HashMap<&str, (NaiveDate, f64)> = HashMap::new();

    for record in records.iter().filter(|r| !r.close.is_nan()) {
        earliest
            .entry(record.name.as_str())
            .and_modify(|slot| {
                if record.date < slot.0 {
                    *slot = (record.date, record.close);
                }
            })
            .or_insert((record.date, record.close));
    }

    earliest
        .into_iter()
        .map(|(name, (_, close))| (name.to_string(), close))
        .collect()
}

/// Pivot long-format records into a wide frame: one column per instrument,
/// columns in the order of `instruments`. Instruments with no records get an
/// all-`NaN` column; a repeated `(name, date)` keeps the last record.
pub fn pivot_closes(
    records: &[ContractRecord],
    instruments: &[String],
) -> Result<Frame, FrameError> {
    let wanted: BTreeSet<&str> = instruments.iter().map(String::as_str).collect();
    let relevant: Vec<&ContractRecord> = records
        .iter()
        .filter(|r| wanted.contains(r.name.as_str()))
        .collect();

    let dates: Vec<NaiveDate> = relevant
        .iter()
        .map(|r| r.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let position: HashMap<NaiveDate, usize> =
        dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut columns: HashMap<&str, Vec<f64>> = instruments
        .iter()
        .map(|name| (name.as_str(), vec![f64::NAN; dates.len()]))
        .collect();

    for record in relevant {
        if let Some(values) = columns.get_mut(record.name.as_str()) {
            values[position[&record.date]] = record.close;
        }
    }

    let ordered = instruments
        .iter()
        .map(|name| {
            let values = columns.remove(name.as_str()).unwrap_or_default();
            (name.clone(), values)
        })
        .collect();

    Frame::from_columns(dates, ordered)
}
