//! Tabular data access port trait.
//!
//! A data port reads and writes flat, date-indexed tables. Wide tables carry
//! one column per instrument; long tables carry one observation per row.

use crate::domain::contract::ContractRecord;
use crate::domain::error::RiskplotError;
use crate::domain::frame::Frame;

/// Column names of a long-format table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongColumns {
    pub name: String,
    pub date: String,
    pub close: String,
}

impl Default for LongColumns {
    fn default() -> Self {
        Self {
            name: "NAME".into(),
            date: "DATE".into(),
            close: "CLOSE".into(),
        }
    }
}

pub trait DataPort {
    fn load_wide(&self, table: &str) -> Result<Frame, RiskplotError>;

    fn load_long(
        &self,
        table: &str,
        columns: &LongColumns,
    ) -> Result<Vec<ContractRecord>, RiskplotError>;

    fn store_wide(&self, table: &str, frame: &Frame) -> Result<(), RiskplotError>;
}
