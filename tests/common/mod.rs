#![allow(dead_code)]

use chrono::NaiveDate;
use riskplot::domain::contract::ContractRecord;
use riskplot::domain::error::RiskplotError;
use riskplot::domain::frame::Frame;
use riskplot::domain::pipeline::PortfolioRun;
use riskplot::ports::data_port::{DataPort, LongColumns};
use riskplot::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct MockDataPort {
    pub wide: HashMap<String, Frame>,
    pub long: HashMap<String, Vec<ContractRecord>>,
    pub errors: HashMap<String, String>,
    pub stored: RefCell<HashMap<String, Frame>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            wide: HashMap::new(),
            long: HashMap::new(),
            errors: HashMap::new(),
            stored: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_wide(mut self, table: &str, frame: Frame) -> Self {
        self.wide.insert(table.to_string(), frame);
        self
    }

    pub fn with_long(mut self, table: &str, records: Vec<ContractRecord>) -> Self {
        self.long.insert(table.to_string(), records);
        self
    }

    pub fn with_error(mut self, table: &str, reason: &str) -> Self {
        self.errors.insert(table.to_string(), reason.to_string());
        self
    }

    pub fn stored(&self, table: &str) -> Option<Frame> {
        self.stored.borrow().get(table).cloned()
    }

    fn check(&self, table: &str) -> Result<(), RiskplotError> {
        match self.errors.get(table) {
            Some(reason) => Err(RiskplotError::Table {
                path: table.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DataPort for MockDataPort {
    fn load_wide(&self, table: &str) -> Result<Frame, RiskplotError> {
        self.check(table)?;
        self.wide.get(table).cloned().ok_or_else(|| RiskplotError::Table {
            path: table.to_string(),
            reason: "no such table".to_string(),
        })
    }

    fn load_long(
        &self,
        table: &str,
        _columns: &LongColumns,
    ) -> Result<Vec<ContractRecord>, RiskplotError> {
        self.check(table)?;
        self.long.get(table).cloned().ok_or_else(|| RiskplotError::Table {
            path: table.to_string(),
            reason: "no such table".to_string(),
        })
    }

    fn store_wide(&self, table: &str, frame: &Frame) -> Result<(), RiskplotError> {
        self.check(table)?;
        self.stored
            .borrow_mut()
            .insert(table.to_string(), frame.clone());
        Ok(())
    }
}

/// Records what it was asked to render instead of writing a file.
pub struct RecordingReport {
    pub calls: RefCell<Vec<(String, PathBuf, Vec<String>)>>,
    pub fail: bool,
}

impl RecordingReport {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fail: true,
        }
    }
}

impl ReportPort for RecordingReport {
    fn write(&self, run: &PortfolioRun, title: &str, output_path: &Path) -> Result<(), RiskplotError> {
        if self.fail {
            return Err(RiskplotError::Io(std::io::Error::other("disk full")));
        }
        let pages = run.instruments.iter().map(|i| i.name.clone()).collect();
        self.calls
            .borrow_mut()
            .push((title.to_string(), output_path.to_path_buf(), pages));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `n` consecutive calendar days from `start`.
pub fn dates_from(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    (0..n)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect()
}

/// A deterministic wavy price path.
pub fn price_path(n: usize, start_price: f64, drift: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            start_price * (1.0 + drift * t) + (t * 0.7).sin() * start_price * 0.01
        })
        .collect()
}

pub fn wide_frame(dates: Vec<NaiveDate>, columns: Vec<(&str, Vec<f64>)>) -> Frame {
    Frame::from_columns(
        dates,
        columns
            .into_iter()
            .map(|(name, values)| (name.to_string(), values))
            .collect(),
    )
    .unwrap()
}

pub fn record(name: &str, date: NaiveDate, close: f64) -> ContractRecord {
    ContractRecord {
        name: name.to_string(),
        date,
        close,
    }
}

/// Long-format records for one instrument over `dates`.
pub fn long_records(name: &str, dates: &[NaiveDate], closes: &[f64]) -> Vec<ContractRecord> {
    dates
        .iter()
        .zip(closes)
        .map(|(d, c)| record(name, *d, *c))
        .collect()
}
