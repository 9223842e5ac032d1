//! CSV file data adapter.

use crate::domain::contract::ContractRecord;
use crate::domain::error::RiskplotError;
use crate::domain::frame::Frame;
use crate::ports::data_port::{DataPort, LongColumns};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_HEADER: &str = "Date";

pub struct CsvAdapter {
    base_path: PathBuf,
    date_format: String,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    fn csv_path(&self, table: &str) -> PathBuf {
        self.base_path.join(table)
    }

    fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, &self.date_format) {
            return Some(date);
        }
        // tolerate a time-of-day suffix such as "2020-01-02 00:00:00"
        let date_part = raw.split([' ', 'T']).next()?;
        NaiveDate::parse_from_str(date_part, &self.date_format).ok()
    }
}

fn parse_value(raw: &str) -> Result<f64, std::num::ParseFloatError> {
    match raw.trim() {
        "" | "NaN" | "nan" | "NA" | "N/A" => Ok(f64::NAN),
        s => s.parse(),
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn table_error(path: &Path, reason: impl Into<String>) -> RiskplotError {
    RiskplotError::Table {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

impl DataPort for CsvAdapter {
    fn load_wide(&self, table: &str) -> Result<Frame, RiskplotError> {
        let path = self.csv_path(table);
        let content = fs::read_to_string(&path)
            .map_err(|e| table_error(&path, format!("failed to read: {}", e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| table_error(&path, format!("CSV header error: {}", e)))?
            .clone();
        if headers.len() < 2 {
            return Err(table_error(&path, "expected a date column and at least one instrument"));
        }
        let names: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

        let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record =
                result.map_err(|e| table_error(&path, format!("CSV parse error: {}", e)))?;
            let date_str = record.get(0).unwrap_or_default();
            let date = self.parse_date(date_str).ok_or_else(|| {
                table_error(&path, format!("invalid date {:?} on row {}", date_str, line + 1))
            })?;

            let mut values = Vec::with_capacity(names.len());
            for (col, name) in names.iter().enumerate() {
                let raw = record.get(col + 1).unwrap_or_default();
                let value = parse_value(raw).map_err(|e| {
                    table_error(&path, format!("invalid {} value {:?}: {}", name, raw, e))
                })?;
                values.push(value);
            }
            rows.push((date, values));
        }

        rows.sort_by_key(|(date, _)| *date);
        if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(table_error(&path, format!("duplicate date {}", w[0].0)));
        }

        let dates = rows.iter().map(|(d, _)| *d).collect();
        let columns = names
            .iter()
            .enumerate()
            .map(|(col, name)| (name.clone(), rows.iter().map(|(_, v)| v[col]).collect()))
            .collect();

        Frame::from_columns(dates, columns).map_err(|e| table_error(&path, e.to_string()))
    }

    fn load_long(
        &self,
        table: &str,
        columns: &LongColumns,
    ) -> Result<Vec<ContractRecord>, RiskplotError> {
        let path = self.csv_path(table);
        let content = fs::read_to_string(&path)
            .map_err(|e| table_error(&path, format!("failed to read: {}", e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| table_error(&path, format!("CSV header error: {}", e)))?
            .clone();

        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| RiskplotError::MissingColumn {
                    table: path.display().to_string(),
                    column: column.to_string(),
                })
        };
        let name_idx = find(&columns.name)?;
        let date_idx = find(&columns.date)?;
        let close_idx = find(&columns.close)?;

        let mut records = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record =
                result.map_err(|e| table_error(&path, format!("CSV parse error: {}", e)))?;

            let name = record.get(name_idx).unwrap_or_default().trim();
            if name.is_empty() {
                return Err(table_error(&path, format!("empty {} on row {}", columns.name, line + 1)));
            }
            let date_str = record.get(date_idx).unwrap_or_default();
            let date = self.parse_date(date_str).ok_or_else(|| {
                table_error(&path, format!("invalid date {:?} on row {}", date_str, line + 1))
            })?;
            let raw = record.get(close_idx).unwrap_or_default();
            let close = parse_value(raw)
                .map_err(|e| table_error(&path, format!("invalid close value {:?}: {}", raw, e)))?;

            records.push(ContractRecord {
                name: name.to_string(),
                date,
                close,
            });
        }

        Ok(records)
    }

    fn store_wide(&self, table: &str, frame: &Frame) -> Result<(), RiskplotError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.csv_path(table);

        let mut wtr = csv::Writer::from_path(&path)
            .map_err(|e| table_error(&path, format!("failed to open for writing: {}", e)))?;

        let mut header = vec![DATE_HEADER.to_string()];
        header.extend(frame.column_names());
        wtr.write_record(&header)
            .map_err(|e| table_error(&path, e.to_string()))?;

        for (i, date) in frame.dates().iter().enumerate() {
            let mut row = vec![date.format(&self.date_format).to_string()];
            row.extend(frame.columns().iter().map(|c| format_value(c.values[i])));
            wtr.write_record(&row)
                .map_err(|e| table_error(&path, e.to_string()))?;
        }

        wtr.flush()?;
        Ok(())
    }
}
