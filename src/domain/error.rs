//! Domain error types.

/// Top-level error type for riskplot.
///
/// Only setup problems are errors. Numeric degeneracy (zero volatility,
/// short history) is carried as `NaN`/`inf` through the computed series.
#[derive(Debug, thiserror::Error)]
pub enum RiskplotError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no risk budget configured for instrument {instrument}")]
    MissingRiskBudget { instrument: String },

    #[error("table error in {path}: {reason}")]
    Table { path: String, reason: String },

    #[error("table {table} is missing required column {column}")]
    MissingColumn { table: String, column: String },

    #[error("no data in {table}: {reason}")]
    NoData { table: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RiskplotError> for std::process::ExitCode {
    fn from(err: &RiskplotError) -> Self {
        let code: u8 = match err {
            RiskplotError::Io(_) => 1,
            RiskplotError::ConfigParse { .. }
            | RiskplotError::ConfigMissing { .. }
            | RiskplotError::ConfigInvalid { .. }
            | RiskplotError::MissingRiskBudget { .. } => 2,
            RiskplotError::Table { .. } => 3,
            RiskplotError::MissingColumn { .. } | RiskplotError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
