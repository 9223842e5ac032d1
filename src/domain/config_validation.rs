//! Configuration validation.
//!
//! Validates every config field a run reads before any table is loaded.

use crate::domain::error::RiskplotError;
use crate::domain::pipeline::PipelineKind;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const CONFIG_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), RiskplotError> {
    let pipeline = validate_pipeline(config)?;
    validate_instruments(&parse_instruments(config))?;
    validate_dates(config)?;
    validate_windows(config)?;
    validate_risk_budget(config)?;
    if pipeline == PipelineKind::Futures {
        validate_budget_coverage(config)?;
    }
    Ok(())
}

fn validate_pipeline(config: &dyn ConfigPort) -> Result<PipelineKind, RiskplotError> {
    match config.get_string("run", "pipeline") {
        None => Err(RiskplotError::ConfigMissing {
            section: "run".to_string(),
            key: "pipeline".to_string(),
        }),
        Some(s) => s.parse().map_err(|reason| RiskplotError::ConfigInvalid {
            section: "run".to_string(),
            key: "pipeline".to_string(),
            reason,
        }),
    }
}

/// Reject an instrument listed more than once.
pub fn validate_instruments(instruments: &[String]) -> Result<(), RiskplotError> {
    let mut seen = std::collections::HashSet::new();
    match instruments.iter().find(|i| !seen.insert(i.as_str())) {
        Some(repeated) => Err(RiskplotError::ConfigInvalid {
            section: "run".to_string(),
            key: "instruments".to_string(),
            reason: format!("instrument {} is listed more than once", repeated),
        }),
        None => Ok(()),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), RiskplotError> {
    let start_date = parse_optional_date(config, "start_date")?;
    let end_date = parse_optional_date(config, "end_date")?;

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(RiskplotError::ConfigInvalid {
                section: "run".to_string(),
                key: "start_date".to_string(),
                reason: "start_date must not be after end_date".to_string(),
            });
        }
    }
    Ok(())
}

/// Parse an optional `[run]` date; absent means unbounded.
pub fn parse_optional_date(
    config: &dyn ConfigPort,
    field: &str,
) -> Result<Option<NaiveDate>, RiskplotError> {
    match config.get_string("run", field) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, CONFIG_DATE_FORMAT)
            .map(Some)
            .map_err(|_| RiskplotError::ConfigInvalid {
                section: "run".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            }),
    }
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), RiskplotError> {
    for key in ["window", "vol_window"] {
        if config.get_string("metrics", key).is_some() && config.get_int("metrics", key, 0) < 2 {
            return Err(RiskplotError::ConfigInvalid {
                section: "metrics".to_string(),
                key: key.to_string(),
                reason: format!("{} must be an integer of at least 2", key),
            });
        }
    }
    parse_window_list(config)?;
    Ok(())
}

/// Ensemble member windows from `[metrics] vol_windows`; empty when unset.
pub fn parse_window_list(config: &dyn ConfigPort) -> Result<Vec<usize>, RiskplotError> {
    let Some(raw) = config.get_string("metrics", "vol_windows") else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<usize>() {
            Ok(w) if w >= 2 => Ok(w),
            _ => Err(RiskplotError::ConfigInvalid {
                section: "metrics".to_string(),
                key: "vol_windows".to_string(),
                reason: format!("window {:?} must be an integer of at least 2", s),
            }),
        })
        .collect()
}

fn validate_risk_budget(config: &dyn ConfigPort) -> Result<(), RiskplotError> {
    for instrument in config.keys("risk_budget") {
        let value = config.get_double("risk_budget", &instrument, f64::NAN);
        if !(value.is_finite() && value > 0.0) {
            return Err(RiskplotError::ConfigInvalid {
                section: "risk_budget".to_string(),
                key: instrument,
                reason: "risk budget must be a positive number".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_budget_coverage(config: &dyn ConfigPort) -> Result<(), RiskplotError> {
    let budgets = config.keys("risk_budget");
    let instruments = parse_instruments(config);
    if instruments.is_empty() && budgets.is_empty() {
        return Err(RiskplotError::ConfigMissing {
            section: "run".to_string(),
            key: "instruments".to_string(),
        });
    }
    match instruments.into_iter().find(|i| !budgets.contains(i)) {
        Some(instrument) => Err(RiskplotError::MissingRiskBudget { instrument }),
        None => Ok(()),
    }
}

/// Comma-separated `[run] instruments`, trimmed, in file order.
pub fn parse_instruments(config: &dyn ConfigPort) -> Vec<String> {
    config
        .get_string("run", "instruments")
        .map(|s| {
            s.split(',')
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_static_config_passes() {
        let config = make_config(
            r#"
[run]
pipeline = static
instruments = SPY,FEZ
start_date = 2007-03-01
end_date = 2023-01-01

[metrics]
window = 252
"#,
        );
        assert!(validate_run_config(&config).is_ok());
    }

    #[test]
    fn valid_futures_config_passes() {
        let config = make_config(
            r#"
[run]
pipeline = futures
instruments = ES, CL

[metrics]
vol_windows = 20,60,120,240

[risk_budget]
ES = 0.25
CL = 0.25
"#,
        );
        assert!(validate_run_config(&config).is_ok());
    }

    #[test]
    fn repeated_instrument_fails() {
        let config = make_config("[run]\npipeline = static\ninstruments = SPY, FEZ, SPY\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(
            err,
            RiskplotError::ConfigInvalid { ref section, ref key, .. }
                if section == "run" && key == "instruments"
        ));
        assert!(err.to_string().contains("SPY"));
    }

    #[test]
    fn missing_pipeline_fails() {
        let config = make_config("[run]\ninstruments = SPY\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, RiskplotError::ConfigMissing { key, .. } if key == "pipeline"));
    }

    #[test]
    fn unknown_pipeline_fails() {
        let config = make_config("[run]\npipeline = weekly\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, RiskplotError::ConfigInvalid { key, .. } if key == "pipeline"));
    }

    #[test]
    fn invalid_start_date_format_fails() {
        let config = make_config("[run]\npipeline = static\nstart_date = 2020/01/01\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, RiskplotError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn start_date_after_end_date_fails() {
        let config =
            make_config("[run]\npipeline = static\nstart_date = 2024-12-31\nend_date = 2020-01-01\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, RiskplotError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn single_day_range_is_accepted() {
        let config =
            make_config("[run]\npipeline = static\nstart_date = 2024-01-02\nend_date = 2024-01-02\n");
        assert!(validate_run_config(&config).is_ok());
    }

    #[test]
    fn window_below_two_fails() {
        let config = make_config("[run]\npipeline = static\n\n[metrics]\nwindow = 1\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, RiskplotError::ConfigInvalid { key, .. } if key == "window"));

        let config = make_config("[run]\npipeline = static\n\n[metrics]\nvol_window = abc\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, RiskplotError::ConfigInvalid { key, .. } if key == "vol_window"));
    }

    #[test]
    fn bad_ensemble_member_fails() {
        let config = make_config("[run]\npipeline = static\n\n[metrics]\nvol_windows = 20,x\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, RiskplotError::ConfigInvalid { key, .. } if key == "vol_windows"));
    }

    #[test]
    fn window_list_parses_in_order() {
        let config = make_config("[metrics]\nvol_windows = 20, 60 ,120\n");
        assert_eq!(parse_window_list(&config).unwrap(), vec![20, 60, 120]);
        assert!(parse_window_list(&make_config("[metrics]\n")).unwrap().is_empty());
    }

    #[test]
    fn non_positive_budget_fails() {
        let config = make_config("[run]\npipeline = futures\ninstruments = ES\n\n[risk_budget]\nES = 0\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, RiskplotError::ConfigInvalid { key, .. } if key == "ES"));

        let config = make_config("[run]\npipeline = futures\ninstruments = ES\n\n[risk_budget]\nES = lots\n");
        assert!(validate_run_config(&config).is_err());
    }

    #[test]
    fn futures_instrument_without_budget_fails() {
        let config = make_config(
            "[run]\npipeline = futures\ninstruments = ES,GC\n\n[risk_budget]\nES = 0.25\n",
        );
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, RiskplotError::MissingRiskBudget { instrument } if instrument == "GC"));
    }

    #[test]
    fn budget_lookup_is_case_sensitive() {
        let config =
            make_config("[run]\npipeline = futures\ninstruments = es\n\n[risk_budget]\nES = 0.25\n");
        assert!(matches!(
            validate_run_config(&config),
            Err(RiskplotError::MissingRiskBudget { .. })
        ));
    }

    #[test]
    fn futures_without_instruments_or_budgets_fails() {
        let config = make_config("[run]\npipeline = futures\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, RiskplotError::ConfigMissing { key, .. } if key == "instruments"));
    }

    #[test]
    fn static_pipeline_ignores_budget_coverage() {
        let config = make_config("[run]\npipeline = static\ninstruments = SPY\n");
        assert!(validate_run_config(&config).is_ok());
    }

    #[test]
    fn instruments_are_trimmed_and_ordered() {
        let config = make_config("[run]\ninstruments =  SPY , FEZ,,EWJ\n");
        assert_eq!(parse_instruments(&config), vec!["SPY", "FEZ", "EWJ"]);
    }
}
