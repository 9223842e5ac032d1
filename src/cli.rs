//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvAdapter, DEFAULT_DATE_FORMAT};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::typst_report::TypstReportAdapter;
use crate::domain::config_validation::{
    parse_instruments, parse_optional_date, parse_window_list, validate_run_config,
};
use crate::domain::contract::pivot_closes;
use crate::domain::error::RiskplotError;
use crate::domain::frame::Frame;
use crate::domain::metrics::{CumulativeConvention, MetricsConfig, MetricsSummary};
use crate::domain::pipeline::{
    self, PipelineKind, PortfolioRun, RunConfig, TableNames, PORTFOLIO_TABLE, RETURNS_TABLE,
    WEIGHTS_TABLE,
};
use crate::domain::volatility::{VolEstimator, REPORT_WINDOW, RISK_VOL_WINDOW};
use crate::domain::weights::RiskBudget;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, LongColumns};
use crate::ports::report_port::ReportPort;

pub const DEFAULT_OUTPUT: &str = "backtest_plots.typ";
pub const DEFAULT_TITLE: &str = "Combined Portfolio";

#[derive(Parser, Debug)]
#[command(name = "riskplot", about = "Portfolio backtest diagnostics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the configured pipeline and write the report
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Derive returns, equal weights and portfolio returns from the price table
    Prepare {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the observed date range of each instrument
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Run {
            config,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_report_command(&config, output.as_deref())
            }
        }
        Command::Prepare { config } => run_prepare(&config),
        Command::Info { config } => run_info(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, RiskplotError> {
    tracing::info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path).map_err(|e| RiskplotError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Risk budgets from the `[risk_budget]` section. Assumes the section has
/// passed validation.
pub fn build_risk_budget(config: &dyn ConfigPort) -> RiskBudget {
    config
        .keys("risk_budget")
        .into_iter()
        .map(|instrument| {
            let budget = config.get_double("risk_budget", &instrument, f64::NAN);
            (instrument, budget)
        })
        .collect()
}

pub fn build_vol_estimator(config: &dyn ConfigPort) -> Result<VolEstimator, RiskplotError> {
    let ensemble = parse_window_list(config)?;
    if !ensemble.is_empty() {
        return Ok(VolEstimator::Ensemble(ensemble));
    }
    let window = config.get_int("metrics", "vol_window", RISK_VOL_WINDOW as i64);
    Ok(VolEstimator::Single(window.max(2) as usize))
}

/// Validate `config` and resolve every setting a run needs.
pub fn build_run_config(config: &dyn ConfigPort) -> Result<RunConfig, RiskplotError> {
    validate_run_config(config)?;

    let pipeline: PipelineKind = config
        .get_string("run", "pipeline")
        .unwrap_or_default()
        .parse()
        .map_err(|reason| RiskplotError::ConfigInvalid {
            section: "run".to_string(),
            key: "pipeline".to_string(),
            reason,
        })?;

    let risk_budget = build_risk_budget(config);
    let mut instruments = parse_instruments(config);
    if instruments.is_empty() && pipeline == PipelineKind::Futures {
        instruments = risk_budget.keys().cloned().collect();
    }

    let defaults = TableNames::default();
    let table = |key: &str, default: String| config.get_string("data", key).unwrap_or(default);
    let tables = TableNames {
        prices: table("prices", defaults.prices),
        weights: table("weights", defaults.weights),
        adjusted: table("adjusted", defaults.adjusted),
        contracts: table("contracts", defaults.contracts),
    };

    let columns = LongColumns::default();
    let long_columns = LongColumns {
        name: table("name_column", columns.name),
        date: table("date_column", columns.date),
        close: table("close_column", columns.close),
    };

    let offset = config.get_bool(
        "metrics",
        "cumulative_offset",
        pipeline.default_convention() == CumulativeConvention::IndexLevel,
    );
    let metrics = MetricsConfig {
        window: config.get_int("metrics", "window", REPORT_WINDOW as i64).max(2) as usize,
        cumulative: if offset {
            CumulativeConvention::IndexLevel
        } else {
            CumulativeConvention::Sum
        },
    };

    Ok(RunConfig {
        pipeline,
        data_path: config
            .get_string("data", "path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
        date_format: table("date_format", DEFAULT_DATE_FORMAT.to_string()),
        tables,
        long_columns,
        instruments,
        start_date: parse_optional_date(config, "start_date")?,
        end_date: parse_optional_date(config, "end_date")?,
        output: config
            .get_string("run", "output")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        tables_dir: config.get_string("run", "tables_dir").map(PathBuf::from),
        equal_allocation: config.get_bool("run", "equal_allocation", true),
        title: config
            .get_string("run", "title")
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        metrics,
        vol: build_vol_estimator(config)?,
        risk_budget,
    })
}

fn data_adapter(run_config: &RunConfig) -> CsvAdapter {
    CsvAdapter::new(run_config.data_path.clone()).with_date_format(&run_config.date_format)
}

/// Execute the pipeline, persist derived tables when configured and write
/// the report.
pub fn run_pipeline(
    data_port: &dyn DataPort,
    table_sink: Option<&dyn DataPort>,
    report_port: &dyn ReportPort,
    run_config: &RunConfig,
) -> Result<PortfolioRun, RiskplotError> {
    let run = pipeline::execute(data_port, run_config)?;

    if let Some(sink) = table_sink {
        pipeline::persist(sink, &run)?;
        tracing::info!("derived tables written");
    }

    report_port.write(&run, &run_config.title, &run_config.output)?;
    Ok(run)
}

fn run_report_command(config_path: &Path, output: Option<&Path>) -> Result<(), RiskplotError> {
    let adapter = load_config(config_path)?;
    let mut run_config = build_run_config(&adapter)?;
    if let Some(output) = output {
        run_config.output = output.to_path_buf();
    }

    let data_port = data_adapter(&run_config);
    let sink = run_config
        .tables_dir
        .as_ref()
        .map(|dir| CsvAdapter::new(dir.clone()).with_date_format(&run_config.date_format));

    let run = run_pipeline(
        &data_port,
        sink.as_ref().map(|s| s as &dyn DataPort),
        &TypstReportAdapter::new(),
        &run_config,
    )?;

    print_summary(&run, &run_config.title);
    eprintln!("\nReport written to: {}", run_config.output.display());
    Ok(())
}

fn format_summary_line(label: &str, summary: &MetricsSummary) -> String {
    format!(
        "  {:<20} cum {:>9.4}  max dd {:>8.2}%  sharpe {:>6.2}  vol {:>7.4}",
        label, summary.final_cumulative, summary.max_drawdown, summary.last_sharpe, summary.last_vol
    )
}

fn print_summary(run: &PortfolioRun, title: &str) {
    eprintln!("\n=== Instruments ===");
    for instrument in &run.instruments {
        eprintln!("{}", format_summary_line(&instrument.name, &instrument.metrics.summary()));
    }
    eprintln!("\n=== {} ===", title);
    eprintln!("{}", format_summary_line("portfolio", &run.portfolio.summary()));
}

fn run_dry_run(config_path: &Path) -> Result<(), RiskplotError> {
    let adapter = load_config(config_path)?;
    let run_config = build_run_config(&adapter)?;
    eprintln!("Config validated successfully");

    eprintln!("\nPlan:");
    eprintln!("  pipeline:    {}", run_config.pipeline);
    eprintln!("  data path:   {}", run_config.data_path.display());
    match run_config.pipeline {
        PipelineKind::Static => {
            eprintln!("  prices:      {}", run_config.tables.prices);
            eprintln!("  weights:     {}", run_config.tables.weights);
            eprintln!("  equal alloc: {}", run_config.equal_allocation);
        }
        PipelineKind::Futures => {
            eprintln!("  adjusted:    {}", run_config.tables.adjusted);
            eprintln!("  contracts:   {}", run_config.tables.contracts);
            eprintln!(
                "  volatility:  {} (first weight after {} returns)",
                run_config.vol,
                run_config.vol.warmup()
            );
        }
    }
    if run_config.instruments.is_empty() {
        eprintln!("  instruments: all columns");
    } else {
        eprintln!("  instruments: {}", run_config.instruments.join(", "));
    }
    for (instrument, budget) in &run_config.risk_budget {
        eprintln!("  budget {:<6} {}", instrument, budget);
    }
    let bound = |d: Option<chrono::NaiveDate>| d.map_or("-".to_string(), |d| d.to_string());
    eprintln!(
        "  dates:       {} to {}",
        bound(run_config.start_date),
        bound(run_config.end_date)
    );
    eprintln!("  window:      {}", run_config.metrics.window);
    eprintln!("  cumulative:  {:?}", run_config.metrics.cumulative);
    eprintln!("  output:      {}", run_config.output.display());
    if let Some(dir) = &run_config.tables_dir {
        eprintln!("  tables dir:  {}", dir.display());
    }

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

/// Write returns, equal weights and portfolio returns for the price table
/// into `sink`.
pub fn prepare(data_port: &dyn DataPort, sink: &dyn DataPort, run_config: &RunConfig) -> Result<(), RiskplotError> {
    let prices = data_port.load_wide(&run_config.tables.prices)?;
    let prices = if run_config.instruments.is_empty() {
        prices
    } else {
        pipeline::require_columns(&prices, &run_config.tables.prices, &run_config.instruments)?;
        prices.select(&run_config.instruments)
    };
    let prices = prices.filter_dates(run_config.start_date, run_config.end_date);
    pipeline::require_rows(&prices, &run_config.tables.prices, "no price observations to prepare")?;

    let prepared = pipeline::prepare_tables(&prices)?;
    sink.store_wide(RETURNS_TABLE, &prepared.returns)?;
    sink.store_wide(WEIGHTS_TABLE, &prepared.weights)?;
    sink.store_wide(PORTFOLIO_TABLE, &prepared.portfolio_value)?;
    tracing::info!(
        instruments = prices.columns().len(),
        rows = prices.len(),
        "prepared tables written"
    );
    Ok(())
}

fn run_prepare(config_path: &Path) -> Result<(), RiskplotError> {
    let adapter = load_config(config_path)?;
    let run_config = build_run_config(&adapter)?;
    let Some(dir) = run_config.tables_dir.clone() else {
        return Err(RiskplotError::ConfigMissing {
            section: "run".to_string(),
            key: "tables_dir".to_string(),
        });
    };

    let sink = CsvAdapter::new(dir.clone()).with_date_format(&run_config.date_format);
    prepare(&data_adapter(&run_config), &sink, &run_config)?;
    eprintln!("Prepared tables written to: {}", dir.display());
    Ok(())
}

/// One row of the `info` listing.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentRange {
    pub name: String,
    pub range: Option<(chrono::NaiveDate, chrono::NaiveDate, usize)>,
}

/// Observed range per instrument of the table the configured pipeline reads.
pub fn instrument_ranges(
    data_port: &dyn DataPort,
    run_config: &RunConfig,
) -> Result<Vec<InstrumentRange>, RiskplotError> {
    let frame: Frame = match run_config.pipeline {
        PipelineKind::Static => data_port.load_wide(&run_config.tables.prices)?,
        PipelineKind::Futures => {
            let records = data_port.load_long(&run_config.tables.adjusted, &run_config.long_columns)?;
            let names: Vec<String> = records
                .iter()
                .map(|r| r.name.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            pivot_closes(&records, &names).map_err(|e| RiskplotError::Table {
                path: run_config.tables.adjusted.clone(),
                reason: e.to_string(),
            })?
        }
    };

    let names = if run_config.instruments.is_empty() {
        frame.column_names()
    } else {
        run_config.instruments.clone()
    };
    Ok(names
        .into_iter()
        .map(|name| InstrumentRange {
            range: frame.observed_range(&name),
            name,
        })
        .collect())
}

fn run_info(config_path: &Path) -> Result<(), RiskplotError> {
    let adapter = load_config(config_path)?;
    let run_config = build_run_config(&adapter)?;

    for row in instrument_ranges(&data_adapter(&run_config), &run_config)? {
        match row.range {
            Some((first, last, count)) => {
                println!("{}: {} observations, {} to {}", row.name, count, first, last)
            }
            None => {
                tracing::warn!(instrument = %row.name, "no observations");
                println!("{}: no data found", row.name);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn static_defaults() {
        let config = make_config("[run]\npipeline = static\n");
        let run_config = build_run_config(&config).unwrap();

        assert_eq!(run_config.pipeline, PipelineKind::Static);
        assert!(run_config.instruments.is_empty());
        assert_eq!(run_config.data_path, PathBuf::from("."));
        assert_eq!(run_config.tables, TableNames::default());
        assert_eq!(run_config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(run_config.title, DEFAULT_TITLE);
        assert_eq!(run_config.metrics.window, 252);
        assert_eq!(run_config.metrics.cumulative, CumulativeConvention::Sum);
        assert_eq!(run_config.vol, VolEstimator::Single(120));
        assert!(run_config.tables_dir.is_none());
        assert!(run_config.equal_allocation);
    }

    #[test]
    fn futures_defaults_to_index_level_and_budget_instruments() {
        let config =
            make_config("[run]\npipeline = futures\n\n[risk_budget]\nES = 0.25\nCL = 0.5\n");
        let run_config = build_run_config(&config).unwrap();

        assert_eq!(run_config.metrics.cumulative, CumulativeConvention::IndexLevel);
        assert_eq!(run_config.instruments, vec!["CL", "ES"]);
        assert_eq!(run_config.risk_budget.get("CL"), Some(&0.5));
    }

    #[test]
    fn explicit_settings_override_defaults() {
        let config = make_config(
            r#"
[data]
path = /srv/data
adjusted = adj.csv
close_column = SETTLE
date_format = %d/%m/%Y

[run]
pipeline = futures
instruments = ES
start_date = 2010-01-01
output = out/report.typ
tables_dir = derived
title = Futures Book

[metrics]
window = 63
vol_windows = 20,60
cumulative_offset = false

[risk_budget]
ES = 0.25
"#,
        );
        let run_config = build_run_config(&config).unwrap();

        assert_eq!(run_config.data_path, PathBuf::from("/srv/data"));
        assert_eq!(run_config.tables.adjusted, "adj.csv");
        assert_eq!(run_config.long_columns.close, "SETTLE");
        assert_eq!(run_config.long_columns.name, "NAME");
        assert_eq!(run_config.date_format, "%d/%m/%Y");
        assert_eq!(
            run_config.start_date,
            chrono::NaiveDate::from_ymd_opt(2010, 1, 1)
        );
        assert!(run_config.end_date.is_none());
        assert_eq!(run_config.output, PathBuf::from("out/report.typ"));
        assert_eq!(run_config.tables_dir, Some(PathBuf::from("derived")));
        assert_eq!(run_config.title, "Futures Book");
        assert_eq!(run_config.metrics.window, 63);
        assert_eq!(run_config.metrics.cumulative, CumulativeConvention::Sum);
        assert_eq!(run_config.vol, VolEstimator::Ensemble(vec![20, 60]));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = make_config("[run]\npipeline = futures\ninstruments = GC\n\n[risk_budget]\nES = 0.25\n");
        assert!(matches!(
            build_run_config(&config),
            Err(RiskplotError::MissingRiskBudget { .. })
        ));
    }

    #[test]
    fn summary_line_shows_nan_as_nan() {
        let line = format_summary_line(
            "ES",
            &MetricsSummary {
                final_cumulative: 1.5,
                max_drawdown: -10.0,
                last_sharpe: f64::NAN,
                last_vol: 0.2,
            },
        );
        assert!(line.contains("ES"));
        assert!(line.contains("1.5000"));
        assert!(line.contains("NaN"));
    }

    #[test]
    fn cli_parses_run_with_overrides() {
        let cli = Cli::try_parse_from(["riskplot", "run", "-c", "cfg.ini", "-o", "x.typ", "--dry-run"])
            .unwrap();
        match cli.command {
            Command::Run {
                config,
                output,
                dry_run,
            } => {
                assert_eq!(config, PathBuf::from("cfg.ini"));
                assert_eq!(output, Some(PathBuf::from("x.typ")));
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_requires_config() {
        assert!(Cli::try_parse_from(["riskplot", "info"]).is_err());
    }
}
