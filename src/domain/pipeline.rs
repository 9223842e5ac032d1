//! Pipeline stages.
//!
//! Each stage takes immutable inputs and returns derived tables. The two
//! run modes differ only in where prices and weights come from:
//!
//! - static: wide price table + wide weight table;
//! - futures: backward-adjusted long table + raw contracts, forward-adjusted,
//!   weighted by inverse volatility under a risk budget.
//!
//! Both then share [`assemble`], which derives returns, aggregates the
//! portfolio and runs the metrics engine per instrument and once more for the
//! aggregate.

use super::config_validation::validate_instruments;
use super::contract::{first_prices, pivot_closes, ContractRecord};
use super::error::RiskplotError;
use super::forward_adjust::forward_adjust;
use super::frame::Frame;
use super::metrics::{simple_returns, CumulativeConvention, MetricsConfig, MetricsFrame};
use super::portfolio::aggregate_returns;
use super::volatility::VolEstimator;
use super::weights::{equal_weights, inverse_vol_weights, static_weights, RiskBudget};
use crate::ports::data_port::{DataPort, LongColumns};
use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const RETURNS_TABLE: &str = "returns.csv";
pub const WEIGHTS_TABLE: &str = "weights.csv";
pub const PORTFOLIO_TABLE: &str = "portfolio_value.csv";
pub const ADJUSTED_TABLE: &str = "forward_adjusted.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Static,
    Futures,
}

impl PipelineKind {
    /// Default cumulative-return display for this pipeline.
    pub fn default_convention(self) -> CumulativeConvention {
        match self {
            PipelineKind::Static => CumulativeConvention::Sum,
            PipelineKind::Futures => CumulativeConvention::IndexLevel,
        }
    }
}

impl FromStr for PipelineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "static" | "equity" => Ok(PipelineKind::Static),
            "futures" | "vol_scaled" => Ok(PipelineKind::Futures),
            other => Err(format!("unknown pipeline {:?} (expected static or futures)", other)),
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Static => write!(f, "static"),
            PipelineKind::Futures => write!(f, "futures"),
        }
    }
}

/// Table file names relative to the data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct TableNames {
    pub prices: String,
    pub weights: String,
    pub adjusted: String,
    pub contracts: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            prices: "close_prices.csv".into(),
            weights: "weights.csv".into(),
            adjusted: "adj_by_firstratedata.csv".into(),
            contracts: "individual_contracts_by_firstratedata.csv".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub pipeline: PipelineKind,
    pub data_path: PathBuf,
    pub date_format: String,
    pub tables: TableNames,
    pub long_columns: LongColumns,
    /// Empty means every column of the price table (static pipeline only).
    pub instruments: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub output: PathBuf,
    pub tables_dir: Option<PathBuf>,
    pub equal_allocation: bool,
    pub title: String,
    pub metrics: MetricsConfig,
    pub vol: VolEstimator,
    pub risk_budget: RiskBudget,
}

#[derive(Debug, Clone)]
pub struct InstrumentRun {
    pub name: String,
    pub prices: Vec<f64>,
    pub weights: Vec<f64>,
    pub metrics: MetricsFrame,
}

/// Everything one run derives; consumed by the report and the table sink.
#[derive(Debug, Clone)]
pub struct PortfolioRun {
    pub prices: Frame,
    pub returns: Frame,
    pub weights: Frame,
    pub portfolio_returns: Frame,
    pub instruments: Vec<InstrumentRun>,
    pub portfolio: MetricsFrame,
    /// Sum of instrument weights on the portfolio index.
    pub portfolio_weight: Vec<f64>,
    /// Sum of instrument prices on the portfolio index.
    pub portfolio_price: Vec<f64>,
    /// Forward-adjusted prices, futures pipeline only.
    pub adjusted: Option<Frame>,
}

fn frame_error(table: &str, err: super::frame::FrameError) -> RiskplotError {
    RiskplotError::Table {
        path: table.to_string(),
        reason: err.to_string(),
    }
}

/// Fail unless every instrument is a column of `frame`.
pub fn require_columns(frame: &Frame, table: &str, instruments: &[String]) -> Result<(), RiskplotError> {
    match instruments.iter().find(|name| !frame.has_column(name)) {
        Some(missing) => Err(RiskplotError::MissingColumn {
            table: table.to_string(),
            column: missing.clone(),
        }),
        None => Ok(()),
    }
}

/// Fail if `frame` has no rows or no observed values.
pub fn require_rows(frame: &Frame, table: &str, reason: &str) -> Result<(), RiskplotError> {
    let observed = frame
        .columns()
        .iter()
        .any(|c| c.values.iter().any(|v| !v.is_nan()));
    if frame.is_empty() || !observed {
        return Err(RiskplotError::NoData {
            table: table.to_string(),
            reason: reason.to_string(),
        });
    }
    Ok(())
}

/// Derive returns, aggregate the portfolio and compute every metrics frame.
pub fn assemble(
    prices: Frame,
    weights: Frame,
    metrics: &MetricsConfig,
) -> Result<PortfolioRun, RiskplotError> {
    let returns = prices.map_columns(simple_returns);
    let portfolio_returns =
        aggregate_returns(&returns, &weights).map_err(|e| frame_error("portfolio", e))?;
    let portfolio_dates = portfolio_returns.dates().to_vec();

    let aligned_weights = weights.reindex(returns.dates());
    let instruments = returns
        .columns()
        .iter()
        .map(|column| {
            tracing::debug!(instrument = %column.name, "computing metrics");
            InstrumentRun {
                name: column.name.clone(),
                prices: prices.column(&column.name).map(<[f64]>::to_vec).unwrap_or_default(),
                weights: aligned_weights
                    .column(&column.name)
                    .map(<[f64]>::to_vec)
                    .unwrap_or_else(|| vec![f64::NAN; returns.len()]),
                metrics: MetricsFrame::compute(returns.dates(), &column.values, metrics),
            }
        })
        .collect();

    let portfolio_series = portfolio_returns.columns().first().map(|c| c.values.as_slice()).unwrap_or_default();
    let portfolio = MetricsFrame::compute(&portfolio_dates, portfolio_series, metrics);

    Ok(PortfolioRun {
        portfolio_weight: weights.reindex(&portfolio_dates).row_sum(),
        portfolio_price: prices.reindex(&portfolio_dates).row_sum(),
        prices,
        returns,
        weights,
        portfolio_returns,
        instruments,
        portfolio,
        adjusted: None,
    })
}

/// Static-weight pipeline over already-loaded tables.
pub fn run_static(
    prices: &Frame,
    weight_table: &Frame,
    instruments: &[String],
    equal_allocation: bool,
    metrics: &MetricsConfig,
) -> Result<PortfolioRun, RiskplotError> {
    let prices = prices.select(instruments);
    let weights = static_weights(weight_table, instruments, equal_allocation);
    let mut run = assemble(prices, weights, metrics)?;

    // instrument pages show the table weights before 1/N scaling
    let table_weights = weight_table.select(instruments).reindex(run.returns.dates());
    for instrument in &mut run.instruments {
        if let Some(values) = table_weights.column(&instrument.name) {
            instrument.weights = values.to_vec();
        }
    }
    Ok(run)
}

/// Forward-adjusted prices for `instruments` from the backward-adjusted long
/// table and the raw contract table.
pub fn forward_adjusted_prices(
    backward: &[ContractRecord],
    contracts: &[ContractRecord],
    instruments: &[String],
) -> Result<Frame, RiskplotError> {
    let wide = pivot_closes(backward, instruments).map_err(|e| frame_error("adjusted", e))?;
    let relevant: Vec<ContractRecord> = contracts
        .iter()
        .filter(|r| instruments.contains(&r.name))
        .cloned()
        .collect();
    let firsts = first_prices(&relevant);
    tracing::info!(instruments = firsts.len(), "derived first prices");
    forward_adjust(&wide, &firsts).map_err(|e| frame_error("adjusted", e))
}

/// Inverse-volatility pipeline over forward-adjusted prices.
pub fn run_vol_scaled(
    adjusted: &Frame,
    budgets: &RiskBudget,
    vol: &VolEstimator,
    metrics: &MetricsConfig,
) -> Result<PortfolioRun, RiskplotError> {
    let returns = adjusted.map_columns(simple_returns);
    let vols = returns.map_columns(|r| vol.estimate(r));
    let weights = inverse_vol_weights(&vols, budgets).map_err(|e| frame_error("weights", e))?;

    let mut run = assemble(adjusted.clone(), weights, metrics)?;
    run.adjusted = Some(adjusted.clone());
    Ok(run)
}

/// Load inputs through `data_port` and run the configured pipeline.
pub fn execute(data_port: &dyn DataPort, config: &RunConfig) -> Result<PortfolioRun, RiskplotError> {
    validate_instruments(&config.instruments)?;
    match config.pipeline {
        PipelineKind::Static => {
            tracing::info!(table = %config.tables.prices, "loading prices");
            let prices = data_port.load_wide(&config.tables.prices)?;
            tracing::info!(table = %config.tables.weights, "loading weights");
            let weight_table = data_port.load_wide(&config.tables.weights)?;

            let instruments = if config.instruments.is_empty() {
                prices.column_names()
            } else {
                config.instruments.clone()
            };
            require_columns(&prices, &config.tables.prices, &instruments)?;
            require_columns(&weight_table, &config.tables.weights, &instruments)?;

            let prices = prices.filter_dates(config.start_date, config.end_date);
            let weight_table = weight_table.filter_dates(config.start_date, config.end_date);
            require_rows(
                &prices.select(&instruments),
                &config.tables.prices,
                "no observations for the configured instruments and date range",
            )?;
            require_rows(
                &weight_table.select(&instruments).reindex(prices.dates()),
                &config.tables.weights,
                "no weights on the price dates in the configured date range",
            )?;

            tracing::info!(
                instruments = instruments.len(),
                rows = prices.len(),
                "running static-weight pipeline"
            );
            run_static(
                &prices,
                &weight_table,
                &instruments,
                config.equal_allocation,
                &config.metrics,
            )
        }
        PipelineKind::Futures => {
            tracing::info!(table = %config.tables.adjusted, "loading backward-adjusted series");
            let backward = data_port.load_long(&config.tables.adjusted, &config.long_columns)?;
            tracing::info!(table = %config.tables.contracts, "loading contract records");
            let contracts = data_port.load_long(&config.tables.contracts, &config.long_columns)?;

            for name in &config.instruments {
                if !backward.iter().any(|r| &r.name == name) {
                    return Err(RiskplotError::NoData {
                        table: config.tables.adjusted.clone(),
                        reason: format!("no rows for instrument {}", name),
                    });
                }
            }

            let adjusted = forward_adjusted_prices(&backward, &contracts, &config.instruments)?
                .filter_dates(config.start_date, config.end_date);
            require_rows(
                &adjusted,
                &config.tables.adjusted,
                "no forward-adjusted observations in the configured date range",
            )?;

            tracing::info!(
                instruments = adjusted.columns().len(),
                rows = adjusted.len(),
                vol = %config.vol,
                "running volatility-scaled pipeline"
            );
            run_vol_scaled(&adjusted, &config.risk_budget, &config.vol, &config.metrics)
        }
    }
}

/// Derived tables of a data-preparation pass.
#[derive(Debug, Clone)]
pub struct PreparedTables {
    pub returns: Frame,
    pub weights: Frame,
    pub portfolio_value: Frame,
}

/// Returns, equal 1/N weights on the returns index, and the resulting
/// portfolio return series.
pub fn prepare_tables(prices: &Frame) -> Result<PreparedTables, RiskplotError> {
    let returns = prices.map_columns(simple_returns);
    let weights = equal_weights(returns.dates(), &prices.column_names())
        .map_err(|e| frame_error("weights", e))?;
    let portfolio_value =
        aggregate_returns(&returns, &weights).map_err(|e| frame_error("portfolio", e))?;
    Ok(PreparedTables {
        returns,
        weights,
        portfolio_value,
    })
}

/// Write the derived tables of a run through `sink`.
pub fn persist(sink: &dyn DataPort, run: &PortfolioRun) -> Result<(), RiskplotError> {
    sink.store_wide(RETURNS_TABLE, &run.returns)?;
    sink.store_wide(WEIGHTS_TABLE, &run.weights)?;
    sink.store_wide(PORTFOLIO_TABLE, &run.portfolio_returns)?;
    if let Some(adjusted) = &run.adjusted {
        sink.store_wide(ADJUSTED_TABLE, adjusted)?;
    }
    Ok(())
}
