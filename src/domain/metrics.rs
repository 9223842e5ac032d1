//! Performance diagnostics over a single return series.
//!
//! [`MetricsFrame::compute`] is used for every instrument and for the
//! aggregated portfolio alike; the only inputs are a date index, the return
//! series and a [`MetricsConfig`].

use super::rolling::{rolling_compounded, rolling_mean, rolling_std};
use super::volatility::{rolling_volatility, REPORT_WINDOW, TRADING_DAYS_PER_YEAR};
use chrono::NaiveDate;

/// How the running sum of returns is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CumulativeConvention {
    /// Plain running sum, starting near 0.
    #[default]
    Sum,
    /// Running sum + 1.0, read as a price-index level.
    IndexLevel,
}

impl CumulativeConvention {
    pub fn offset(self) -> f64 {
        match self {
            CumulativeConvention::Sum => 0.0,
            CumulativeConvention::IndexLevel => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    pub window: usize,
    pub cumulative: CumulativeConvention,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window: REPORT_WINDOW,
            cumulative: CumulativeConvention::Sum,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsFrame {
    pub dates: Vec<NaiveDate>,
    pub returns: Vec<f64>,
    pub cumulative: Vec<f64>,
    pub running_max: Vec<f64>,
    pub drawdown: Vec<f64>,
    pub rolling_sharpe: Vec<f64>,
    pub rolling_vol: Vec<f64>,
    pub rolling_return: Vec<f64>,
}

impl MetricsFrame {
    pub fn compute(dates: &[NaiveDate], returns: &[f64], config: &MetricsConfig) -> Self {
        let cumulative = cumulative_return(returns, config.cumulative);
        let running_max = running_max(&cumulative);
        let drawdown = drawdown(&cumulative, &running_max);

        MetricsFrame {
            dates: dates.to_vec(),
            returns: returns.to_vec(),
            rolling_sharpe: rolling_sharpe(returns, config.window),
            rolling_vol: rolling_volatility(returns, config.window),
            rolling_return: rolling_compounded(returns, config.window),
            cumulative,
            running_max,
            drawdown,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            final_cumulative: last_defined(&self.cumulative),
            max_drawdown: self
                .drawdown
                .iter()
                .copied()
                .filter(|v| v.is_finite())
                .fold(f64::NAN, f64::min),
            last_sharpe: last_defined(&self.rolling_sharpe),
            last_vol: last_defined(&self.rolling_vol),
        }
    }
}

/// Headline numbers for the console summary. `NaN` when never defined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSummary {
    pub final_cumulative: f64,
    pub max_drawdown: f64,
    pub last_sharpe: f64,
    pub last_vol: f64,
}

fn last_defined(values: &[f64]) -> f64 {
    values
        .iter()
        .rev()
        .copied()
        .find(|v| !v.is_nan())
        .unwrap_or(f64::NAN)
}

/// p(t) / p(t-1) - 1; `NaN` at the start and next to missing prices.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(prices.len());
    if prices.is_empty() {
        return out;
    }
    out.push(f64::NAN);
    out.extend(prices.windows(2).map(|w| w[1] / w[0] - 1.0));
    out
}

/// Running sum of returns plus the convention's offset. `NaN` inputs are
/// skipped by the sum and stay `NaN` in the output.
pub fn cumulative_return(returns: &[f64], convention: CumulativeConvention) -> Vec<f64> {
    let offset = convention.offset();
    let mut acc = 0.0;
    returns
        .iter()
        .map(|&r| {
            if r.is_nan() {
                f64::NAN
            } else {
                acc += r;
                acc + offset
            }
        })
        .collect()
}

/// Maximum to date, skipping `NaN`; `NaN` inputs stay `NaN`.
pub fn running_max(values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                f64::NAN
            } else {
                peak = peak.max(v);
                peak
            }
        })
        .collect()
}

/// (cumulative / running max - 1) * 100.
pub fn drawdown(cumulative: &[f64], running_max: &[f64]) -> Vec<f64> {
    cumulative
        .iter()
        .zip(running_max)
        .map(|(c, m)| (c / m - 1.0) * 100.0)
        .collect()
}

/// Rolling mean / rolling sample std, scaled by sqrt(252).
pub fn rolling_sharpe(returns: &[f64], window: usize) -> Vec<f64> {
    let scale = TRADING_DAYS_PER_YEAR.sqrt();
    rolling_mean(returns, window)
        .into_iter()
        .zip(rolling_std(returns, window))
        .map(|(m, s)| m / s * scale)
        .collect()
}
