//! Annualized volatility estimates from simple returns.

use super::rolling::rolling_std;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Default trailing window for position sizing.
pub const RISK_VOL_WINDOW: usize = 120;

/// Default trailing window for reported volatility and Sharpe.
pub const REPORT_WINDOW: usize = 252;

/// Rolling sample std of returns over `window`, scaled by sqrt(252).
pub fn rolling_volatility(returns: &[f64], window: usize) -> Vec<f64> {
    let scale = TRADING_DAYS_PER_YEAR.sqrt();
    rolling_std(returns, window)
        .into_iter()
        .map(|s| s * scale)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum VolEstimator {
    /// One trailing window.
    Single(usize),
    /// Equal-weighted mean of several single-window estimates. Undefined
    /// until the longest member window is full.
    Ensemble(Vec<usize>),
}

impl Default for VolEstimator {
    fn default() -> Self {
        VolEstimator::Single(RISK_VOL_WINDOW)
    }
}

impl VolEstimator {
    pub fn estimate(&self, returns: &[f64]) -> Vec<f64> {
        match self {
            VolEstimator::Single(window) => rolling_volatility(returns, *window),
            VolEstimator::Ensemble(windows) => ensemble_volatility(returns, windows),
        }
    }

    /// Longest window the estimator needs before it yields a value.
    pub fn warmup(&self) -> usize {
        match self {
            VolEstimator::Single(window) => *window,
            VolEstimator::Ensemble(windows) => windows.iter().copied().max().unwrap_or(0),
        }
    }
}

impl std::fmt::Display for VolEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolEstimator::Single(w) => write!(f, "rolling({})", w),
            VolEstimator::Ensemble(ws) => {
                let list: Vec<String> = ws.iter().map(|w| w.to_string()).collect();
                write!(f, "ensemble({})", list.join(","))
            }
        }
    }
}

fn ensemble_volatility(returns: &[f64], windows: &[usize]) -> Vec<f64> {
    if windows.is_empty() {
        return vec![f64::NAN; returns.len()];
    }

    let members: Vec<Vec<f64>> = windows
        .iter()
        .map(|&w| rolling_volatility(returns, w))
        .collect();

    (0..returns.len())
        .map(|i| {
            // NaN in any member makes the sum NaN
            let sum: f64 = members.iter().map(|m| m[i]).sum();
            sum / members.len() as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn alternating(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| if i % 2 == 0 { 0.01 } else { -0.01 })
            .collect()
    }

    #[test]
    fn rolling_volatility_is_annualized() {
        let returns = alternating(4);
        let vol = rolling_volatility(&returns, 4);
        let sample_std = (4.0 * 0.0001f64 / 3.0).sqrt();
        assert_relative_eq!(vol[3], sample_std * 252f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn rolling_volatility_warmup() {
        let vol = rolling_volatility(&alternating(10), 5);
        assert!(vol[..4].iter().all(|v| v.is_nan()));
        assert!(vol[4..].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn ensemble_waits_for_longest_window() {
        let returns = alternating(12);
        let est = VolEstimator::Ensemble(vec![4, 8]);
        let vol = est.estimate(&returns);

        assert!(vol[6].is_nan());
        assert!(vol[7].is_finite());
        assert_eq!(est.warmup(), 8);
    }

    #[test]
    fn ensemble_is_mean_of_members() {
        let returns: Vec<f64> = (0..20).map(|i| ((i * 7) % 5) as f64 / 100.0 - 0.02).collect();
        let ensemble = VolEstimator::Ensemble(vec![5, 10]).estimate(&returns);
        let short = rolling_volatility(&returns, 5);
        let long = rolling_volatility(&returns, 10);

        for i in 9..20 {
            assert_relative_eq!(ensemble[i], (short[i] + long[i]) / 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn single_estimator_matches_rolling_volatility() {
        let returns = alternating(8);
        assert_eq!(
            VolEstimator::Single(3).estimate(&returns)[5],
            rolling_volatility(&returns, 3)[5]
        );
    }

    #[test]
    fn display_names_windows() {
        assert_eq!(VolEstimator::Single(120).to_string(), "rolling(120)");
        assert_eq!(
            VolEstimator::Ensemble(vec![20, 60]).to_string(),
            "ensemble(20,60)"
        );
    }
}
