//! Trailing fixed-window statistics.
//!
//! Every function returns a vector as long as its input. Index `i` covers the
//! window `[i + 1 - window, i]`. The first `window - 1` outputs are `NaN`, as
//! is any output whose window contains a `NaN`. Nothing is zero-filled.

/// Apply `f` to each full trailing window without missing values.
pub fn rolling_apply<F>(values: &[f64], window: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    if window == 0 {
        return vec![f64::NAN; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return f64::NAN;
            }
            let slice = &values[i + 1 - window..=i];
            if slice.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                f(slice)
            }
        })
        .collect()
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, mean)
}

/// Sample standard deviation (n - 1 denominator). A one-observation window is `NaN`.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, sample_std)
}

/// Compounded growth over the window: prod(1 + r) - 1.
pub fn rolling_compounded(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |slice| {
        slice.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
    })
}

fn mean(slice: &[f64]) -> f64 {
    slice.iter().sum::<f64>() / slice.len() as f64
}

fn sample_std(slice: &[f64]) -> f64 {
    if slice.len() < 2 {
        return f64::NAN;
    }
    let m = mean(slice);
    let ss: f64 = slice
        .iter()
        .map(|v| {
            let diff = v - m;
            diff * diff
        })
        .sum();
    (ss / (slice.len() - 1) as f64).sqrt()
}
