//! Numeric helper functions shared across models and backtesting

/// Round a value to two decimal places (output boundary convention)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round a value to four decimal places (used for promotion MAPE audit)
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (ddof = 0); 0.0 for an empty slice
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Empirical percentile with linear interpolation between order statistics.
///
/// `p` is in percent (0..=100). Input does not need to be sorted.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// `n` evenly spaced values from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![end],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Exponential weights over `n` points, normalized to sum to 1.
///
/// Weights follow exp(linspace(lo, 0, n)), so the most recent point
/// carries the largest weight.
pub fn exp_weights(lo: f64, n: usize) -> Vec<f64> {
    let mut weights: Vec<f64> = linspace(lo, 0.0, n).into_iter().map(f64::exp).collect();
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        for w in &mut weights {
            *w /= total;
        }
    }
    weights
}

/// Mean of `values` under the given (already normalized) weights
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    values.iter().zip(weights).map(|(v, w)| v * w).sum()
}

/// Weighted population standard deviation around the weighted mean
pub fn weighted_std(values: &[f64], weights: &[f64]) -> f64 {
    let wm = weighted_mean(values, weights);
    let variance: f64 = values
        .iter()
        .zip(weights)
        .map(|(v, w)| w * (v - wm).powi(2))
        .sum();
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_linearly() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 50.0), 2.5);
        assert_eq!(percentile(&values, 100.0), 4.0);
    }

    #[test]
    fn exp_weights_sum_to_one_and_favor_recent() {
        let w = exp_weights(-2.0, 10);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(w[9] > w[0]);
    }

    #[test]
    fn std_dev_is_population() {
        // numpy ddof=0: std([1, 3]) == 1.0
        assert_eq!(std_dev(&[1.0, 3.0]), 1.0);
    }
}
