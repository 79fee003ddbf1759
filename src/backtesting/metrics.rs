//! Metric computation, per-class aggregation and baseline comparison

use crate::models::BacktestMetrics;
use crate::utils::{mean, round2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Aggregated backtest metrics for one ABC class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub classe_abc: String,
    pub avg_mape: f64,
    pub avg_mae: f64,
    pub avg_rmse: f64,
    pub avg_bias: f64,
    pub product_count: usize,
}

/// Comparison of a model's metrics against the moving-average baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub produto_id: String,
    pub model_name: String,
    pub model_mape: f64,
    pub baseline_mape: f64,
    /// baseline MAPE minus model MAPE; positive means the model is better
    pub mape_improvement: f64,
    pub model_beats_baseline: bool,
}

/// Compute accuracy metrics for a holdout window.
///
/// MAPE is averaged only over holdout points with nonzero actuals; an
/// all-zero holdout yields MAPE = 0.0 by policy, never NaN.
pub fn compute_metrics(actual: &[f64], predicted: &[f64]) -> BacktestMetrics {
    let errors: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| a - p)
        .collect();
    let abs_errors: Vec<f64> = errors.iter().map(|e| e.abs()).collect();

    let pct_errors: Vec<f64> = actual
        .iter()
        .zip(&abs_errors)
        .filter(|(a, _)| **a != 0.0)
        .map(|(a, e)| e / a.abs() * 100.0)
        .collect();
    let mape = if pct_errors.is_empty() { 0.0 } else { mean(&pct_errors) };

    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / errors.len().max(1) as f64;

    BacktestMetrics {
        mape: round2(mape),
        mae: round2(mean(&abs_errors)),
        rmse: round2(mse.sqrt()),
        bias: round2(mean(&errors)),
    }
}

/// Baseline forecast: trailing moving average of the training prefix,
/// held constant across the holdout horizon.
///
/// If the window exceeds the available training length, all training
/// points are used.
pub fn moving_average_forecast(series: &[f64], holdout_weeks: usize, window: usize) -> Vec<f64> {
    let train = &series[..series.len() - holdout_weeks];
    let effective_window = window.min(train.len());
    let ma_value = mean(&train[train.len() - effective_window..]);
    vec![ma_value; holdout_weeks]
}

/// Compute backtest metrics for the moving-average baseline
pub fn compute_baseline_metrics(
    series: &[f64],
    holdout_weeks: usize,
    window: usize,
) -> BacktestMetrics {
    let actual = &series[series.len() - holdout_weeks..];
    let predicted = moving_average_forecast(series, holdout_weeks, window);
    compute_metrics(actual, &predicted)
}

/// Aggregate per-product metrics by ABC class, averaging each field.
///
/// Products with no known class default to class "C". One entry per
/// observed class, sorted by class label.
pub fn aggregate_by_class(
    per_product_metrics: &HashMap<String, BacktestMetrics>,
    class_by_product: &HashMap<String, String>,
) -> BTreeMap<String, ClassMetrics> {
    let mut buckets: BTreeMap<String, Vec<BacktestMetrics>> = BTreeMap::new();

    for (pid, m) in per_product_metrics {
        let cls = class_by_product
            .get(pid)
            .cloned()
            .unwrap_or_else(|| "C".to_string());
        buckets.entry(cls).or_default().push(*m);
    }

    buckets
        .into_iter()
        .map(|(cls, metrics)| {
            let n = metrics.len();
            let class_metrics = ClassMetrics {
                classe_abc: cls.clone(),
                avg_mape: round2(metrics.iter().map(|m| m.mape).sum::<f64>() / n as f64),
                avg_mae: round2(metrics.iter().map(|m| m.mae).sum::<f64>() / n as f64),
                avg_rmse: round2(metrics.iter().map(|m| m.rmse).sum::<f64>() / n as f64),
                avg_bias: round2(metrics.iter().map(|m| m.bias).sum::<f64>() / n as f64),
                product_count: n,
            };
            (cls, class_metrics)
        })
        .collect()
}

/// Compare model metrics against baseline metrics per product.
///
/// Products missing from the baseline are silently skipped.
pub fn compare_against_baseline(
    model_metrics: &HashMap<String, BacktestMetrics>,
    baseline_metrics: &HashMap<String, BacktestMetrics>,
    model_name: &str,
) -> Vec<BaselineComparison> {
    let mut pids: Vec<&String> = model_metrics.keys().collect();
    pids.sort();

    pids.into_iter()
        .filter_map(|pid| {
            let m = model_metrics[pid];
            let b = baseline_metrics.get(pid)?;
            let improvement = b.mape - m.mape;
            Some(BaselineComparison {
                produto_id: pid.clone(),
                model_name: model_name.to_string(),
                model_mape: m.mape,
                baseline_mape: b.mape,
                mape_improvement: round2(improvement),
                model_beats_baseline: improvement > 0.0,
            })
        })
        .collect()
}
