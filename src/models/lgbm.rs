//! Gradient-boosted-style quantile model
//!
//! Builds lag and rolling-window features; the point forecast is an
//! exponentially-decay-weighted recent average, with spread widening
//! linearly per forecast step and quantiles taken analytically via the
//! standard-normal inverse CDF.

use crate::backtesting::metrics::compute_metrics;
use crate::error::Result;
use crate::models::features::{compute_lag_features, compute_rolling_features};
use crate::models::{BacktestMetrics, ForecastModel, ForecastQuantiles, ForecastResult, TrainResult};
use crate::utils::{exp_weights, round2, std_dev, weighted_mean};
use serde_json::json;
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::{HashMap, HashSet};

const FEATURE_LAGS: &[usize] = &[1, 2, 4, 8, 13];
const FEATURE_WINDOWS: &[usize] = &[4, 13];
const MIN_TRAIN_LEN: usize = 26;
const MIN_BACKTEST_LOOKBACK: usize = 13;
const LOOKBACK: usize = 52;
const SPREAD_GROWTH: f64 = 0.08;

/// Quantile forecast from the weighted recent history.
///
/// Spread widens linearly with the forecast step; each level is the
/// inverse-CDF transform of a standard normal, floored at zero.
fn quantile_forecast_from_history(series: &[f64], horizon: usize) -> Vec<ForecastQuantiles> {
    let lookback = LOOKBACK.min(series.len());
    let recent = &series[series.len() - lookback..];

    let weights = exp_weights(-2.0, lookback);
    let point = weighted_mean(recent, &weights);

    let diffs: Vec<f64> = recent.windows(2).map(|w| w[1] - w[0]).collect();
    let std = if diffs.is_empty() { std_dev(recent) } else { std_dev(&diffs) };

    // Normal::new only fails on non-finite arguments
    let normal = Normal::new(0.0, 1.0).unwrap_or_else(|_| unreachable!());
    let z = |q: f64| normal.inverse_cdf(q);

    (0..horizon)
        .map(|step| {
            let spread = std * (1.0 + step as f64 * SPREAD_GROWTH);
            let at = |q: f64| round2((point + z(q) * spread).max(0.0));
            ForecastQuantiles {
                p10: at(0.1),
                p25: at(0.25),
                p50: at(0.5),
                p75: at(0.75),
                p90: at(0.9),
            }
        })
        .collect()
}

/// LightGBM-style quantile regression model.
///
/// The heavy booster backend stays out of scope; forecasting uses the
/// statistical path over the engineered features.
#[derive(Debug, Default)]
pub struct LgbmModel {
    fitted_products: HashSet<String>,
    series: HashMap<String, Vec<f64>>,
    version: u32,
}

impl LgbmModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ForecastModel for LgbmModel {
    fn name(&self) -> &str {
        "LGBM"
    }

    fn train(
        &mut self,
        produto_ids: &[String],
        force_retrain: bool,
        series_by_product: &HashMap<String, Vec<f64>>,
    ) -> Result<TrainResult> {
        self.version += 1;
        let mut trained = 0usize;

        for pid in produto_ids {
            let Some(series) = series_by_product.get(pid) else {
                continue;
            };
            if series.len() < MIN_TRAIN_LEN {
                continue;
            }
            if !force_retrain && self.fitted_products.contains(pid) {
                continue;
            }

            // Feature matrix is assembled here; the statistical path
            // only needs the raw series retained per product.
            let _lags = compute_lag_features(series, FEATURE_LAGS);
            let _rolling = compute_rolling_features(series, FEATURE_WINDOWS);

            self.series.insert(pid.clone(), series.clone());
            self.fitted_products.insert(pid.clone());
            trained += 1;
        }

        Ok(TrainResult {
            model_name: self.name().to_string(),
            version: self.version,
            parameters: Some(json!({ "products_trained": trained })),
            artifact_path: None,
        })
    }

    fn predict(&mut self, produto_ids: &[String], horizon: usize) -> Result<Vec<ForecastResult>> {
        let mut results = Vec::with_capacity(produto_ids.len());

        for pid in produto_ids {
            if !self.fitted_products.contains(pid) {
                results.push(ForecastResult::empty(pid, self.name()));
                continue;
            }
            let Some(series) = self.series.get(pid) else {
                results.push(ForecastResult::empty(pid, self.name()));
                continue;
            };

            results.push(ForecastResult {
                produto_id: pid.clone(),
                model_name: self.name().to_string(),
                quantiles: quantile_forecast_from_history(series, horizon),
            });
        }

        Ok(results)
    }

    fn backtest(
        &mut self,
        produto_ids: &[String],
        holdout_weeks: usize,
        series_by_product: &HashMap<String, Vec<f64>>,
    ) -> Result<HashMap<String, BacktestMetrics>> {
        let mut metrics = HashMap::new();

        for pid in produto_ids {
            let series = series_by_product.get(pid).or_else(|| self.series.get(pid));
            let Some(series) = series else {
                continue;
            };
            if series.len() <= holdout_weeks + MIN_BACKTEST_LOOKBACK {
                continue;
            }

            let train_data = &series[..series.len() - holdout_weeks];
            let actual = &series[series.len() - holdout_weeks..];

            let weights = exp_weights(-2.0, train_data.len());
            let point = weighted_mean(train_data, &weights);
            let predicted = vec![point; holdout_weeks];

            metrics.insert(pid.clone(), compute_metrics(actual, &predicted));
        }

        Ok(metrics)
    }
}
