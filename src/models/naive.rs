//! Naive forecast model: last-value repetition baseline

use crate::backtesting::metrics::compute_metrics;
use crate::error::Result;
use crate::models::{BacktestMetrics, ForecastModel, ForecastQuantiles, ForecastResult, TrainResult};
use crate::utils::{round2, std_dev};
use serde_json::json;
use std::collections::HashMap;

/// Naive forecast model using last-value repetition.
///
/// The last observed value is the point forecast for every horizon step.
/// Quantile spread comes from the standard deviation of a trailing
/// lookback window; zero spread collapses all quantiles to the point.
#[derive(Debug)]
pub struct NaiveModel {
    lookback: usize,
    fitted: HashMap<String, (f64, f64)>,
    version: u32,
}

impl NaiveModel {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback,
            fitted: HashMap::new(),
            version: 0,
        }
    }
}

impl ForecastModel for NaiveModel {
    fn name(&self) -> &str {
        "NAIVE"
    }

    fn train(
        &mut self,
        produto_ids: &[String],
        force_retrain: bool,
        series_by_product: &HashMap<String, Vec<f64>>,
    ) -> Result<TrainResult> {
        self.version += 1;

        for pid in produto_ids {
            if !force_retrain && self.fitted.contains_key(pid) {
                continue;
            }

            let Some(series) = series_by_product.get(pid) else {
                continue;
            };
            if series.is_empty() {
                continue;
            }

            let last_value = *series.last().unwrap_or(&0.0);
            let recent = if series.len() >= self.lookback {
                &series[series.len() - self.lookback..]
            } else {
                &series[..]
            };
            self.fitted.insert(pid.clone(), (last_value, std_dev(recent)));
        }

        Ok(TrainResult {
            model_name: self.name().to_string(),
            version: self.version,
            parameters: Some(json!({ "lookback": self.lookback })),
            artifact_path: None,
        })
    }

    fn predict(&mut self, produto_ids: &[String], horizon: usize) -> Result<Vec<ForecastResult>> {
        let mut results = Vec::with_capacity(produto_ids.len());

        for pid in produto_ids {
            let Some(&(last_value, std)) = self.fitted.get(pid) else {
                results.push(ForecastResult::empty(pid, self.name()));
                continue;
            };

            let quantiles: Vec<ForecastQuantiles> = (0..horizon)
                .map(|_| {
                    if std > 0.0 {
                        ForecastQuantiles {
                            p10: round2((last_value - 1.28 * std).max(0.0)),
                            p25: round2((last_value - 0.67 * std).max(0.0)),
                            p50: round2(last_value),
                            p75: round2(last_value + 0.67 * std),
                            p90: round2(last_value + 1.28 * std),
                        }
                    } else {
                        ForecastQuantiles::point(round2(last_value))
                    }
                })
                .collect();

            results.push(ForecastResult {
                produto_id: pid.clone(),
                model_name: self.name().to_string(),
                quantiles,
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
            let Some(series) = series_by_product.get(pid) else {
                continue;
            };
            if series.len() <= holdout_weeks {
                continue;
            }

            let train_data = &series[..series.len() - holdout_weeks];
            let actual = &series[series.len() - holdout_weeks..];
            let last = *train_data.last().unwrap_or(&0.0);
            let predicted = vec![last; holdout_weeks];

            metrics.insert(pid.clone(), compute_metrics(actual, &predicted));
        }

        Ok(metrics)
    }
}
