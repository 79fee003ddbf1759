//! Croston-family models (Croston, SBA, TSB) for intermittent and lumpy demand

use crate::backtesting::metrics::compute_metrics;
use crate::error::Result;
use crate::models::{BacktestMetrics, ForecastModel, ForecastQuantiles, ForecastResult, TrainResult};
use crate::utils::{mean, percentile, round2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::collections::HashMap;

/// Number of simulated paths used for bootstrap quantile estimation
pub const N_BOOTSTRAP_PATHS: usize = 1000;

const MIN_SERIES_LEN: usize = 4;

/// Croston variant selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrostonVariant {
    Classic,
    /// Syntetos-Boylan approximation: bias-corrected demand estimate
    Sba,
    /// Teunter-Syntetos-Babai: smooths demand probability instead of intervals
    Tsb,
}

/// Fit the Croston decomposition: demand size and inter-demand interval,
/// each smoothed with the same constant. Returns (demand, interval).
fn croston_fit(series: &[f64], alpha: f64, variant: CrostonVariant) -> (f64, f64) {
    let mut demand_times: Vec<usize> = Vec::new();
    let mut demand_sizes: Vec<f64> = Vec::new();

    for (i, &val) in series.iter().enumerate() {
        if val > 0.0 {
            demand_times.push(i);
            demand_sizes.push(val);
        }
    }

    if demand_sizes.len() < 2 {
        let mean_demand = if demand_sizes.is_empty() { 0.0 } else { mean(&demand_sizes) };
        return (mean_demand, series.len() as f64);
    }

    let intervals: Vec<f64> = demand_times
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64)
        .collect();

    let mut z_hat = demand_sizes[0];
    let mut p_hat = if intervals.is_empty() { 1.0 } else { intervals[0] };

    for (i, &interval) in intervals.iter().enumerate() {
        z_hat = alpha * demand_sizes[i + 1] + (1.0 - alpha) * z_hat;
        p_hat = alpha * interval + (1.0 - alpha) * p_hat;
    }

    if variant == CrostonVariant::Sba {
        z_hat *= 1.0 - alpha / 2.0;
    }

    (z_hat, p_hat.max(1.0))
}

/// Fit TSB: demand size plus demand probability, smoothed independently.
/// Returns (demand, probability).
fn tsb_fit(series: &[f64], alpha_d: f64, alpha_p: f64) -> (f64, f64) {
    let demand_sizes: Vec<f64> = series.iter().copied().filter(|v| *v > 0.0).collect();

    if demand_sizes.len() < 2 {
        let mean_d = if demand_sizes.is_empty() { 0.0 } else { mean(&demand_sizes) };
        let prob = series.iter().filter(|v| **v > 0.0).count() as f64 / series.len().max(1) as f64;
        return (mean_d, prob);
    }

    let mut z_hat = demand_sizes[0];
    let mut p_hat = 1.0;

    for &val in &series[1..] {
        if val > 0.0 {
            z_hat = alpha_d * val + (1.0 - alpha_d) * z_hat;
            p_hat = alpha_p + (1.0 - alpha_p) * p_hat;
        } else {
            p_hat *= 1.0 - alpha_p;
        }
    }

    (z_hat, p_hat.max(0.001))
}

/// Bootstrap quantile forecasts: resample historical non-zero demand
/// sizes combined with the historical zero-occurrence rate, then take
/// empirical percentiles per horizon step.
fn bootstrap_quantiles(
    series: &[f64],
    horizon: usize,
    n_paths: usize,
    rng: &mut StdRng,
) -> Vec<ForecastQuantiles> {
    let nonzero: Vec<f64> = series.iter().copied().filter(|v| *v > 0.0).collect();
    let zero_fraction =
        series.iter().filter(|v| **v == 0.0).count() as f64 / series.len().max(1) as f64;

    if nonzero.is_empty() {
        return vec![ForecastQuantiles::point(0.0); horizon];
    }

    let mut simulated = vec![vec![0.0f64; n_paths]; horizon];
    for path in 0..n_paths {
        for step in simulated.iter_mut() {
            let occurs = rng.gen::<f64>() >= zero_fraction;
            if occurs {
                let demand = nonzero[rng.gen_range(0..nonzero.len())];
                step[path] = demand;
            }
        }
    }

    simulated
        .iter()
        .map(|col| ForecastQuantiles {
            p10: round2(percentile(col, 10.0)),
            p25: round2(percentile(col, 25.0)),
            p50: round2(percentile(col, 50.0)),
            p75: round2(percentile(col, 75.0)),
            p90: round2(percentile(col, 90.0)),
        })
        .collect()
}

/// Croston's method for intermittent demand, with SBA and TSB variants.
///
/// Decomposes demand into inter-demand intervals (or demand probability
/// for TSB) and demand sizes, smoothing each component separately.
pub struct CrostonModel {
    variant: CrostonVariant,
    alpha: f64,
    n_bootstrap_paths: usize,
    rng: StdRng,
    fitted: HashMap<String, (f64, f64)>,
    series: HashMap<String, Vec<f64>>,
    version: u32,
}

impl CrostonModel {
    pub fn new(variant: CrostonVariant, alpha: f64, seed: u64) -> Self {
        Self {
            variant,
            alpha,
            n_bootstrap_paths: N_BOOTSTRAP_PATHS,
            rng: StdRng::seed_from_u64(seed),
            fitted: HashMap::new(),
            series: HashMap::new(),
            version: 0,
        }
    }

    fn fit(&self, series: &[f64]) -> (f64, f64) {
        match self.variant {
            CrostonVariant::Tsb => tsb_fit(series, self.alpha, self.alpha),
            _ => croston_fit(series, self.alpha, self.variant),
        }
    }

    fn point_forecast(&self, z_hat: f64, p_hat: f64) -> f64 {
        match self.variant {
            CrostonVariant::Tsb => z_hat * p_hat,
            _ => z_hat / p_hat,
        }
    }
}

impl ForecastModel for CrostonModel {
    fn name(&self) -> &str {
        match self.variant {
            CrostonVariant::Classic => "CROSTON",
            CrostonVariant::Sba => "SBA",
            CrostonVariant::Tsb => "TSB",
        }
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
            if series.len() < MIN_SERIES_LEN {
                continue;
            }

            self.series.insert(pid.clone(), series.clone());
            self.fitted.insert(pid.clone(), self.fit(series));
        }

        let variant = match self.variant {
            CrostonVariant::Classic => "CLASSIC",
            CrostonVariant::Sba => "SBA",
            CrostonVariant::Tsb => "TSB",
        };

        Ok(TrainResult {
            model_name: self.name().to_string(),
            version: self.version,
            parameters: Some(json!({ "variant": variant, "alpha": self.alpha })),
            artifact_path: None,
        })
    }

    fn predict(&mut self, produto_ids: &[String], horizon: usize) -> Result<Vec<ForecastResult>> {
        let mut results = Vec::with_capacity(produto_ids.len());

        for pid in produto_ids {
            let (Some(_), Some(series)) = (self.fitted.get(pid), self.series.get(pid)) else {
                results.push(ForecastResult::empty(pid, self.name()));
                continue;
            };

            let series = series.clone();
            let quantiles =
                bootstrap_quantiles(&series, horizon, self.n_bootstrap_paths, &mut self.rng);

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
            if series.len() <= holdout_weeks + MIN_SERIES_LEN {
                continue;
            }

            let train_data = &series[..series.len() - holdout_weeks];
            let actual = &series[series.len() - holdout_weeks..];

            let (z_hat, p_hat) = self.fit(train_data);
            let point = self.point_forecast(z_hat, p_hat);
            let predicted = vec![point; holdout_weeks];

            metrics.insert(pid.clone(), compute_metrics(actual, &predicted));
        }

        Ok(metrics)
    }
}
