//! ETS (Holt-Winters exponential smoothing) forecast model
//!
//! Selects additive vs multiplicative seasonality by AIC comparison over
//! a small candidate set, conditioned on having at least two full
//! seasonal cycles. Quantiles come from residual-bootstrap Monte Carlo
//! simulation, floored at zero.

use crate::backtesting::metrics::compute_metrics;
use crate::error::Result;
use crate::models::{BacktestMetrics, ForecastModel, ForecastQuantiles, ForecastResult, TrainResult};
use crate::utils::{mean, percentile, round2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::collections::HashMap;

/// Number of Monte Carlo simulation paths for quantile estimation
pub const N_SIMULATION_PATHS: usize = 1000;

const MIN_SERIES_LEN: usize = 4;

// Fixed smoothing constants; variant structure is what gets selected.
const ALPHA: f64 = 0.2;
const BETA: f64 = 0.1;
const GAMMA: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seasonal {
    None,
    Additive,
    Multiplicative,
}

impl Seasonal {
    fn as_str(&self) -> &'static str {
        match self {
            Seasonal::None => "none",
            Seasonal::Additive => "add",
            Seasonal::Multiplicative => "mul",
        }
    }
}

/// Fitted Holt-Winters state at the end of the series
#[derive(Debug, Clone)]
struct EtsFit {
    seasonal: Seasonal,
    period: usize,
    level: f64,
    trend: f64,
    seasonals: Vec<f64>,
    residuals: Vec<f64>,
    aic: f64,
    n: usize,
}

impl EtsFit {
    fn forecast(&self, horizon: usize) -> Vec<f64> {
        (0..horizon)
            .map(|i| {
                let drift = self.level + (i + 1) as f64 * self.trend;
                match self.seasonal {
                    Seasonal::None => drift,
                    Seasonal::Additive => drift + self.seasonals[(self.n + i) % self.period],
                    Seasonal::Multiplicative => drift * self.seasonals[(self.n + i) % self.period],
                }
            })
            .collect()
    }
}

/// Holt's linear trend method (no seasonality)
fn fit_holt(series: &[f64]) -> EtsFit {
    let n = series.len();
    let mut level = series[0];
    let mut trend = if n > 1 { series[1] - series[0] } else { 0.0 };

    let mut residuals = Vec::with_capacity(n);
    residuals.push(0.0);

    for &x in &series[1..] {
        let fitted = level + trend;
        residuals.push(x - fitted);

        let last_level = level;
        level = ALPHA * x + (1.0 - ALPHA) * (level + trend);
        trend = BETA * (level - last_level) + (1.0 - BETA) * trend;
    }

    let aic = compute_aic(&residuals, 4);
    EtsFit {
        seasonal: Seasonal::None,
        period: 1,
        level,
        trend,
        seasonals: vec![0.0],
        residuals,
        aic,
        n,
    }
}

/// Holt-Winters with additive trend and the given seasonal mode.
///
/// Returns None when the multiplicative recursion is numerically
/// untenable (non-positive values).
fn fit_holt_winters(series: &[f64], period: usize, seasonal: Seasonal) -> Option<EtsFit> {
    let n = series.len();
    if n < 2 * period {
        return None;
    }
    if seasonal == Seasonal::Multiplicative && series.iter().any(|v| *v <= 0.0) {
        return None;
    }

    let first_season = mean(&series[..period]);
    let second_season = mean(&series[period..2 * period]);

    let mut level = first_season;
    let mut trend = (second_season - first_season) / period as f64;
    let mut seasonals: Vec<f64> = match seasonal {
        Seasonal::Additive => series[..period].iter().map(|x| x - first_season).collect(),
        Seasonal::Multiplicative => {
            if first_season.abs() < f64::EPSILON {
                return None;
            }
            series[..period].iter().map(|x| x / first_season).collect()
        }
        Seasonal::None => unreachable!(),
    };

    let mut residuals = Vec::with_capacity(n);

    for (t, &x) in series.iter().enumerate() {
        let s = seasonals[t % period];
        let (fitted, deseasonalized) = match seasonal {
            Seasonal::Additive => (level + trend + s, x - s),
            Seasonal::Multiplicative => {
                if s.abs() < f64::EPSILON {
                    return None;
                }
                ((level + trend) * s, x / s)
            }
            Seasonal::None => unreachable!(),
        };
        residuals.push(x - fitted);

        let last_level = level;
        level = ALPHA * deseasonalized + (1.0 - ALPHA) * (level + trend);
        trend = BETA * (level - last_level) + (1.0 - BETA) * trend;

        seasonals[t % period] = match seasonal {
            Seasonal::Additive => GAMMA * (x - level) + (1.0 - GAMMA) * s,
            Seasonal::Multiplicative => {
                if level.abs() < f64::EPSILON {
                    return None;
                }
                GAMMA * (x / level) + (1.0 - GAMMA) * s
            }
            Seasonal::None => unreachable!(),
        };
    }

    let aic = compute_aic(&residuals, 4 + period);
    Some(EtsFit {
        seasonal,
        period,
        level,
        trend,
        seasonals,
        residuals,
        aic,
        n,
    })
}

/// AIC on the gaussian likelihood approximation: n ln(SSE/n) + 2k
fn compute_aic(residuals: &[f64], k: usize) -> f64 {
    let n = residuals.len().max(1) as f64;
    let sse: f64 = residuals.iter().map(|r| r * r).sum();
    n * (sse.max(1e-10) / n).ln() + 2.0 * k as f64
}

/// Fit the best variant by AIC over the candidate set.
///
/// With at least two full cycles the candidates are additive and
/// multiplicative seasonality; otherwise plain Holt.
fn select_variant(series: &[f64], seasonal_periods: usize) -> EtsFit {
    if series.len() >= 2 * seasonal_periods {
        let candidates = [
            fit_holt_winters(series, seasonal_periods, Seasonal::Additive),
            fit_holt_winters(series, seasonal_periods, Seasonal::Multiplicative),
        ];
        if let Some(best) = candidates
            .into_iter()
            .flatten()
            .min_by(|a, b| a.aic.partial_cmp(&b.aic).unwrap_or(std::cmp::Ordering::Equal))
        {
            return best;
        }
    }
    fit_holt(series)
}

/// ETS (Error-Trend-Seasonality / Holt-Winters) forecast model
pub struct EtsModel {
    seasonal_periods: usize,
    n_sim_paths: usize,
    rng: StdRng,
    fitted: HashMap<String, EtsFit>,
    version: u32,
}

impl EtsModel {
    pub fn new(seasonal_periods: usize, seed: u64) -> Self {
        Self {
            seasonal_periods,
            n_sim_paths: N_SIMULATION_PATHS,
            rng: StdRng::seed_from_u64(seed),
            fitted: HashMap::new(),
            version: 0,
        }
    }

    /// Residual-bootstrap quantiles around the point forecast, floored
    /// at zero (demand cannot be negative).
    fn simulate_quantiles(&mut self, fit: &EtsFit, horizon: usize) -> Vec<ForecastQuantiles> {
        let forecast = fit.forecast(horizon);
        let residuals: Vec<f64> = fit
            .residuals
            .iter()
            .copied()
            .filter(|r| r.is_finite())
            .collect();

        if residuals.is_empty() {
            return forecast
                .iter()
                .map(|v| ForecastQuantiles::point(round2(*v)))
                .collect();
        }

        let mut simulated = vec![vec![0.0f64; self.n_sim_paths]; horizon];
        for path in 0..self.n_sim_paths {
            for (step, col) in simulated.iter_mut().enumerate() {
                let noise = residuals[self.rng.gen_range(0..residuals.len())];
                col[path] = (forecast[step] + noise).max(0.0);
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
}

impl ForecastModel for EtsModel {
    fn name(&self) -> &str {
        "ETS"
    }

    fn train(
        &mut self,
        produto_ids: &[String],
        force_retrain: bool,
        series_by_product: &HashMap<String, Vec<f64>>,
    ) -> Result<TrainResult> {
        self.version += 1;
        let mut last_variant = Seasonal::None;

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

            let fit = select_variant(series, self.seasonal_periods);
            last_variant = fit.seasonal;
            self.fitted.insert(pid.clone(), fit);
        }

        Ok(TrainResult {
            model_name: self.name().to_string(),
            version: self.version,
            parameters: Some(json!({
                "seasonal_periods": self.seasonal_periods,
                "seasonal": last_variant.as_str(),
            })),
            artifact_path: None,
        })
    }

    fn predict(&mut self, produto_ids: &[String], horizon: usize) -> Result<Vec<ForecastResult>> {
        let mut results = Vec::with_capacity(produto_ids.len());

        for pid in produto_ids {
            let Some(fit) = self.fitted.get(pid).cloned() else {
                results.push(ForecastResult::empty(pid, self.name()));
                continue;
            };

            let quantiles = self.simulate_quantiles(&fit, horizon);
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

            let fit = select_variant(train_data, self.seasonal_periods);
            let predicted = fit.forecast(holdout_weeks);

            metrics.insert(pid.clone(), compute_metrics(actual, &predicted));
        }

        Ok(metrics)
    }
}
