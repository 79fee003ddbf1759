//! Weighted ensemble blending two sub-models' quantile forecasts

use crate::error::Result;
use crate::models::{BacktestMetrics, ForecastModel, ForecastQuantiles, ForecastResult, TrainResult};
use crate::utils::round2;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};

/// Default blend: TFT 0.6 / LGBM 0.4
pub fn default_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([("TFT".to_string(), 0.6), ("LGBM".to_string(), 0.4)])
}

fn blend_quantiles(a: &ForecastQuantiles, b: &ForecastQuantiles, wa: f64, wb: f64) -> ForecastQuantiles {
    let blend = |va: f64, vb: f64| round2(va * wa + vb * wb);
    ForecastQuantiles {
        p10: blend(a.p10, b.p10),
        p25: blend(a.p25, b.p25),
        p50: blend(a.p50, b.p50),
        p75: blend(a.p75, b.p75),
        p90: blend(a.p90, b.p90),
    }
}

/// Weighted ensemble over two sub-model instances.
///
/// Does not fit its own parameters: `train` delegates to the
/// constituents, `predict` blends their quantiles per level, and
/// `backtest` combines their metrics by the same weights. If either
/// sub-model has no forecast for a product, the ensemble result for
/// that product is empty rather than partially filled.
pub struct EnsembleModel {
    primary: Box<dyn ForecastModel>,
    secondary: Box<dyn ForecastModel>,
    weights: BTreeMap<String, f64>,
    version: u32,
}

impl EnsembleModel {
    pub fn new(
        primary: Box<dyn ForecastModel>,
        secondary: Box<dyn ForecastModel>,
        weights: Option<BTreeMap<String, f64>>,
    ) -> Self {
        Self {
            primary,
            secondary,
            weights: weights.unwrap_or_else(default_weights),
            version: 0,
        }
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    fn weight_pair(&self) -> (f64, f64) {
        let wp = self.weights.get(self.primary.name()).copied().unwrap_or(0.6);
        let ws = self.weights.get(self.secondary.name()).copied().unwrap_or(0.4);
        (wp, ws)
    }
}

impl ForecastModel for EnsembleModel {
    fn name(&self) -> &str {
        "ENSEMBLE"
    }

    fn train(
        &mut self,
        produto_ids: &[String],
        force_retrain: bool,
        series_by_product: &HashMap<String, Vec<f64>>,
    ) -> Result<TrainResult> {
        self.version += 1;
        self.primary.train(produto_ids, force_retrain, series_by_product)?;
        self.secondary.train(produto_ids, force_retrain, series_by_product)?;

        Ok(TrainResult {
            model_name: self.name().to_string(),
            version: self.version,
            parameters: Some(json!({ "weights": self.weights })),
            artifact_path: None,
        })
    }

    fn predict(&mut self, produto_ids: &[String], horizon: usize) -> Result<Vec<ForecastResult>> {
        let primary_results = self.primary.predict(produto_ids, horizon)?;
        let secondary_results = self.secondary.predict(produto_ids, horizon)?;

        let primary_map: HashMap<&str, &ForecastResult> = primary_results
            .iter()
            .map(|r| (r.produto_id.as_str(), r))
            .collect();
        let secondary_map: HashMap<&str, &ForecastResult> = secondary_results
            .iter()
            .map(|r| (r.produto_id.as_str(), r))
            .collect();

        let (wp, ws) = self.weight_pair();

        let mut results = Vec::with_capacity(produto_ids.len());
        for pid in produto_ids {
            let (Some(a), Some(b)) = (primary_map.get(pid.as_str()), secondary_map.get(pid.as_str()))
            else {
                results.push(ForecastResult::empty(pid, self.name()));
                continue;
            };

            if !a.can_forecast() || !b.can_forecast() {
                results.push(ForecastResult::empty(pid, self.name()));
                continue;
            }

            let horizon = a.quantiles.len().min(b.quantiles.len());
            let quantiles = (0..horizon)
                .map(|i| blend_quantiles(&a.quantiles[i], &b.quantiles[i], wp, ws))
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
        let primary_metrics = self.primary.backtest(produto_ids, holdout_weeks, series_by_product)?;
        let secondary_metrics =
            self.secondary.backtest(produto_ids, holdout_weeks, series_by_product)?;

        let (wp, ws) = self.weight_pair();

        let mut combined = HashMap::new();
        for pid in produto_ids {
            match (primary_metrics.get(pid), secondary_metrics.get(pid)) {
                (None, None) => {}
                (Some(m), None) | (None, Some(m)) => {
                    combined.insert(pid.clone(), *m);
                }
                (Some(a), Some(b)) => {
                    combined.insert(
                        pid.clone(),
                        BacktestMetrics {
                            mape: round2(a.mape * wp + b.mape * ws),
                            mae: round2(a.mae * wp + b.mae * ws),
                            rmse: round2(a.rmse * wp + b.rmse * ws),
                            bias: round2(a.bias * wp + b.bias * ws),
                        },
                    );
                }
            }
        }

        Ok(combined)
    }
}
