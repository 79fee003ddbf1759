//! Forecast model contract and shared output types
//!
//! Every concrete forecasting algorithm (naive, Croston family, ETS,
//! gradient-boosted quantile, attention-based, ensemble) implements the
//! same [`ForecastModel`] trait, so the orchestration layer stays
//! algorithm-agnostic. Models are selected at runtime by name via a map,
//! not an inheritance hierarchy.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub mod croston;
pub mod ensemble;
pub mod ets;
pub mod features;
pub mod lgbm;
pub mod naive;
pub mod tft;

/// Quantile forecast output for a single period.
///
/// Invariant: p10 <= p25 <= p50 <= p75 <= p90.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastQuantiles {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl ForecastQuantiles {
    /// All quantile levels collapsed onto a single point value
    pub fn point(value: f64) -> Self {
        Self {
            p10: value,
            p25: value,
            p50: value,
            p75: value,
            p90: value,
        }
    }

    /// Whether the quantile levels are non-decreasing
    pub fn is_non_decreasing(&self) -> bool {
        self.p10 <= self.p25 && self.p25 <= self.p50 && self.p50 <= self.p75 && self.p75 <= self.p90
    }
}

/// Forecast output for a single product across the forecast horizon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub produto_id: String,
    pub model_name: String,
    pub quantiles: Vec<ForecastQuantiles>,
}

impl ForecastResult {
    /// Result for a product the model cannot forecast (no fitted state).
    ///
    /// Callers must treat empty quantiles as "cannot forecast", never as
    /// an error.
    pub fn empty(produto_id: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            produto_id: produto_id.into(),
            model_name: model_name.into(),
            quantiles: Vec::new(),
        }
    }

    pub fn can_forecast(&self) -> bool {
        !self.quantiles.is_empty()
    }
}

/// Training output with version and per-family parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResult {
    pub model_name: String,
    pub version: u32,
    pub parameters: Option<serde_json::Value>,
    pub artifact_path: Option<String>,
}

/// Backtesting accuracy metrics for one product/model pair.
///
/// Bias > 0 means systematic under-forecast (actual > predicted).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub mape: f64,
    pub mae: f64,
    pub rmse: f64,
    pub bias: f64,
}

/// Contract that all forecast models must implement.
///
/// Data-insufficiency is never an error: products with missing or
/// too-short series are silently skipped by `train` and `backtest`,
/// and yield empty-quantile results from `predict`.
pub trait ForecastModel {
    /// Stable model identifier (e.g. "TFT", "ETS", "CROSTON")
    fn name(&self) -> &str;

    /// Fit or refit internal state per product.
    ///
    /// When `force_retrain` is false, products already fitted are skipped.
    fn train(
        &mut self,
        produto_ids: &[String],
        force_retrain: bool,
        series_by_product: &HashMap<String, Vec<f64>>,
    ) -> Result<TrainResult>;

    /// Generate quantile forecasts for the given products.
    ///
    /// Products without fitted state get an empty-quantile result;
    /// otherwise exactly `horizon` quantile tuples are returned.
    fn predict(&mut self, produto_ids: &[String], horizon: usize) -> Result<Vec<ForecastResult>>;

    /// Refit on the truncated series and score against the true holdout.
    ///
    /// Products without enough history are omitted from the result map.
    fn backtest(
        &mut self,
        produto_ids: &[String],
        holdout_weeks: usize,
        series_by_product: &HashMap<String, Vec<f64>>,
    ) -> Result<HashMap<String, BacktestMetrics>>;
}

/// Build the full production model set keyed by registry name.
///
/// The ensemble holds its own TFT and LGBM sub-model instances; its
/// `train` delegates to them.
pub fn default_models(seed: u64) -> BTreeMap<String, Box<dyn ForecastModel>> {
    let mut models: BTreeMap<String, Box<dyn ForecastModel>> = BTreeMap::new();

    models.insert("NAIVE".to_string(), Box::new(naive::NaiveModel::new(12)));
    models.insert(
        "CROSTON".to_string(),
        Box::new(croston::CrostonModel::new(croston::CrostonVariant::Classic, 0.1, seed)),
    );
    models.insert(
        "SBA".to_string(),
        Box::new(croston::CrostonModel::new(croston::CrostonVariant::Sba, 0.1, seed)),
    );
    models.insert(
        "TSB".to_string(),
        Box::new(croston::CrostonModel::new(croston::CrostonVariant::Tsb, 0.1, seed)),
    );
    models.insert("ETS".to_string(), Box::new(ets::EtsModel::new(52, seed)));
    models.insert("LGBM".to_string(), Box::new(lgbm::LgbmModel::new()));
    models.insert(
        "TFT".to_string(),
        Box::new(tft::TftModel::new(tft::TftConfig::default())),
    );
    models.insert(
        "ENSEMBLE".to_string(),
        Box::new(ensemble::EnsembleModel::new(
            Box::new(tft::TftModel::new(tft::TftConfig::default())),
            Box::new(lgbm::LgbmModel::new()),
            None,
        )),
    );

    models
}
