//! Holdout backtesting across all trained models plus a fixed baseline
//!
//! Every model is scored against the same holdout protocol: the last
//! `holdout_weeks` observations are withheld, the model refits on the
//! prefix, and accuracy metrics are computed on the true holdout. A
//! trailing moving-average baseline is always scored alongside under
//! the reserved key `"BASELINE"`, so every model has a common yardstick.

use crate::error::Result;
use crate::models::{BacktestMetrics, ForecastModel};
use crate::utils::{mean, round2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

pub mod champion;
pub mod metrics;

use champion::{decide, PromotionDecision};
use metrics::{
    aggregate_by_class, compare_against_baseline, compute_baseline_metrics, BaselineComparison,
    ClassMetrics,
};

/// Reserved model key for the moving-average baseline
pub const BASELINE_KEY: &str = "BASELINE";

/// Default holdout window in weeks
pub const DEFAULT_HOLDOUT_WEEKS: usize = 13;

/// Default trailing window for the moving-average baseline
pub const DEFAULT_BASELINE_WINDOW: usize = 12;

/// Aggregate result of one backtest run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestResult {
    /// model name -> produto_id -> metrics; always includes "BASELINE"
    /// when at least one product survived the history filter
    pub per_product: BTreeMap<String, HashMap<String, BacktestMetrics>>,
    /// model name -> ABC class -> aggregated metrics
    pub per_class: BTreeMap<String, BTreeMap<String, ClassMetrics>>,
    pub baseline_comparisons: Vec<BaselineComparison>,
    /// appended after the run by metadata collection
    pub model_metadata: Vec<ModelMetadata>,
    pub products_tested: usize,
}

/// Summary metrics attached to one trained model's metadata row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub avg_mape: Option<f64>,
    pub avg_mae: Option<f64>,
    pub products_tested: usize,
    pub promotion_log: Option<PromotionDecision>,
}

/// Persisted metadata row for one trained model per backtest cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_name: String,
    pub version: u32,
    pub training_metrics: Option<TrainingMetrics>,
    pub artifact_path: Option<String>,
    pub is_champion: bool,
}

/// Runs every model against a common holdout and the baseline
#[derive(Debug, Clone)]
pub struct Backtester {
    pub holdout_weeks: usize,
    pub baseline_window: usize,
}

impl Default for Backtester {
    fn default() -> Self {
        Self {
            holdout_weeks: DEFAULT_HOLDOUT_WEEKS,
            baseline_window: DEFAULT_BASELINE_WINDOW,
        }
    }
}

impl Backtester {
    pub fn new(holdout_weeks: usize, baseline_window: usize) -> Self {
        Self {
            holdout_weeks,
            baseline_window,
        }
    }

    /// Backtest every model over the products with enough history.
    ///
    /// Products whose series is not strictly longer than the holdout are
    /// excluded entirely. A model that yields no metrics for any product
    /// is skipped, never a run failure.
    pub fn run(
        &self,
        models: &mut BTreeMap<String, Box<dyn ForecastModel>>,
        produto_ids: &[String],
        series_by_product: &HashMap<String, Vec<f64>>,
        class_by_product: &HashMap<String, String>,
    ) -> Result<BacktestResult> {
        let valid_ids: Vec<String> = produto_ids
            .iter()
            .filter(|pid| {
                series_by_product
                    .get(*pid)
                    .map(|s| s.len() > self.holdout_weeks)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        if valid_ids.is_empty() {
            warn!("no products with enough history to backtest");
            return Ok(BacktestResult::default());
        }

        let mut result = BacktestResult {
            products_tested: valid_ids.len(),
            ..Default::default()
        };

        let baseline: HashMap<String, BacktestMetrics> = valid_ids
            .iter()
            .map(|pid| {
                let series = &series_by_product[pid];
                (
                    pid.clone(),
                    compute_baseline_metrics(series, self.holdout_weeks, self.baseline_window),
                )
            })
            .collect();

        result.per_class.insert(
            BASELINE_KEY.to_string(),
            aggregate_by_class(&baseline, class_by_product),
        );
        result.per_product.insert(BASELINE_KEY.to_string(), baseline.clone());

        for (name, model) in models.iter_mut() {
            let model_metrics = model.backtest(&valid_ids, self.holdout_weeks, series_by_product)?;
            if model_metrics.is_empty() {
                warn!(model = %name, "model produced no backtest metrics, skipping");
                continue;
            }

            result.baseline_comparisons.extend(compare_against_baseline(
                &model_metrics,
                &baseline,
                name,
            ));
            result.per_class.insert(
                name.clone(),
                aggregate_by_class(&model_metrics, class_by_product),
            );
            result.per_product.insert(name.clone(), model_metrics);
        }

        info!(
            products_tested = result.products_tested,
            models = result.per_product.len().saturating_sub(1),
            "backtest run complete"
        );

        Ok(result)
    }
}

fn average_mape(metrics: &HashMap<String, BacktestMetrics>) -> Option<f64> {
    if metrics.is_empty() {
        return None;
    }
    let mapes: Vec<f64> = metrics.values().map(|m| m.mape).collect();
    Some(mean(&mapes))
}

/// Build metadata rows for the given models from a backtest result.
///
/// With `champion_mapes` supplied (model name mapped to the incumbent
/// champion's average MAPE, or None for no champion) the is-champion
/// flag follows the promotion rule and the full decision is embedded
/// as `promotion_log`. Without it, a model is flagged champion iff it
/// beats the baseline's average MAPE.
pub fn collect_metadata(
    model_names: &[String],
    versions: &HashMap<String, u32>,
    result: &BacktestResult,
    champion_mapes: Option<&HashMap<String, Option<f64>>>,
) -> Vec<ModelMetadata> {
    let baseline_avg = result
        .per_product
        .get(BASELINE_KEY)
        .and_then(average_mape);

    model_names
        .iter()
        .map(|name| {
            let model_metrics = result.per_product.get(name);
            let avg_mape = model_metrics.and_then(average_mape);
            let avg_mae = model_metrics.and_then(|m| {
                if m.is_empty() {
                    None
                } else {
                    let maes: Vec<f64> = m.values().map(|x| x.mae).collect();
                    Some(round2(mean(&maes)))
                }
            });
            let products_tested = model_metrics.map(|m| m.len()).unwrap_or(0);

            let (is_champion, promotion_log) = match champion_mapes {
                Some(champions) => {
                    let champion_mape = champions.get(name).copied().flatten();
                    let decision = decide(name, avg_mape, champion_mape);
                    (decision.promoted, Some(decision))
                }
                None => {
                    let beats_baseline = match (avg_mape, baseline_avg) {
                        (Some(m), Some(b)) => m < b,
                        _ => false,
                    };
                    (beats_baseline, None)
                }
            };

            ModelMetadata {
                model_name: name.clone(),
                version: versions.get(name).copied().unwrap_or(1),
                training_metrics: Some(TrainingMetrics {
                    avg_mape: avg_mape.map(round2),
                    avg_mae,
                    products_tested,
                    promotion_log,
                }),
                artifact_path: None,
                is_champion,
            }
        })
        .collect()
}
