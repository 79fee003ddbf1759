//! Ten-step forecast pipeline executor
//!
//! Runs data load, segmentation, per-family model execution, revenue
//! projection, backtest metrics, and result collection as a fixed
//! sequence of numbered steps. A model failure marks its step FAILED
//! and halts that step's remaining models, but the pipeline always
//! proceeds to the next step.

use crate::backtesting::{collect_metadata, Backtester, BacktestResult, BASELINE_KEY};
use crate::data::SkuClassification;
use crate::error::Result;
use crate::models::{ForecastModel, ForecastQuantiles, ForecastResult};
use crate::segmentation::{SkuSegment, SkuSegmenter};
use crate::utils::round2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{error, info};

/// Step names in execution order
pub const STEP_NAMES: [&str; 10] = [
    "load_data",
    "segment_skus",
    "execute_tft",
    "execute_ets",
    "execute_croston_tsb",
    "execute_lgbm_ensemble",
    "calculate_revenue",
    "calculate_metrics",
    "collect_results",
    "finalize",
];

/// Model families handled by each model-execution step
const STEP_MODELS: [(&str, &[&str]); 4] = [
    ("execute_tft", &["TFT"]),
    ("execute_ets", &["ETS", "NAIVE"]),
    ("execute_croston_tsb", &["CROSTON", "SBA", "TSB", "BOOTSTRAP"]),
    ("execute_lgbm_ensemble", &["LGBM", "ENSEMBLE"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Skipped,
    Failed,
}

/// Execution record for one pipeline step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLog {
    pub step: usize,
    pub name: String,
    pub status: StepStatus,
    pub products_processed: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PipelineStatus {
    Running,
    Completed,
    Failed,
}

/// Accumulated output of one pipeline execution
#[derive(Debug, Serialize, Deserialize)]
pub struct PipelineResult {
    pub steps: Vec<StepLog>,
    pub forecast_results: Vec<ForecastResult>,
    pub revenue_results: Vec<ForecastResult>,
    pub backtest_result: Option<BacktestResult>,
    pub total_products: usize,
    pub status: PipelineStatus,
}

/// Pipeline execution parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub horizonte_semanas: usize,
    pub holdout_weeks: usize,
    pub include_revenue: bool,
    pub include_backtest: bool,
    pub force_retrain: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizonte_semanas: 13,
            holdout_weeks: 13,
            include_revenue: true,
            include_backtest: true,
            force_retrain: false,
        }
    }
}

/// Per-step progress callback: (step number, step name, products processed)
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, &str, usize);

/// Orchestrates segmentation, model execution, revenue, and backtesting
#[derive(Debug, Clone, Default)]
pub struct ForecastPipeline {
    config: PipelineConfig,
    segmenter: SkuSegmenter,
    backtester: Backtester,
}

impl Default for PipelineResult {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            forecast_results: Vec::new(),
            revenue_results: Vec::new(),
            backtest_result: None,
            total_products: 0,
            status: PipelineStatus::Running,
        }
    }
}

impl ForecastPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let backtester = Backtester {
            holdout_weeks: config.holdout_weeks,
            ..Default::default()
        };
        Self {
            config,
            segmenter: SkuSegmenter::default(),
            backtester,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute the full ten-step pipeline over the classified products.
    ///
    /// Models are borrowed for the duration of the run so callers keep
    /// ownership of fitted state across executions.
    pub fn execute(
        &self,
        models: &mut BTreeMap<String, Box<dyn ForecastModel>>,
        classifications: &[SkuClassification],
        series_by_product: &HashMap<String, Vec<f64>>,
        prices_by_product: &HashMap<String, f64>,
        mut progress: Option<ProgressFn<'_>>,
    ) -> Result<PipelineResult> {
        let mut result = PipelineResult {
            total_products: classifications.len(),
            ..Default::default()
        };

        let mut report = |log: &StepLog| {
            if let Some(cb) = progress.as_deref_mut() {
                cb(log.step, &log.name, log.products_processed);
            }
        };

        // Step 1: load_data
        let products_with_series = classifications
            .iter()
            .filter(|c| series_by_product.contains_key(&c.produto_id))
            .count();
        let log = step_log(1, StepStatus::Completed, products_with_series, None);
        report(&log);
        result.steps.push(log);
        info!(
            products = products_with_series,
            total = classifications.len(),
            "demand history loaded"
        );

        // Step 2: segment_skus
        let weeks_by_product: HashMap<String, usize> = series_by_product
            .iter()
            .map(|(pid, s)| (pid.clone(), s.len()))
            .collect();
        let segments = self.segmenter.segment(classifications, &weeks_by_product);
        let log = step_log(2, StepStatus::Completed, classifications.len(), None);
        report(&log);
        result.steps.push(log);

        // Steps 3-6: model execution per family group
        let mut versions: HashMap<String, u32> = HashMap::new();
        for (i, (_, family)) in STEP_MODELS.iter().enumerate() {
            let step = 3 + i;
            let log = self.execute_model_step(
                step,
                family,
                models,
                &segments,
                series_by_product,
                &mut result.forecast_results,
                &mut versions,
            );
            report(&log);
            result.steps.push(log);
        }

        // Step 7: calculate_revenue
        let log = if self.config.include_revenue && !prices_by_product.is_empty() {
            let revenue = project_revenue(&result.forecast_results, prices_by_product);
            let count = revenue.len();
            result.revenue_results = revenue;
            step_log(7, StepStatus::Completed, count, None)
        } else {
            step_log(7, StepStatus::Skipped, 0, None)
        };
        report(&log);
        result.steps.push(log);

        // Step 8: calculate_metrics
        let log = if self.config.include_backtest {
            let produto_ids: Vec<String> =
                classifications.iter().map(|c| c.produto_id.clone()).collect();
            let class_by_product: HashMap<String, String> = classifications
                .iter()
                .map(|c| (c.produto_id.clone(), c.classe_abc.as_str().to_string()))
                .collect();

            match self
                .backtester
                .run(models, &produto_ids, series_by_product, &class_by_product)
            {
                Ok(mut backtest) => {
                    let model_names: Vec<String> = backtest
                        .per_product
                        .keys()
                        .filter(|k| k.as_str() != BASELINE_KEY)
                        .cloned()
                        .collect();
                    backtest.model_metadata =
                        collect_metadata(&model_names, &versions, &backtest, None);

                    let tested = backtest.products_tested;
                    result.backtest_result = Some(backtest);
                    step_log(8, StepStatus::Completed, tested, None)
                }
                Err(e) => {
                    error!(error = %e, "backtest step failed");
                    step_log(8, StepStatus::Failed, 0, Some(e.to_string()))
                }
            }
        } else {
            step_log(8, StepStatus::Skipped, 0, None)
        };
        report(&log);
        result.steps.push(log);

        // Step 9: collect_results
        let log = step_log(9, StepStatus::Completed, result.forecast_results.len(), None);
        report(&log);
        result.steps.push(log);

        // Step 10: finalize
        result.status = PipelineStatus::Completed;
        let log = step_log(10, StepStatus::Completed, 0, None);
        report(&log);
        result.steps.push(log);

        info!(
            forecasts = result.forecast_results.len(),
            revenue = result.revenue_results.len(),
            "pipeline complete"
        );

        Ok(result)
    }

    /// Train and predict every segment assigned to this step's families.
    ///
    /// A model error marks the step FAILED and stops its remaining
    /// families, leaving forecasts gathered so far in place.
    fn execute_model_step(
        &self,
        step: usize,
        family: &[&str],
        models: &mut BTreeMap<String, Box<dyn ForecastModel>>,
        segments: &BTreeMap<String, SkuSegment>,
        series_by_product: &HashMap<String, Vec<f64>>,
        forecast_results: &mut Vec<ForecastResult>,
        versions: &mut HashMap<String, u32>,
    ) -> StepLog {
        let mut processed = 0usize;
        let mut touched = false;

        for name in family {
            let Some(segment) = segments.get(*name) else {
                continue;
            };
            let Some(model) = models.get_mut(*name) else {
                continue;
            };
            touched = true;

            let outcome = model
                .train(&segment.produto_ids, self.config.force_retrain, series_by_product)
                .map(|t| versions.insert(t.model_name, t.version))
                .and_then(|_| model.predict(&segment.produto_ids, self.config.horizonte_semanas));

            match outcome {
                Ok(forecasts) => {
                    processed += forecasts.iter().filter(|f| f.can_forecast()).count();
                    forecast_results.extend(forecasts.into_iter().filter(|f| f.can_forecast()));
                }
                Err(e) => {
                    error!(model = name, error = %e, "model execution failed");
                    return step_log(step, StepStatus::Failed, processed, Some(e.to_string()));
                }
            }
        }

        if touched {
            step_log(step, StepStatus::Completed, processed, None)
        } else {
            step_log(step, StepStatus::Skipped, 0, None)
        }
    }
}

fn step_log(step: usize, status: StepStatus, products: usize, error: Option<String>) -> StepLog {
    StepLog {
        step,
        name: STEP_NAMES[step - 1].to_string(),
        status,
        products_processed: products,
        error,
    }
}

/// Revenue projection: volume quantiles times unit price, per level.
///
/// Only products with a known price get a revenue entry; the model name
/// is suffixed with `_REVENUE`.
fn project_revenue(
    forecast_results: &[ForecastResult],
    prices_by_product: &HashMap<String, f64>,
) -> Vec<ForecastResult> {
    forecast_results
        .iter()
        .filter_map(|f| {
            let price = prices_by_product.get(&f.produto_id)?;
            let quantiles = f
                .quantiles
                .iter()
                .map(|q| ForecastQuantiles {
                    p10: round2(q.p10 * price),
                    p25: round2(q.p25 * price),
                    p50: round2(q.p50 * price),
                    p75: round2(q.p75 * price),
                    p90: round2(q.p90 * price),
                })
                .collect();
            Some(ForecastResult {
                produto_id: f.produto_id.clone(),
                model_name: format!("{}_REVENUE", f.model_name),
                quantiles,
            })
        })
        .collect()
}
