//! Job boundary: wraps the pipeline with progress events and failure capture
//!
//! A job is one logical unit of work (train, forecast, or backtest).
//! Errors escaping the pipeline are caught here, reported through the
//! progress sink's failure channel, and returned as an unsuccessful
//! `JobResult`; jobs are never retried automatically.

use crate::data::SkuClassification;
use crate::error::{ForecastError, Result};
use crate::models::{default_models, ForecastModel};
use crate::pipeline::{ForecastPipeline, PipelineConfig, PipelineResult};
use crate::utils::round2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::Instant;
use tracing::{error, info};

/// Total numbered pipeline steps reported per job
pub const TOTAL_STEPS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    TrainModel,
    RunForecast,
    RunBacktest,
}

impl FromStr for JobType {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train_model" => Ok(JobType::TrainModel),
            "run_forecast" => Ok(JobType::RunForecast),
            "run_backtest" => Ok(JobType::RunBacktest),
            other => Err(ForecastError::JobError(format!("Unknown job type: {other}"))),
        }
    }
}

/// Job descriptor consumed at the processing boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobData {
    pub job_id: String,
    pub job_type: JobType,
    pub produto_ids: Option<Vec<String>>,
    pub modelo: Option<String>,
    pub horizonte_semanas: usize,
    pub holdout_weeks: usize,
    pub force_retrain: bool,
}

impl JobData {
    pub fn new(job_id: impl Into<String>, job_type: JobType) -> Self {
        Self {
            job_id: job_id.into(),
            job_type,
            produto_ids: None,
            modelo: None,
            horizonte_semanas: 13,
            holdout_weeks: 13,
            force_retrain: false,
        }
    }
}

/// Outcome of one processed job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_seconds: f64,
    pub forecasts_generated: usize,
}

/// One progress event per pipeline step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: String,
    pub step: usize,
    pub total_steps: usize,
    pub step_name: String,
    pub percent: usize,
    pub products_processed: usize,
    pub products_total: usize,
    pub status: String,
    pub error: Option<String>,
}

impl ProgressEvent {
    fn at_step(job_id: &str, step: usize, step_name: &str, processed: usize, total: usize) -> Self {
        Self::scaled(job_id, step, TOTAL_STEPS, step_name, processed, total)
    }

    /// Event with an explicit step count; train jobs scale by model count
    fn scaled(
        job_id: &str,
        step: usize,
        total_steps: usize,
        step_name: &str,
        processed: usize,
        total: usize,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            step,
            total_steps,
            step_name: step_name.to_string(),
            percent: step * 100 / total_steps.max(1),
            products_processed: processed,
            products_total: total,
            status: "running".to_string(),
            error: None,
        }
    }
}

/// Event sink for job progress.
///
/// Any transport satisfies it: an in-memory list for tests, a message
/// bus in production.
pub trait ProgressReporter {
    fn report(&mut self, event: ProgressEvent);
    fn report_completed(&mut self, job_id: &str, duration_seconds: f64);
    fn report_failed(&mut self, job_id: &str, error: &str, step: usize);
}

/// Collects events in order; the test transport
#[derive(Debug, Default)]
pub struct InMemoryProgressReporter {
    pub events: Vec<ProgressEvent>,
    pub completed: Vec<(String, f64)>,
}

impl InMemoryProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for InMemoryProgressReporter {
    fn report(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }

    fn report_completed(&mut self, job_id: &str, duration_seconds: f64) {
        self.completed.push((job_id.to_string(), duration_seconds));
        self.events.push(ProgressEvent {
            job_id: job_id.to_string(),
            step: TOTAL_STEPS,
            total_steps: TOTAL_STEPS,
            step_name: "completed".to_string(),
            percent: 100,
            products_processed: 0,
            products_total: 0,
            status: "completed".to_string(),
            error: None,
        });
    }

    fn report_failed(&mut self, job_id: &str, error: &str, step: usize) {
        self.events.push(ProgressEvent {
            job_id: job_id.to_string(),
            step,
            total_steps: TOTAL_STEPS,
            step_name: "failed".to_string(),
            percent: step * 100 / TOTAL_STEPS,
            products_processed: 0,
            products_total: 0,
            status: "failed".to_string(),
            error: Some(error.to_string()),
        });
    }
}

/// Inputs shared by every job type
#[derive(Debug, Default)]
pub struct JobInputs {
    pub classifications: Vec<SkuClassification>,
    pub series_by_product: HashMap<String, Vec<f64>>,
    pub prices_by_product: HashMap<String, f64>,
}

/// Processes jobs against an owned model set and progress sink
pub struct JobProcessor<R: ProgressReporter> {
    models: BTreeMap<String, Box<dyn ForecastModel>>,
    reporter: R,
}

impl<R: ProgressReporter> JobProcessor<R> {
    pub fn new(reporter: R, seed: u64) -> Self {
        Self {
            models: default_models(seed),
            reporter,
        }
    }

    pub fn with_models(models: BTreeMap<String, Box<dyn ForecastModel>>, reporter: R) -> Self {
        Self { models, reporter }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Process one job to completion.
    ///
    /// Never returns an error: failures are reported via the progress
    /// sink and folded into an unsuccessful `JobResult`.
    pub fn process(&mut self, job: &JobData, inputs: &JobInputs) -> JobResult {
        let started = Instant::now();
        info!(job_id = %job.job_id, job_type = ?job.job_type, "job started");

        self.reporter.report(ProgressEvent::at_step(
            &job.job_id,
            0,
            "initializing",
            0,
            inputs.classifications.len(),
        ));

        let outcome = match job.job_type {
            JobType::RunForecast => self.run_forecast(job, inputs).map(|r| {
                r.forecast_results.len()
            }),
            JobType::TrainModel => self.train_model(job, inputs),
            JobType::RunBacktest => self.run_backtest(job, inputs).map(|r| {
                r.backtest_result.map(|b| b.products_tested).unwrap_or(0)
            }),
        };

        let duration = round2(started.elapsed().as_secs_f64());

        match outcome {
            Ok(forecasts_generated) => {
                self.reporter.report_completed(&job.job_id, duration);
                info!(job_id = %job.job_id, duration, "job completed");
                JobResult {
                    job_id: job.job_id.clone(),
                    success: true,
                    error: None,
                    duration_seconds: duration,
                    forecasts_generated,
                }
            }
            Err(e) => {
                error!(job_id = %job.job_id, error = %e, "job failed");
                self.reporter.report_failed(&job.job_id, &e.to_string(), 0);
                JobResult {
                    job_id: job.job_id.clone(),
                    success: false,
                    error: Some(e.to_string()),
                    duration_seconds: duration,
                    forecasts_generated: 0,
                }
            }
        }
    }

    /// Forecast jobs skip the backtest step; metrics come from dedicated
    /// backtest jobs.
    fn run_forecast(&mut self, job: &JobData, inputs: &JobInputs) -> Result<PipelineResult> {
        let config = PipelineConfig {
            horizonte_semanas: job.horizonte_semanas,
            holdout_weeks: job.holdout_weeks,
            force_retrain: job.force_retrain,
            include_backtest: false,
            ..Default::default()
        };
        self.run_pipeline(config, &job.job_id, inputs)
    }

    fn run_pipeline(
        &mut self,
        config: PipelineConfig,
        job_id: &str,
        inputs: &JobInputs,
    ) -> Result<PipelineResult> {
        let pipeline = ForecastPipeline::new(config);

        let models = &mut self.models;
        let reporter = &mut self.reporter;
        let total = inputs.classifications.len();

        let mut on_step = |step: usize, name: &str, processed: usize| {
            reporter.report(ProgressEvent::at_step(job_id, step, name, processed, total));
        };

        pipeline.execute(
            models,
            &inputs.classifications,
            &inputs.series_by_product,
            &inputs.prices_by_product,
            Some(&mut on_step),
        )
    }

    fn train_model(&mut self, job: &JobData, inputs: &JobInputs) -> Result<usize> {
        let produto_ids: Vec<String> = match &job.produto_ids {
            Some(ids) => ids.clone(),
            None => {
                let mut ids: Vec<String> = inputs.series_by_product.keys().cloned().collect();
                ids.sort();
                ids
            }
        };

        let model_names: Vec<String> = match &job.modelo {
            Some(name) => vec![name.clone()],
            None => self.models.keys().cloned().collect(),
        };

        let mut trained = 0usize;
        for (i, name) in model_names.iter().enumerate() {
            let Some(model) = self.models.get_mut(name) else {
                return Err(ForecastError::JobError(format!("Unknown model: {name}")));
            };

            // Train progress scales by model count, not pipeline steps.
            self.reporter.report(ProgressEvent::scaled(
                &job.job_id,
                i + 1,
                model_names.len(),
                &format!("training_{}", name.to_lowercase()),
                0,
                produto_ids.len(),
            ));

            model.train(&produto_ids, job.force_retrain, &inputs.series_by_product)?;
            trained += 1;
        }

        Ok(trained)
    }

    /// Backtest jobs run the full pipeline without revenue projection.
    fn run_backtest(&mut self, job: &JobData, inputs: &JobInputs) -> Result<PipelineResult> {
        let config = PipelineConfig {
            horizonte_semanas: job.horizonte_semanas,
            holdout_weeks: job.holdout_weeks,
            force_retrain: job.force_retrain,
            include_revenue: false,
            ..Default::default()
        };
        self.run_pipeline(config, &job.job_id, inputs)
    }
}
