//! # Forecast Engine
//!
//! A Rust library for SKU-level demand forecasting with model governance.
//!
//! ## Features
//!
//! - Deterministic model routing per SKU (ABC class + demand pattern)
//! - Forecast model families (Naive, Croston/SBA/TSB, ETS, LGBM-style, TFT-style, Ensemble)
//! - Quantile forecasts (p10/p25/p50/p75/p90) with revenue projection
//! - Holdout backtesting against a moving-average baseline
//! - Champion/challenger promotion with an auditable decision log
//! - Ten-step pipeline executor wrapped by a job processor with progress events
//!
//! ## Quick Start
//!
//! ```rust
//! use forecast_engine::data::{ClasseAbc, PadraoDemanda, SkuClassification};
//! use forecast_engine::models::default_models;
//! use forecast_engine::pipeline::{ForecastPipeline, PipelineConfig};
//! use std::collections::HashMap;
//!
//! let classifications = vec![
//!     SkuClassification::new("SKU-1", ClasseAbc::A, PadraoDemanda::Regular),
//! ];
//! let mut series = HashMap::new();
//! series.insert("SKU-1".to_string(), (0..104).map(|i| 100.0 + i as f64).collect());
//!
//! let mut models = default_models(42);
//! let pipeline = ForecastPipeline::new(PipelineConfig::default());
//! let result = pipeline
//!     .execute(&mut models, &classifications, &series, &HashMap::new(), None)
//!     .unwrap();
//!
//! assert_eq!(result.steps.len(), 10);
//! ```

pub mod backtesting;
pub mod data;
pub mod error;
pub mod jobs;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod segmentation;
pub mod utils;

// Re-export commonly used types
pub use crate::backtesting::{BacktestResult, Backtester};
pub use crate::data::{ClasseAbc, PadraoDemanda, SkuClassification};
pub use crate::error::{ForecastError, Result};
pub use crate::models::{ForecastModel, ForecastQuantiles, ForecastResult};
pub use crate::pipeline::{ForecastPipeline, PipelineConfig, PipelineResult};
pub use crate::registry::{ModelRegistry, ModelSelection};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
