//! Error types for the forecast_engine crate

use thiserror::Error;

/// Custom error types for the forecast_engine crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to a model's train/predict/backtest operation
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from the champion/model persistence collaborator
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Error from job-level processing
    #[error("Job error: {0}")]
    JobError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
