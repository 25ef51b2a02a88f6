//! Custom error types for the demand-data cleansing pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Errors fall
//! into three groups:
//!
//! - **Configuration errors** abort a stage: a required column is missing or
//!   the configuration itself is invalid.
//! - **I/O errors** abort a stage: most importantly a missing source file,
//!   which must never turn into a silently empty output.
//! - Data-quality problems are *not* errors. They are logged and recorded as
//!   warnings on the stage report instead.
//!
//! Errors are serializable so the CLI can emit them as JSON next to reports.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the cleansing pipeline.
#[derive(Error, Debug)]
pub enum PreprocessingError {
    /// The input file of a stage does not exist.
    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// A column required by a stage is absent.
    #[error("Required column '{column}' not found in dataset ({stage})")]
    ColumnNotFound { column: String, stage: String },

    /// No column carries the order-quantity marker.
    #[error("No order-quantity column found (marker '{0}')")]
    MissingOrderColumns(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The forecast output directory does not exist.
    #[error("Forecast results directory not found: {}", .0.display())]
    ResultsDirNotFound(PathBuf),

    /// The forecast output directory holds no readable per-product file.
    #[error("No readable forecast files in {}", .0.display())]
    NoForecastFiles(PathBuf),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PreprocessingError>,
    },
}

impl PreprocessingError {
    /// Shorthand for a missing required column.
    pub fn column_not_found(column: impl Into<String>, stage: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
            stage: stage.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PreprocessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for machine consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SourceNotFound(_) => "SOURCE_NOT_FOUND",
            Self::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            Self::MissingOrderColumns(_) => "MISSING_ORDER_COLUMNS",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ResultsDirNotFound(_) => "RESULTS_DIR_NOT_FOUND",
            Self::NoForecastFiles(_) => "NO_FORECAST_FILES",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is a configuration error (schema or settings).
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Self::ColumnNotFound { .. } | Self::MissingOrderColumns(_) | Self::InvalidConfig(_) => {
                true
            }
            Self::WithContext { source, .. } => source.is_configuration_error(),
            _ => false,
        }
    }

    /// Check if this error means a stage input is missing on disk.
    pub fn is_missing_source(&self) -> bool {
        match self {
            Self::SourceNotFound(_) | Self::ResultsDirNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_missing_source(),
            _ => false,
        }
    }
}

impl From<crate::config::ConfigValidationError> for PreprocessingError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        PreprocessingError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PreprocessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PreprocessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PreprocessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PreprocessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PreprocessingError::SourceNotFound(PathBuf::from("raw.csv")).error_code(),
            "SOURCE_NOT_FOUND"
        );
        assert_eq!(
            PreprocessingError::column_not_found("DateTime", "cleanse").error_code(),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_source_not_found_message() {
        let error = PreprocessingError::SourceNotFound(PathBuf::from("data/raw/input.csv"));
        let message = error.to_string();
        assert!(message.contains("Source file not found"));
        assert!(message.contains("input.csv"));
        assert!(error.is_missing_source());
        assert!(!error.is_configuration_error());
    }

    #[test]
    fn test_is_configuration_error() {
        assert!(PreprocessingError::column_not_found("Humidity", "outliers").is_configuration_error());
        assert!(PreprocessingError::MissingOrderColumns("수주량".to_string()).is_configuration_error());
        assert!(PreprocessingError::InvalidConfig("bad".to_string()).is_configuration_error());
        assert!(!PreprocessingError::Io(std::io::Error::other("disk")).is_configuration_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = PreprocessingError::column_not_found("DateTime", "cleanse");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("DateTime"));
    }

    #[test]
    fn test_with_context() {
        let error = PreprocessingError::column_not_found("Date", "outliers")
            .with_context("During outlier filtering");
        assert!(error.to_string().contains("During outlier filtering"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND"); // Preserves original code
        assert!(error.is_configuration_error());
    }
}
