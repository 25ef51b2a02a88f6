//! Configuration types for the cleansing pipeline.
//!
//! Every stage receives a [`PipelineConfig`] explicitly: file locations,
//! thresholds, the expected observation count, the valid date window and
//! the column naming conventions all live here instead of in globals.
//! The builder pattern mirrors the rest of the crate.

use crate::error::{PreprocessingError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Null tokens recognized when reading raw data.
pub const DEFAULT_NULL_TOKENS: [&str; 14] = [
    "", " ", "NA", "N/A", "na", "Na", "null", "NULL", "-", "--", "None", "nan", "NaN", "NAN",
];

/// Marker contained in every order-quantity column name ("order quantity").
pub const DEFAULT_ORDER_MARKER: &str = "수주량";

/// Inclusive numeric bounds used by the outlier predicates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Configuration for the cleansing pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API, or [`PipelineConfig::from_json_file`] to load one.
///
/// # Example
///
/// ```rust,ignore
/// use kamp_processing::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .input_path("data/raw/supply_chain.csv")
///     .result_dir("data/results")
///     .missing_column_threshold(30.0)
///     .expected_observations(95)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw dataset read by the missing-value stage.
    pub input_path: PathBuf,

    /// Directory receiving every stage output.
    /// Default: "data/results"
    pub result_dir: PathBuf,

    /// File name of the missing-value stage output.
    pub missing_output_name: String,

    /// File name of the structural cleansing output.
    pub cleanse_output_name: String,

    /// File name of the outlier filter output (final dataset).
    pub outlier_output_name: String,

    /// File names of the mean / median / interpolation variants.
    pub mean_imputed_name: String,
    pub median_imputed_name: String,
    pub interpolated_name: String,

    /// Tokens treated as missing values.
    pub null_tokens: Vec<String>,

    /// Columns whose missing percentage is strictly above this value
    /// (0 - 100) are dropped.
    /// Default: 30.0
    pub missing_column_threshold: f64,

    /// Entity identifier column.
    pub entity_column: String,

    /// Combined timestamp column split by the cleanse stage.
    pub datetime_column: String,

    /// Day-of-week column moved next to `Date`/`Time` when present.
    pub day_of_week_column: String,

    /// Substring identifying order-quantity columns.
    pub order_marker: String,

    pub humidity_column: String,
    pub temperature_column: String,

    /// Decimal digits kept on sensor columns.
    /// Default: 3
    pub sensor_precision: u32,

    /// Number of distinct dates every retained entity must have.
    /// Default: 95
    pub expected_observations: usize,

    /// Humidity bounds, both exclusive.
    pub humidity_range: ValueRange,

    /// Temperature bounds, both inclusive.
    pub temperature_range: ValueRange,

    /// Inclusive collection window for `Date`.
    pub date_window_start: NaiveDate,
    pub date_window_end: NaiveDate,

    /// Directory holding per-product forecast files.
    pub forecast_dir: PathBuf,

    /// Prefix of the summary file skipped when reading forecasts.
    pub forecast_summary_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/raw/supply_chain_dataset.csv"),
            result_dir: PathBuf::from("data/results"),
            missing_output_name: "01_00_missing_values_removed.csv".to_string(),
            cleanse_output_name: "02_cleansed.csv".to_string(),
            outlier_output_name: "03_outliers_removed.csv".to_string(),
            mean_imputed_name: "01_01_mean_imputed.csv".to_string(),
            median_imputed_name: "01_02_median_imputed.csv".to_string(),
            interpolated_name: "01_03_interpolated.csv".to_string(),
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|s| s.to_string()).collect(),
            missing_column_threshold: 30.0,
            entity_column: "Product_Number".to_string(),
            datetime_column: "DateTime".to_string(),
            day_of_week_column: "DoW".to_string(),
            order_marker: DEFAULT_ORDER_MARKER.to_string(),
            humidity_column: "Humidity".to_string(),
            temperature_column: "Temperature".to_string(),
            sensor_precision: 3,
            expected_observations: 95,
            humidity_range: ValueRange::new(0.0, 100.0),
            temperature_range: ValueRange::new(-10.0, 60.0),
            date_window_start: NaiveDate::from_ymd_opt(2022, 1, 26).unwrap_or_default(),
            date_window_end: NaiveDate::from_ymd_opt(2022, 5, 11).unwrap_or_default(),
            forecast_dir: PathBuf::from("models/outputs/tab_a_ensemble_forecast"),
            forecast_summary_prefix: "ensemble_summary".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults. The result is validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PreprocessingError::SourceNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Output of the missing-value stage, input of the cleanse stage.
    pub fn missing_output_path(&self) -> PathBuf {
        self.result_dir.join(&self.missing_output_name)
    }

    /// Output of the cleanse stage, input of the outlier stage.
    pub fn cleanse_output_path(&self) -> PathBuf {
        self.result_dir.join(&self.cleanse_output_name)
    }

    /// Final dataset handed to the training scripts.
    pub fn outlier_output_path(&self) -> PathBuf {
        self.result_dir.join(&self.outlier_output_name)
    }

    pub fn mean_imputed_path(&self) -> PathBuf {
        self.result_dir.join(&self.mean_imputed_name)
    }

    pub fn median_imputed_path(&self) -> PathBuf {
        self.result_dir.join(&self.median_imputed_name)
    }

    pub fn interpolated_path(&self) -> PathBuf {
        self.result_dir.join(&self.interpolated_name)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if !(0.0..=100.0).contains(&self.missing_column_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "missing_column_threshold".to_string(),
                value: self.missing_column_threshold,
            });
        }

        if self.expected_observations == 0 {
            return Err(ConfigValidationError::InvalidExpectedObservations(
                self.expected_observations,
            ));
        }

        if self.date_window_start > self.date_window_end {
            return Err(ConfigValidationError::InvalidDateWindow {
                start: self.date_window_start,
                end: self.date_window_end,
            });
        }

        if self.sensor_precision > 10 {
            return Err(ConfigValidationError::InvalidPrecision(self.sensor_precision));
        }

        for (field, range) in [
            ("humidity_range", self.humidity_range),
            ("temperature_range", self.temperature_range),
        ] {
            if range.min.is_nan() || range.max.is_nan() || range.min > range.max {
                return Err(ConfigValidationError::InvalidRange {
                    field: field.to_string(),
                    min: range.min,
                    max: range.max,
                });
            }
        }

        for (field, value) in [
            ("entity_column", &self.entity_column),
            ("datetime_column", &self.datetime_column),
            ("order_marker", &self.order_marker),
            ("humidity_column", &self.humidity_column),
            ("temperature_column", &self.temperature_column),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyField(field.to_string()));
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0 and 100)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid expected observation count: {0} (must be at least 1)")]
    InvalidExpectedObservations(usize),

    #[error("Invalid date window: {start} is after {end}")]
    InvalidDateWindow { start: NaiveDate, end: NaiveDate },

    #[error("Invalid sensor precision: {0} (must be at most 10)")]
    InvalidPrecision(u32),

    #[error("Invalid range for '{field}': [{min}, {max}]")]
    InvalidRange { field: String, min: f64, max: f64 },

    #[error("Configuration field '{0}' must not be empty")]
    EmptyField(String),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    base: Option<PipelineConfig>,
    input_path: Option<PathBuf>,
    result_dir: Option<PathBuf>,
    null_tokens: Option<Vec<String>>,
    missing_column_threshold: Option<f64>,
    entity_column: Option<String>,
    datetime_column: Option<String>,
    order_marker: Option<String>,
    sensor_precision: Option<u32>,
    expected_observations: Option<usize>,
    humidity_range: Option<ValueRange>,
    temperature_range: Option<ValueRange>,
    date_window: Option<(NaiveDate, NaiveDate)>,
    forecast_dir: Option<PathBuf>,
}

impl PipelineConfigBuilder {
    /// Start from an existing configuration (e.g. one loaded from JSON) so
    /// CLI flags can override individual values.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            base: Some(config.clone()),
            ..Self::default()
        }
    }

    /// Set the raw dataset path.
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    /// Set the directory that receives stage outputs.
    pub fn result_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.result_dir = Some(path.into());
        self
    }

    /// Replace the recognized null tokens.
    pub fn null_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_tokens = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Set the threshold for dropping columns with missing values.
    ///
    /// # Arguments
    /// * `threshold` - Percentage between 0 and 100 (e.g., 30.0 = 30%)
    pub fn missing_column_threshold(mut self, threshold: f64) -> Self {
        self.missing_column_threshold = Some(threshold);
        self
    }

    pub fn entity_column(mut self, column: impl Into<String>) -> Self {
        self.entity_column = Some(column.into());
        self
    }

    pub fn datetime_column(mut self, column: impl Into<String>) -> Self {
        self.datetime_column = Some(column.into());
        self
    }

    /// Set the substring that identifies order-quantity columns.
    pub fn order_marker(mut self, marker: impl Into<String>) -> Self {
        self.order_marker = Some(marker.into());
        self
    }

    pub fn sensor_precision(mut self, digits: u32) -> Self {
        self.sensor_precision = Some(digits);
        self
    }

    /// Set the number of distinct dates each entity must have.
    pub fn expected_observations(mut self, count: usize) -> Self {
        self.expected_observations = Some(count);
        self
    }

    pub fn humidity_range(mut self, min: f64, max: f64) -> Self {
        self.humidity_range = Some(ValueRange::new(min, max));
        self
    }

    pub fn temperature_range(mut self, min: f64, max: f64) -> Self {
        self.temperature_range = Some(ValueRange::new(min, max));
        self
    }

    /// Set the inclusive date window kept by the outlier stage.
    pub fn date_window(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_window = Some((start, end));
        self
    }

    pub fn forecast_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.forecast_dir = Some(path.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<PipelineConfig, ConfigValidationError> {
        let defaults = self.base.unwrap_or_default();
        let (date_window_start, date_window_end) = self
            .date_window
            .unwrap_or((defaults.date_window_start, defaults.date_window_end));

        let config = PipelineConfig {
            input_path: self.input_path.unwrap_or(defaults.input_path),
            result_dir: self.result_dir.unwrap_or(defaults.result_dir),
            null_tokens: self.null_tokens.unwrap_or(defaults.null_tokens),
            missing_column_threshold: self
                .missing_column_threshold
                .unwrap_or(defaults.missing_column_threshold),
            entity_column: self.entity_column.unwrap_or(defaults.entity_column),
            datetime_column: self.datetime_column.unwrap_or(defaults.datetime_column),
            order_marker: self.order_marker.unwrap_or(defaults.order_marker),
            sensor_precision: self.sensor_precision.unwrap_or(defaults.sensor_precision),
            expected_observations: self
                .expected_observations
                .unwrap_or(defaults.expected_observations),
            humidity_range: self.humidity_range.unwrap_or(defaults.humidity_range),
            temperature_range: self.temperature_range.unwrap_or(defaults.temperature_range),
            date_window_start,
            date_window_end,
            forecast_dir: self.forecast_dir.unwrap_or(defaults.forecast_dir),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}
