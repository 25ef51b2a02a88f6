//! Demand Data Cleansing Pipeline Library
//!
//! Prepares injection-molding supply-chain data (per-product daily order
//! quantities with plant humidity and temperature readings) for demand
//! forecasting, built with Rust and Polars.
//!
//! # Overview
//!
//! The pipeline runs three stages, each reading the previous stage's CSV
//! output and writing its own:
//!
//! - **Missing-Value Resolution**: null-token normalization, sparse column
//!   removal, incomplete row removal
//! - **Structural Cleansing**: timestamp split, one row per product and day,
//!   continuity enforcement, rounding
//! - **Outlier Filtering**: sensor bounds, non-negative orders, date window
//!
//! Two side tasks share the same configuration: producing mean / median /
//! interpolation variants of the raw data ([`imputers`]) and gathering the
//! per-product forecast files written by the training scripts ([`results`]).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use kamp_processing::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .input_path("data/raw/supply_chain.csv")
//!     .result_dir("data/results")
//!     .build()?;
//!
//! let report = Pipeline::builder()
//!     .config(config)
//!     .on_stage_complete(|stage| {
//!         println!("{}: {} -> {} rows", stage.stage, stage.rows_before, stage.rows_after);
//!     })
//!     .build()?
//!     .run()?;
//!
//! println!("Final dataset: {:?}", report.final_output);
//! for warning in report.warnings() {
//!     println!("! {}", warning);
//! }
//! ```
//!
//! # Running a single stage
//!
//! Every stage can also be run on its own against the configured files, or
//! called directly on an in-memory `DataFrame`:
//!
//! ```rust,ignore
//! use kamp_processing::{OutlierFilter, PipelineConfig, StageRunner};
//!
//! let config = PipelineConfig::default();
//! let report = StageRunner::new(&config).run_cleanse()?;
//!
//! let (filtered, report) = OutlierFilter::filter(df, &config)?;
//! ```
//!
//! # Configuration
//!
//! Use [`PipelineConfig`] to customize thresholds, bounds and file names:
//!
//! ```rust,ignore
//! use chrono::NaiveDate;
//! use kamp_processing::config::*;
//!
//! let config = PipelineConfig::builder()
//!     .missing_column_threshold(30.0)     // Drop columns with >30% missing
//!     .expected_observations(95)          // Days each product must cover
//!     .humidity_range(30.0, 50.0)         // Exclusive bounds
//!     .temperature_range(10.0, 30.0)      // Inclusive bounds
//!     .date_window(
//!         NaiveDate::from_ymd_opt(2022, 1, 26).unwrap(),
//!         NaiveDate::from_ymd_opt(2022, 5, 11).unwrap(),
//!     )
//!     .build()?;
//! ```

pub mod config;
pub mod error;
pub mod imputers;
pub mod io;
pub mod pipeline;
pub mod reporting;
pub mod results;
pub mod schema;
pub mod stages;
pub mod timestamp;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder, ValueRange};
pub use error::{PreprocessingError, Result as PreprocessingResult, ResultExt};
pub use imputers::{ImputationVariants, ImputedVariants, InterpolationImputer, StatisticalImputer};
pub use pipeline::{CLEANSING_SEQUENCE, Pipeline, PipelineBuilder};
pub use reporting::{PipelineReport, ReportGenerator};
pub use results::{ForecastRecord, ForecastResultsReader};
pub use schema::DatasetSchema;
pub use stages::{MissingValueResolver, OutlierFilter, RowPredicate, StageRunner, StructuralCleanser};
pub use types::{
    ActionType, ColumnSummary, FilterOutcome, PipelineStage, PreprocessingAction, StageReport,
};
pub use utils::{clean_numeric_string, is_numeric_dtype, parse_numeric_string, round_half_even};
