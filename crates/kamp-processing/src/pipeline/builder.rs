//! Main cleansing pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the stage sequence through its file handoff.

use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::Result;
use crate::reporting::{PipelineReport, ReportGenerator};
use crate::results::{ForecastRecord, ForecastResultsReader};
use crate::stages::StageRunner;
use crate::types::{PipelineStage, StageReport};
use std::sync::Arc;
use tracing::{error, info};

/// Stages run by [`Pipeline::run`], in order.
pub const CLEANSING_SEQUENCE: [PipelineStage; 3] = [
    PipelineStage::MissingValues,
    PipelineStage::Cleansing,
    PipelineStage::OutlierFiltering,
];

type StageCallback = Arc<dyn Fn(&StageReport) + Send + Sync>;

/// The main cleansing pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use kamp_processing::{Pipeline, PipelineConfig};
///
/// let report = Pipeline::builder()
///     .config(PipelineConfig::builder().input_path("data/raw/input.csv").build()?)
///     .on_stage_complete(|stage| {
///         println!("{}: {} -> {} rows", stage.stage, stage.rows_before, stage.rows_after);
///     })
///     .build()?
///     .run()?;
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    stage_callback: Option<StageCallback>,
}

// Pipelines are handed to worker threads by callers embedding the library.
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run missing-value resolution, structural cleansing and outlier
    /// filtering in order, each reading the previous stage's output file.
    pub fn run(&self) -> Result<PipelineReport> {
        info!("Starting cleansing pipeline...");
        let mut stages = Vec::with_capacity(CLEANSING_SEQUENCE.len());
        for stage in CLEANSING_SEQUENCE {
            stages.push(self.run_stage(stage)?);
        }

        let report = ReportGenerator::build_report(stages);
        info!(
            "Pipeline complete: {} -> {} rows in {}ms",
            report.rows_before, report.rows_after, report.duration_ms
        );
        Ok(report)
    }

    /// Run a single stage against its configured input and output files.
    pub fn run_stage(&self, stage: PipelineStage) -> Result<StageReport> {
        info!("Running {}...", stage);
        let runner = StageRunner::new(&self.config);
        let result = match stage {
            PipelineStage::MissingValues => runner.run_missing(),
            PipelineStage::Imputation => runner.run_imputation(),
            PipelineStage::Cleansing => runner.run_cleanse(),
            PipelineStage::OutlierFiltering => runner.run_outliers(),
        };

        match result {
            Ok(report) => {
                if let Some(callback) = &self.stage_callback {
                    callback(&report);
                }
                Ok(report)
            }
            Err(e) => {
                error!("{} failed: {}", stage, e);
                Err(e)
            }
        }
    }

    /// Write the mean, median and interpolated variants of the raw dataset.
    pub fn impute(&self) -> Result<StageReport> {
        self.run_stage(PipelineStage::Imputation)
    }

    /// Read the per-product forecast files from the configured directory.
    pub fn forecast_results(&self) -> Result<Vec<ForecastRecord>> {
        ForecastResultsReader::new(
            self.config.forecast_dir.clone(),
            self.config.forecast_summary_prefix.clone(),
        )
        .read_all()
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    stage_callback: Option<StageCallback>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a callback invoked with each stage report as soon as the stage
    /// has written its output.
    pub fn on_stage_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&StageReport) + Send + Sync + 'static,
    {
        self.stage_callback = Some(Arc::new(callback));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            stage_callback: self.stage_callback,
        })
    }
}
