//! Cleansing stages and their file handoff.
//!
//! Each stage is a pure function over an owned `DataFrame`. [`StageRunner`]
//! wires them to the configured files: a stage reads its input, never
//! modifies it, and overwrites its output.

pub mod cleanse;
pub mod missing;
pub mod outliers;

pub use cleanse::StructuralCleanser;
pub use missing::MissingValueResolver;
pub use outliers::{OutlierFilter, RowPredicate};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::imputers::ImputationVariants;
use crate::io::{read_csv, write_csv};
use crate::types::StageReport;
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Runs stages against the files named by a [`PipelineConfig`].
pub struct StageRunner<'a> {
    config: &'a PipelineConfig,
}

impl<'a> StageRunner<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Raw dataset -> missing-values-removed file.
    pub fn run_missing(&self) -> Result<StageReport> {
        let config = self.config;
        self.run_file_stage(
            &config.input_path,
            &config.missing_output_path(),
            &config.null_tokens,
            |df| MissingValueResolver::resolve(df, config),
        )
    }

    /// Missing-values-removed file -> cleansed file.
    pub fn run_cleanse(&self) -> Result<StageReport> {
        let config = self.config;
        self.run_file_stage(
            &config.missing_output_path(),
            &config.cleanse_output_path(),
            &[],
            |df| StructuralCleanser::cleanse(df, config),
        )
    }

    /// Cleansed file -> outlier-free file.
    pub fn run_outliers(&self) -> Result<StageReport> {
        let config = self.config;
        self.run_file_stage(
            &config.cleanse_output_path(),
            &config.outlier_output_path(),
            &[],
            |df| OutlierFilter::filter(df, config),
        )
    }

    /// Raw dataset -> mean, median and interpolated variant files.
    pub fn run_imputation(&self) -> Result<StageReport> {
        let start = Instant::now();
        let config = self.config;
        let input = &config.input_path;

        info!("Reading {}", input.display());
        let df = read_csv(input, &config.null_tokens)?;
        let (mut variants, mut report) = ImputationVariants::produce(df, config)?;

        let outputs = [
            (&mut variants.mean, config.mean_imputed_path()),
            (&mut variants.median, config.median_imputed_path()),
            (&mut variants.interpolated, config.interpolated_path()),
        ];
        for (frame, path) in outputs {
            write_csv(frame, &path)?;
            info!("Saved {}", path.display());
            report.output_files.push(path.display().to_string());
        }

        report.input_file = Some(input.display().to_string());
        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    fn run_file_stage<F>(
        &self,
        input: &Path,
        output: &Path,
        null_tokens: &[String],
        stage: F,
    ) -> Result<StageReport>
    where
        F: FnOnce(DataFrame) -> Result<(DataFrame, StageReport)>,
    {
        let start = Instant::now();

        info!("Reading {}", input.display());
        let df = read_csv(input, null_tokens)?;
        let (mut out, mut report) = stage(df)?;
        write_csv(&mut out, output)?;
        info!("Saved {} ({} rows)", output.display(), out.height());

        report.input_file = Some(input.display().to_string());
        report.output_files.push(output.display().to_string());
        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }
}
