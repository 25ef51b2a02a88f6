//! Imputation module for handling missing values.
//!
//! An alternative to the removal-based missing-value stage: after the same
//! null normalization and sparse-column drop, the remaining gaps are filled
//! three ways and each variant is kept as its own dataset:
//! - Statistical imputation (mean, median)
//! - Linear interpolation

mod interpolation;
mod statistical;

pub use interpolation::{InterpolationImputer, interpolate_linear};
pub use statistical::{FillStatistic, StatisticalImputer};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::stages::MissingValueResolver;
use crate::stages::missing::retype_numeric_text;
use crate::types::{PipelineStage, StageReport};
use crate::utils::{is_numeric_dtype, total_null_count};
use polars::prelude::*;
use std::time::Instant;
use tracing::info;

/// The three filled datasets.
#[derive(Debug, Clone)]
pub struct ImputedVariants {
    pub mean: DataFrame,
    pub median: DataFrame,
    pub interpolated: DataFrame,
}

pub struct ImputationVariants;

impl ImputationVariants {
    /// Produce mean, median and interpolated variants of `df`.
    ///
    /// Only numeric columns are filled; the entity column is left alone.
    /// Text columns holding nothing but plain numbers once null tokens are
    /// gone count as numeric.
    pub fn produce(df: DataFrame, config: &PipelineConfig) -> Result<(ImputedVariants, StageReport)> {
        let start = Instant::now();
        let mut report = StageReport::new(PipelineStage::Imputation).with_input_shape(df.shape());

        let df = MissingValueResolver::normalize_nulls(df, config, &mut report)?;
        let df = MissingValueResolver::drop_sparse_columns(df, config, &mut report);
        let df = retype_numeric_text(
            df,
            &[config.entity_column.as_str(), config.datetime_column.as_str()],
            &mut report,
        )?;

        let numeric_columns: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|col| is_numeric_dtype(col.dtype()) && col.name().as_str() != config.entity_column)
            .map(|col| col.name().to_string())
            .collect();

        let mut mean = df.clone();
        let mut median = df.clone();
        let mut interpolated = df;
        let mut mean_actions = Vec::new();
        let mut median_actions = Vec::new();
        let mut interpolation_actions = Vec::new();

        for name in &numeric_columns {
            StatisticalImputer::apply_numeric_mean(&mut mean, name, &mut mean_actions)?;
            StatisticalImputer::apply_numeric_median(&mut median, name, &mut median_actions)?;
            InterpolationImputer::apply_linear(&mut interpolated, name, &mut interpolation_actions)?;
        }

        for (label, variant) in [("mean", &mean), ("median", &median), ("interpolated", &interpolated)] {
            info!(
                "{} variant: {} missing cells remain",
                label,
                total_null_count(variant)
            );
        }

        for summary in report.column_summaries.iter_mut() {
            if summary.missing_count > 0 && !summary.was_removed && numeric_columns.contains(&summary.name) {
                summary.imputation_method = Some("mean, median, linear interpolation".to_string());
            }
        }

        report.actions.extend(mean_actions);
        report.actions.extend(median_actions);
        report.actions.extend(interpolation_actions);
        report.set_output_shape(interpolated.shape());
        report.duration_ms = start.elapsed().as_millis() as u64;

        Ok((
            ImputedVariants {
                mean,
                median,
                interpolated,
            },
            report,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::column_as_f64;

    #[test]
    fn test_variants_fill_numeric_columns_only() {
        let df = df![
            "Product_Number" => ["P1", "P1", "P1", "P1"],
            "Line" => [Some("A"), None, Some("A"), Some("B")],
            "Temperature" => [Some(10.0), None, Some(30.0), Some(50.0)],
            "Sparse" => [None, None, Some(1.0), None],
        ]
        .unwrap();

        let (variants, report) = ImputationVariants::produce(df, &PipelineConfig::default()).unwrap();

        assert!(variants.mean.column("Sparse").is_err());
        assert_eq!(column_as_f64(&variants.mean, "Temperature").unwrap()[1], Some(30.0));
        assert_eq!(column_as_f64(&variants.median, "Temperature").unwrap()[1], Some(30.0));
        assert_eq!(column_as_f64(&variants.interpolated, "Temperature").unwrap()[1], Some(20.0));
        assert_eq!(variants.mean.column("Line").unwrap().null_count(), 1);
        assert_eq!(report.rows_after, 4);
        assert_eq!(report.stage, PipelineStage::Imputation);

        let temperature = report
            .column_summaries
            .iter()
            .find(|s| s.name == "Temperature")
            .unwrap();
        assert!(temperature.imputation_method.is_some());
    }

    #[test]
    fn test_numeric_text_is_filled_but_grouped_text_is_kept() {
        let df = df![
            "Product_Number" => ["P1", "P1", "P1", "P1"],
            "Humidity" => [Some("40"), Some("n/a"), Some("44"), Some("42")],
            "Code" => [Some("1,200"), Some("3 4"), Some("7"), Some("007")],
        ]
        .unwrap();

        let (variants, _) = ImputationVariants::produce(df, &PipelineConfig::default()).unwrap();

        assert_eq!(variants.mean.column("Humidity").unwrap().dtype(), &DataType::Float64);
        assert_eq!(column_as_f64(&variants.mean, "Humidity").unwrap()[1], Some(42.0));
        let codes: Vec<Option<&str>> =
            variants.mean.column("Code").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(codes, vec![Some("1,200"), Some("3 4"), Some("7"), Some("007")]);
    }
}
