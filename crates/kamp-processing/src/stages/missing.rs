//! Missing-value resolution.
//!
//! Normalizes heterogeneous null markers, drops columns whose missing
//! percentage is above the configured threshold and then drops every row
//! that still holds a null. Row order is preserved.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::types::{ActionType, ColumnSummary, PipelineStage, PreprocessingAction, StageReport};
use crate::utils::{
    column_names, complete_row_mask, filter_rows, is_null_token, null_token_set,
    total_null_count,
};
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Resolves missing values by removal.
pub struct MissingValueResolver;

impl MissingValueResolver {
    /// Run the full stage over an in-memory frame.
    pub fn resolve(df: DataFrame, config: &PipelineConfig) -> Result<(DataFrame, StageReport)> {
        let start = Instant::now();
        let mut report = StageReport::new(PipelineStage::MissingValues).with_input_shape(df.shape());

        let df = Self::normalize_nulls(df, config, &mut report)?;
        let df = Self::drop_sparse_columns(df, config, &mut report);
        let df = Self::drop_incomplete_rows(df, &mut report)?;

        report.set_output_shape(df.shape());
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Missing-value resolution: {:?} -> {:?}",
            (report.rows_before, report.columns_before),
            df.shape()
        );
        Ok((df, report))
    }

    /// Replace null tokens in string columns with real nulls.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace, so it
    /// also catches spellings the CSV reader let through. Every other cell
    /// keeps its text and every column keeps its type. Records completeness
    /// on `report`.
    pub fn normalize_nulls(
        mut df: DataFrame,
        config: &PipelineConfig,
        report: &mut StageReport,
    ) -> Result<DataFrame> {
        let tokens = null_token_set(&config.null_tokens);

        for name in column_names(&df) {
            let (values, prior_nulls) = {
                let series = df.column(&name)?.as_materialized_series();
                if series.dtype() != &DataType::String {
                    continue;
                }
                let values: Vec<Option<String>> = series
                    .str()?
                    .into_iter()
                    .map(|v| v.filter(|s| !is_null_token(s, &tokens)).map(str::to_string))
                    .collect();
                (values, series.null_count())
            };

            let cleaned = values.iter().filter(|v| v.is_none()).count() - prior_nulls;
            if cleaned > 0 {
                debug!("Normalized {} null tokens in '{}'", cleaned, name);
                report.add_action(PreprocessingAction::new(
                    ActionType::ValueCleaned,
                    &name,
                    format!("Normalized {} null tokens to missing", cleaned),
                ));
                df.replace(&name, Series::new(name.as_str().into(), values))?;
            }
        }

        let total_missing = total_null_count(&df);
        let completeness = completeness_percentage(total_missing, df.height());
        info!(
            "Loaded {} rows x {} columns, {} missing cells (completeness {:.2}%)",
            df.height(),
            df.width(),
            total_missing,
            completeness
        );
        report.completeness = Some(completeness);

        Ok(df)
    }

    /// Drop every column whose missing percentage is above the threshold.
    ///
    /// A column exactly at the threshold is kept.
    pub fn drop_sparse_columns(df: DataFrame, config: &PipelineConfig, report: &mut StageReport) -> DataFrame {
        let rows = df.height();
        let threshold = config.missing_column_threshold;
        let mut dropped = Vec::new();

        for col in df.get_columns() {
            let name = col.name().to_string();
            let missing = col.null_count();
            let summary = ColumnSummary::new(&name, col.dtype().to_string(), missing, rows);

            if exceeds_threshold(missing, rows, threshold) {
                debug!("'{}' is {:.2}% missing", name, summary.missing_percentage);
                report.add_action(
                    PreprocessingAction::new(
                        ActionType::ColumnRemoved,
                        &name,
                        "Removed due to high missing percentage",
                    )
                    .with_details(format!(
                        "{:.2}% missing, threshold {}%",
                        summary.missing_percentage, threshold
                    )),
                );
                report.column_summaries.push(
                    summary.mark_removed(format!("More than {}% missing", threshold)),
                );
                dropped.push(name);
            } else {
                report.column_summaries.push(summary);
            }
        }

        if dropped.is_empty() {
            info!("No column exceeds {}% missing; all columns kept", threshold);
            return df;
        }

        info!("Dropping {} columns over {}% missing: {:?}", dropped.len(), threshold, dropped);
        df.drop_many(dropped.iter().map(String::as_str))
    }

    /// Drop rows holding any null.
    pub fn drop_incomplete_rows(df: DataFrame, report: &mut StageReport) -> Result<DataFrame> {
        let before = df.height();
        let keep = complete_row_mask(&df);
        let df = filter_rows(&df, &keep)?;
        let removed = before - df.height();

        info!("Dropped {} incomplete rows, {} remain", removed, df.height());
        if removed > 0 {
            report.add_action(PreprocessingAction::new(
                ActionType::RowsRemoved,
                "dataset",
                format!("Removed {} rows with missing values", removed),
            ));
        }
        Ok(df)
    }
}

/// Re-type text columns whose non-null cells are all plain numbers.
///
/// A cell counts as a number only when its trimmed text parses as a finite
/// `f64` as is, so grouped (`1,200`) or spaced (`3 4`) values keep the
/// column textual. Columns listed in `keep_text` are never touched.
pub fn retype_numeric_text(
    mut df: DataFrame,
    keep_text: &[&str],
    report: &mut StageReport,
) -> Result<DataFrame> {
    for name in column_names(&df) {
        if keep_text.contains(&name.as_str()) {
            continue;
        }
        let numeric = {
            let series = df.column(&name)?.as_materialized_series();
            if series.dtype() != &DataType::String {
                continue;
            }
            let cells = series.str()?;
            if cells.null_count() == cells.len()
                || !cells.into_iter().flatten().all(|s| parse_plain_number(s).is_some())
            {
                continue;
            }
            cells
                .into_iter()
                .map(|v| v.and_then(parse_plain_number))
                .collect::<Vec<Option<f64>>>()
        };

        df.replace(&name, Series::new(name.as_str().into(), numeric))?;
        report.add_action(PreprocessingAction::new(
            ActionType::TypeCorrected,
            &name,
            "Converted text column to numeric",
        ));
    }
    Ok(df)
}

fn parse_plain_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Percentage of non-missing values, `(1 - missing / rows) * 100`.
///
/// An empty table is fully complete.
pub fn completeness_percentage(total_missing: usize, rows: usize) -> f64 {
    if rows == 0 {
        return 100.0;
    }
    (1.0 - total_missing as f64 / rows as f64) * 100.0
}

/// `missing / rows * 100 > threshold`, compared without dividing so that a
/// column sitting exactly on the threshold is never dropped by rounding.
pub fn exceeds_threshold(missing: usize, rows: usize, threshold: f64) -> bool {
    rows > 0 && missing as f64 * 100.0 > threshold * rows as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn test_threshold_boundary() {
        assert!(!exceeds_threshold(3, 10, 30.0));
        assert!(exceeds_threshold(3001, 10_000, 30.0));
        assert!(!exceeds_threshold(0, 0, 30.0));
        assert!(exceeds_threshold(1, 10, 0.0));
    }

    #[test]
    fn test_completeness_percentage() {
        assert_eq!(completeness_percentage(0, 0), 100.0);
        assert_eq!(completeness_percentage(0, 10), 100.0);
        assert!((completeness_percentage(2, 10) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_nulls_case_insensitive() {
        let df = df![
            "Product_Number" => ["P1", "P2", "P3", "P4"],
            "Line" => ["A", " n/a ", "NONE", "B"],
            "Pressure" => ["1.5", "nan", "2", "-"],
        ]
        .unwrap();

        let mut report = StageReport::new(PipelineStage::MissingValues);
        let df = MissingValueResolver::normalize_nulls(df, &config(), &mut report).unwrap();

        assert_eq!(df.column("Line").unwrap().null_count(), 2);
        assert_eq!(df.column("Pressure").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("Pressure").unwrap().null_count(), 2);
        assert_eq!(df.column("Product_Number").unwrap().dtype(), &DataType::String);
        assert!((report.completeness.unwrap() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_column_at_threshold_is_kept() {
        // 3 of 10 missing is exactly 30%.
        let df = df![
            "keep" => [None, None, None, Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(1.0)],
            "drop" => [None, None, None, None, Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(1.0)],
        ]
        .unwrap();

        let mut report = StageReport::new(PipelineStage::MissingValues);
        let df = MissingValueResolver::drop_sparse_columns(df, &config(), &mut report);

        assert_eq!(column_names(&df), vec!["keep".to_string()]);
        assert_eq!(report.column_summaries.len(), 2);
        assert!(report.column_summaries[1].was_removed);
    }

    #[test]
    fn test_resolve_leaves_no_nulls_and_keeps_order() {
        let df = df![
            "Product_Number" => ["P1", "P2", "P3", "P4"],
            "Temperature" => [Some(20.0), None, Some(22.0), Some(23.0)],
            "Humidity" => ["40", "41", "NA", "43"],
        ]
        .unwrap();

        let (out, report) = MissingValueResolver::resolve(df, &config()).unwrap();

        assert_eq!(total_null_count(&out), 0);
        assert_eq!(out.height(), 2);
        let ids: Vec<&str> = out
            .column("Product_Number")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(ids, vec!["P1", "P4"]);
        assert_eq!(report.rows_before, 4);
        assert_eq!(report.rows_after, 2);
        assert!(
            report
                .actions
                .iter()
                .any(|a| a.action_type == ActionType::RowsRemoved)
        );
    }

    #[test]
    fn test_no_sparse_columns_is_a_noop() {
        let df = df!["a" => [1.0, 2.0], "b" => ["x", "y"]].unwrap();
        let mut report = StageReport::new(PipelineStage::MissingValues);
        let out = MissingValueResolver::drop_sparse_columns(df.clone(), &config(), &mut report);
        assert!(out.equals(&df));
        assert!(report.actions.is_empty());
    }

    #[test]
    fn test_non_null_text_is_left_as_is() {
        let df = df![
            "Product_Number" => ["P1", "P2", "P3", "P4", "P5"],
            "Code" => ["1,200", "3 4", " n/a ", "007", "12"],
        ]
        .unwrap();

        let mut report = StageReport::new(PipelineStage::MissingValues);
        let df = MissingValueResolver::normalize_nulls(df, &config(), &mut report).unwrap();

        let codes: Vec<Option<&str>> = df.column("Code").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(codes, vec![Some("1,200"), Some("3 4"), None, Some("007"), Some("12")]);
        assert!(report.actions.iter().all(|a| a.action_type != ActionType::TypeCorrected));
    }

    #[test]
    fn test_retype_numeric_text_requires_plain_numbers() {
        let df = df![
            "Product_Number" => ["1", "2", "3"],
            "Humidity" => [Some(" 40.5"), None, Some("41")],
            "Code" => [Some("1,200"), Some("3"), None],
        ]
        .unwrap();

        let mut report = StageReport::new(PipelineStage::Imputation);
        let df = retype_numeric_text(df, &["Product_Number"], &mut report).unwrap();

        assert_eq!(df.column("Humidity").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("Code").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("Product_Number").unwrap().dtype(), &DataType::String);
        assert_eq!(report.actions.len(), 1);
    }
}
