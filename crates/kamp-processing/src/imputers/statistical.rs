//! Mean and median fills for numeric columns.

use crate::error::Result;
use crate::types::{ActionType, PreprocessingAction};
use crate::utils::column_as_f64;
use polars::prelude::*;
use std::fmt;

/// Column statistic used as the fill value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStatistic {
    Mean,
    Median,
}

impl FillStatistic {
    fn compute(self, series: &Series) -> Option<f64> {
        match self {
            Self::Mean => series.mean(),
            Self::Median => series.median(),
        }
    }
}

impl fmt::Display for FillStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mean => write!(f, "mean"),
            Self::Median => write!(f, "median"),
        }
    }
}

/// Fills every gap of a numeric column with one column statistic.
///
/// The filled column is always `Float64`, so integer order quantities
/// filled with a fractional mean keep their precision. A column without
/// gaps, without any value, or absent from the frame is left untouched.
pub struct StatisticalImputer;

impl StatisticalImputer {
    pub fn apply_numeric_median(
        df: &mut DataFrame,
        col_name: &str,
        actions: &mut Vec<PreprocessingAction>,
    ) -> Result<()> {
        Self::fill(df, col_name, FillStatistic::Median, actions)
    }

    pub fn apply_numeric_mean(
        df: &mut DataFrame,
        col_name: &str,
        actions: &mut Vec<PreprocessingAction>,
    ) -> Result<()> {
        Self::fill(df, col_name, FillStatistic::Mean, actions)
    }

    pub fn fill(
        df: &mut DataFrame,
        col_name: &str,
        statistic: FillStatistic,
        actions: &mut Vec<PreprocessingAction>,
    ) -> Result<()> {
        let Ok(col) = df.column(col_name) else {
            return Ok(());
        };
        let series = col.as_materialized_series();
        let gaps = series.null_count();
        if gaps == 0 {
            return Ok(());
        }
        let Some(fill_value) = statistic.compute(series) else {
            return Ok(());
        };

        let filled: Vec<f64> = column_as_f64(df, col_name)?
            .into_iter()
            .map(|v| v.unwrap_or(fill_value))
            .collect();
        df.replace(col_name, Series::new(col_name.into(), filled))?;

        actions.push(
            PreprocessingAction::new(
                ActionType::ValueImputed,
                col_name,
                format!("Filled {} missing values", gaps),
            )
            .with_details(format!("{}: {:.2}", statistic, fill_value)),
        );
        Ok(())
    }
}
