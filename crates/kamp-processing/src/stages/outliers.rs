//! Outlier filtering.
//!
//! Removes rows with physically impossible sensor readings, negative order
//! quantities or dates outside the collection window. Each rule is an
//! independent [`RowPredicate`]; rules only remove rows and never modify
//! values, so the surviving set does not depend on their order.

use crate::config::{PipelineConfig, ValueRange};
use crate::error::Result;
use crate::schema::DatasetSchema;
use crate::stages::cleanse::DATE_COLUMN;
use crate::timestamp::parse_date;
use crate::types::{ActionType, FilterOutcome, PipelineStage, PreprocessingAction, StageReport};
use crate::utils::{column_as_f64, column_as_strings, filter_rows};
use chrono::NaiveDate;
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

const STAGE: &str = "outlier filtering";

/// A row filter evaluated against a whole frame.
pub trait RowPredicate: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Per-row keep flags, or `None` when the predicate cannot run on this
    /// frame and should be skipped.
    fn evaluate(&self, df: &DataFrame) -> Result<Option<Vec<bool>>>;
}

/// Keeps `min < value < max`. Missing values are removed.
#[derive(Debug, Clone)]
pub struct ExclusiveRange {
    pub name: String,
    pub column: String,
    pub range: ValueRange,
}

impl RowPredicate for ExclusiveRange {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, df: &DataFrame) -> Result<Option<Vec<bool>>> {
        let keep = column_as_f64(df, &self.column)?
            .into_iter()
            .map(|v| v.is_some_and(|x| x > self.range.min && x < self.range.max))
            .collect();
        Ok(Some(keep))
    }
}

/// Keeps `min <= value <= max`. Missing values are removed.
#[derive(Debug, Clone)]
pub struct InclusiveRange {
    pub name: String,
    pub column: String,
    pub range: ValueRange,
}

impl RowPredicate for InclusiveRange {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, df: &DataFrame) -> Result<Option<Vec<bool>>> {
        let keep = column_as_f64(df, &self.column)?
            .into_iter()
            .map(|v| v.is_some_and(|x| x >= self.range.min && x <= self.range.max))
            .collect();
        Ok(Some(keep))
    }
}

/// Removes a row when any of the columns holds a negative value.
#[derive(Debug, Clone)]
pub struct NonNegativeColumns {
    pub name: String,
    pub columns: Vec<String>,
}

impl RowPredicate for NonNegativeColumns {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, df: &DataFrame) -> Result<Option<Vec<bool>>> {
        let mut keep = vec![true; df.height()];
        for column in &self.columns {
            for (flag, value) in keep.iter_mut().zip(column_as_f64(df, column)?) {
                if value.is_some_and(|x| x < 0.0) {
                    *flag = false;
                }
            }
        }
        Ok(Some(keep))
    }
}

/// Keeps rows whose date falls inside `[start, end]`. Unparseable dates are
/// removed; a missing column skips the predicate.
#[derive(Debug, Clone)]
pub struct DateWindow {
    pub name: String,
    pub column: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RowPredicate for DateWindow {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, df: &DataFrame) -> Result<Option<Vec<bool>>> {
        if df.column(&self.column).is_err() {
            return Ok(None);
        }
        let keep = column_as_strings(df, &self.column)?
            .into_iter()
            .map(|v| {
                v.as_deref()
                    .and_then(parse_date)
                    .is_some_and(|d| d >= self.start && d <= self.end)
            })
            .collect();
        Ok(Some(keep))
    }
}

/// Applies the sensor, order and date-window rules to cleansed data.
pub struct OutlierFilter;

impl OutlierFilter {
    /// Build the predicates in their logging order:
    /// humidity, temperature, orders, date window.
    pub fn predicates(config: &PipelineConfig, schema: &DatasetSchema) -> Result<Vec<Box<dyn RowPredicate>>> {
        schema.require(&config.humidity_column, STAGE)?;
        schema.require(&config.temperature_column, STAGE)?;
        let order_columns = schema.require_order_columns(&config.order_marker)?;

        let predicates: Vec<Box<dyn RowPredicate>> = vec![
            Box::new(ExclusiveRange {
                name: "humidity".to_string(),
                column: config.humidity_column.clone(),
                range: config.humidity_range,
            }),
            Box::new(InclusiveRange {
                name: "temperature".to_string(),
                column: config.temperature_column.clone(),
                range: config.temperature_range,
            }),
            Box::new(NonNegativeColumns {
                name: "orders".to_string(),
                columns: order_columns.to_vec(),
            }),
            Box::new(DateWindow {
                name: "date_window".to_string(),
                column: DATE_COLUMN.to_string(),
                start: config.date_window_start,
                end: config.date_window_end,
            }),
        ];
        Ok(predicates)
    }

    /// Run the full stage over an in-memory frame.
    pub fn filter(df: DataFrame, config: &PipelineConfig) -> Result<(DataFrame, StageReport)> {
        let start = Instant::now();
        let mut report = StageReport::new(PipelineStage::OutlierFiltering).with_input_shape(df.shape());

        let schema = DatasetSchema::introspect(&df, config);
        let predicates = Self::predicates(config, &schema)?;

        let mut df = df;
        for predicate in &predicates {
            df = Self::apply(df, predicate.as_ref(), &mut report)?;
        }

        if schema.has_column(DATE_COLUMN) {
            normalize_dates(&mut df)?;
        }

        report.set_output_shape(df.shape());
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Outlier filtering: {} -> {} rows",
            report.rows_before,
            df.height()
        );
        Ok((df, report))
    }

    /// Apply one predicate, recording how many rows it removed.
    pub fn apply(df: DataFrame, predicate: &dyn RowPredicate, report: &mut StageReport) -> Result<DataFrame> {
        let Some(keep) = predicate.evaluate(&df)? else {
            warn!(
                "Skipping '{}' filter: required column missing from the cleansed input",
                predicate.name()
            );
            report.add_warning(format!(
                "'{}' filter skipped: column missing from the cleansed input",
                predicate.name()
            ));
            report.filter_outcomes.push(FilterOutcome {
                filter: predicate.name().to_string(),
                rows_removed: 0,
                skipped: true,
            });
            return Ok(df);
        };

        let before = df.height();
        let df = filter_rows(&df, &keep)?;
        let removed = before - df.height();

        info!("'{}' filter removed {} rows", predicate.name(), removed);
        if removed > 0 {
            report.add_action(PreprocessingAction::new(
                ActionType::OutlierRemoved,
                predicate.name(),
                format!("Removed {} rows", removed),
            ));
        }
        report.filter_outcomes.push(FilterOutcome {
            filter: predicate.name().to_string(),
            rows_removed: removed,
            skipped: false,
        });
        Ok(df)
    }
}

/// Rewrite surviving dates as `YYYY-MM-DD`.
fn normalize_dates(df: &mut DataFrame) -> Result<()> {
    let normalized: Vec<Option<String>> = column_as_strings(df, DATE_COLUMN)?
        .into_iter()
        .map(|v| {
            v.as_deref()
                .and_then(parse_date)
                .map(|d| d.format("%Y-%m-%d").to_string())
        })
        .collect();
    df.replace(DATE_COLUMN, Series::new(DATE_COLUMN.into(), normalized))?;
    debug!("Normalized '{}' to ISO dates", DATE_COLUMN);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ORDER: &str = "T일 예정 수주량";

    fn frame(humidity: Vec<f64>, temperature: Vec<f64>, orders: Vec<i64>, dates: Vec<&str>) -> DataFrame {
        let n = humidity.len();
        df![
            "Product_Number" => vec!["P1"; n],
            "Date" => dates,
            "Humidity" => humidity,
            "Temperature" => temperature,
            ORDER => orders,
        ]
        .unwrap()
    }

    fn filter(df: DataFrame) -> (DataFrame, StageReport) {
        OutlierFilter::filter(df, &PipelineConfig::default()).unwrap()
    }

    #[test]
    fn test_humidity_bounds_are_exclusive() {
        let df = frame(
            vec![0.0, 0.0001, 99.9999, 100.0],
            vec![20.0; 4],
            vec![1; 4],
            vec!["2022-02-01"; 4],
        );
        let (out, report) = filter(df);

        assert_eq!(column_as_f64(&out, "Humidity").unwrap(), vec![Some(0.0001), Some(99.9999)]);
        assert_eq!(report.filter_outcomes[0].rows_removed, 2);
    }

    #[test]
    fn test_temperature_bounds_are_inclusive() {
        let df = frame(
            vec![50.0; 4],
            vec![-10.0001, -10.0, 60.0, 60.0001],
            vec![1; 4],
            vec!["2022-02-01"; 4],
        );
        let (out, _) = filter(df);

        assert_eq!(column_as_f64(&out, "Temperature").unwrap(), vec![Some(-10.0), Some(60.0)]);
    }

    #[test]
    fn test_any_negative_order_drops_row() {
        let df = df![
            "Product_Number" => ["P1", "P1", "P1"],
            "Date" => ["2022-02-01", "2022-02-02", "2022-02-03"],
            "Humidity" => [50.0, 50.0, 50.0],
            "Temperature" => [20.0, 20.0, 20.0],
            "T일 예정 수주량" => [0i64, 5, 5],
            "T+1일 예정 수주량" => [3i64, -1, 0],
        ]
        .unwrap();
        let (out, report) = filter(df);

        assert_eq!(column_as_strings(&out, "Date").unwrap().len(), 2);
        let orders_outcome = &report.filter_outcomes[2];
        assert_eq!(orders_outcome.filter, "orders");
        assert_eq!(orders_outcome.rows_removed, 1);
    }

    #[test]
    fn test_date_window_is_inclusive() {
        let df = frame(
            vec![50.0; 4],
            vec![20.0; 4],
            vec![1; 4],
            vec!["2022-01-25", "2022-01-26", "2022-05-11", "2022-05-12"],
        );
        let (out, _) = filter(df);

        let dates: Vec<String> = column_as_strings(&out, "Date")
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(dates, vec!["2022-01-26".to_string(), "2022-05-11".to_string()]);
    }

    #[test]
    fn test_missing_date_skips_with_warning() {
        let df = df![
            "Product_Number" => ["P1", "P1"],
            "Humidity" => [50.0, 50.0],
            "Temperature" => [20.0, 20.0],
            ORDER => [1i64, 2],
        ]
        .unwrap();
        let (out, report) = filter(df);

        assert_eq!(out.height(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.filter_outcomes[3].skipped);
    }

    #[test]
    fn test_missing_sensor_column_is_configuration_error() {
        let df = df![
            "Product_Number" => ["P1"],
            "Date" => ["2022-02-01"],
            "Humidity" => [50.0],
            ORDER => [1i64],
        ]
        .unwrap();
        let err = OutlierFilter::filter(df, &PipelineConfig::default()).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("Temperature"));
    }

    #[test]
    fn test_no_order_column_is_configuration_error() {
        let df = df![
            "Date" => ["2022-02-01"],
            "Humidity" => [50.0],
            "Temperature" => [20.0],
        ]
        .unwrap();
        let err = OutlierFilter::filter(df, &PipelineConfig::default()).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_ORDER_COLUMNS");
    }

    #[test]
    fn test_predicates_commute() {
        let df = frame(
            vec![0.0, 50.0, 50.0, 50.0, 50.0],
            vec![20.0, 70.0, 20.0, 20.0, 20.0],
            vec![1, 1, -1, 1, 1],
            vec!["2022-02-01", "2022-02-01", "2022-02-01", "2023-01-01", "2022-02-02"],
        );
        let config = PipelineConfig::default();
        let schema = DatasetSchema::introspect(&df, &config);

        let mut forward = df.clone();
        let mut report = StageReport::new(PipelineStage::OutlierFiltering);
        for predicate in OutlierFilter::predicates(&config, &schema).unwrap() {
            forward = OutlierFilter::apply(forward, predicate.as_ref(), &mut report).unwrap();
        }

        let mut backward = df;
        for predicate in OutlierFilter::predicates(&config, &schema).unwrap().into_iter().rev() {
            backward = OutlierFilter::apply(backward, predicate.as_ref(), &mut report).unwrap();
        }

        assert_eq!(forward.height(), 1);
        assert!(forward.equals(&backward));
    }
}
