//! Structural cleansing.
//!
//! Turns the combined timestamp into `Date`/`Time` columns, keeps the
//! latest record per entity and day, enforces the expected number of
//! daily observations per entity and normalizes numeric precision.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::schema::DatasetSchema;
use crate::timestamp::parse_timestamp_column;
use crate::types::{ActionType, PipelineStage, PreprocessingAction, StageReport};
use crate::utils::{column_as_f64, column_as_strings, filter_rows, round_half_even};
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Name of the derived calendar-date column.
pub const DATE_COLUMN: &str = "Date";
/// Name of the derived time-of-day column.
pub const TIME_COLUMN: &str = "Time";

const STAGE: &str = "structural cleansing";

/// Reshapes missing-value output into one row per product and day.
pub struct StructuralCleanser;

impl StructuralCleanser {
    /// Run the full stage over an in-memory frame.
    pub fn cleanse(df: DataFrame, config: &PipelineConfig) -> Result<(DataFrame, StageReport)> {
        let start = Instant::now();
        let mut report = StageReport::new(PipelineStage::Cleansing).with_input_shape(df.shape());

        let schema = DatasetSchema::introspect(&df, config);
        schema.require(&config.datetime_column, STAGE)?;
        schema.require(&config.entity_column, STAGE)?;

        let df = Self::split_timestamp(df, config, &schema, &mut report)?;
        let df = sort_by_entity_and_time(&df, &config.entity_column)?;
        let df = Self::deduplicate_days(df, config, &mut report)?;
        let df = Self::enforce_continuity(df, config, &mut report)?;
        let df = Self::round_order_columns(df, &schema, &mut report)?;
        let df = Self::round_sensor_columns(df, config, &schema, &mut report)?;
        let df = sort_by_entity_and_time(&df, &config.entity_column)?;
        report.add_action(PreprocessingAction::new(
            ActionType::RowsSorted,
            "dataset",
            format!("Sorted by '{}', '{}' and '{}'", config.entity_column, DATE_COLUMN, TIME_COLUMN),
        ));

        report.set_output_shape(df.shape());
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Structural cleansing: {:?} -> {:?}",
            (report.rows_before, report.columns_before),
            df.shape()
        );
        Ok((df, report))
    }

    /// Replace the timestamp column by `Date`, `Time` and (when present) the
    /// day-of-week column, at the timestamp's position.
    pub fn split_timestamp(
        mut df: DataFrame,
        config: &PipelineConfig,
        schema: &DatasetSchema,
        report: &mut StageReport,
    ) -> Result<DataFrame> {
        let raw = column_as_strings(&df, &config.datetime_column)?;
        let parsed = parse_timestamp_column(raw.iter().map(|v| v.as_deref()));

        if parsed.failures > 0 {
            warn!(
                "{} of {} timestamps in '{}' could not be parsed",
                parsed.failures,
                parsed.values.len(),
                config.datetime_column
            );
            report.add_warning(format!(
                "{} unparseable values in '{}'",
                parsed.failures, config.datetime_column
            ));
        }
        report.timestamp_parse_failures = parsed.failures;

        let dates: Vec<Option<String>> = parsed
            .values
            .iter()
            .map(|v| v.map(|ts| ts.format("%Y-%m-%d").to_string()))
            .collect();
        let times: Vec<Option<String>> = parsed
            .values
            .iter()
            .map(|v| v.map(|ts| ts.format("%H:%M:%S").to_string()))
            .collect();

        df.with_column(Series::new(DATE_COLUMN.into(), dates))?;
        df.with_column(Series::new(TIME_COLUMN.into(), times))?;

        let order = rebuild_column_order(
            &schema.columns,
            &config.datetime_column,
            &config.day_of_week_column,
            schema.has_day_of_week,
        );
        let df = df.select(order)?;

        report.add_action(PreprocessingAction::new(
            ActionType::TimestampSplit,
            &config.datetime_column,
            format!("Split into '{}' and '{}'", DATE_COLUMN, TIME_COLUMN),
        ));
        Ok(df)
    }

    /// Keep the last row per (entity, date) of a frame sorted by
    /// (entity, date, time), i.e. the latest record of the day.
    pub fn deduplicate_days(df: DataFrame, config: &PipelineConfig, report: &mut StageReport) -> Result<DataFrame> {
        let entities = column_as_strings(&df, &config.entity_column)?;
        let dates = column_as_strings(&df, DATE_COLUMN)?;

        let keep: Vec<bool> = (0..df.height())
            .map(|i| {
                i + 1 == df.height()
                    || entities[i] != entities[i + 1]
                    || dates[i] != dates[i + 1]
            })
            .collect();

        let before = df.height();
        let df = filter_rows(&df, &keep)?;
        let removed = before - df.height();

        info!("Removed {} same-day duplicate records", removed);
        if removed > 0 {
            report.add_action(
                PreprocessingAction::new(
                    ActionType::DuplicatesRemoved,
                    "dataset",
                    format!("Removed {} same-day records", removed),
                )
                .with_details("Kept the latest time per product and date"),
            );
        }
        Ok(df)
    }

    /// Drop every entity that does not have exactly the expected number of
    /// distinct dates, or that has a row without a date.
    pub fn enforce_continuity(df: DataFrame, config: &PipelineConfig, report: &mut StageReport) -> Result<DataFrame> {
        let entities = column_as_strings(&df, &config.entity_column)?;
        let dates = column_as_strings(&df, DATE_COLUMN)?;

        let mut seen_order: Vec<Option<&str>> = Vec::new();
        let mut distinct_dates: HashMap<Option<&str>, HashSet<&str>> = HashMap::new();
        let mut has_null_date: HashSet<Option<&str>> = HashSet::new();

        for (entity, date) in entities.iter().zip(dates.iter()) {
            let key = entity.as_deref();
            if !distinct_dates.contains_key(&key) {
                seen_order.push(key);
            }
            let entry = distinct_dates.entry(key).or_default();
            match date {
                Some(d) => {
                    entry.insert(d.as_str());
                }
                None => {
                    has_null_date.insert(key);
                }
            }
        }

        let expected = config.expected_observations;
        let valid: HashSet<Option<&str>> = seen_order
            .iter()
            .copied()
            .filter(|key| distinct_dates[key].len() == expected && !has_null_date.contains(key))
            .collect();

        let dropped: Vec<String> = seen_order
            .iter()
            .filter(|key| !valid.contains(*key))
            .map(|key| key.unwrap_or("<null>").to_string())
            .collect();

        for key in seen_order.iter().filter(|key| !valid.contains(*key)) {
            debug!(
                "Entity {:?} has {} distinct dates (expected {})",
                key,
                distinct_dates[key].len(),
                expected
            );
        }

        let keep: Vec<bool> = entities.iter().map(|e| valid.contains(&e.as_deref())).collect();
        let df = filter_rows(&df, &keep)?;

        info!(
            "{} of {} entities have exactly {} dates; dropped {}",
            valid.len(),
            seen_order.len(),
            expected,
            dropped.len()
        );
        if !dropped.is_empty() {
            report.add_action(
                PreprocessingAction::new(
                    ActionType::EntitiesRemoved,
                    &config.entity_column,
                    format!("Removed {} entities without exactly {} dates", dropped.len(), expected),
                )
                .with_details(dropped.join(", ")),
            );
        }
        report.dropped_entities = dropped;
        Ok(df)
    }

    /// Round order-quantity columns to whole numbers and store them as `Int64`.
    pub fn round_order_columns(mut df: DataFrame, schema: &DatasetSchema, report: &mut StageReport) -> Result<DataFrame> {
        for name in &schema.order_columns {
            let rounded: Vec<Option<i64>> = column_as_f64(&df, name)?
                .into_iter()
                .map(|v| v.map(|x| round_half_even(x, 0) as i64))
                .collect();
            df.replace(name, Series::new(name.as_str().into(), rounded))?;
        }

        if !schema.order_columns.is_empty() {
            debug!("Rounded order columns: {:?}", schema.order_columns);
            report.add_action(
                PreprocessingAction::new(
                    ActionType::ValuesRounded,
                    schema.order_columns.join(", "),
                    "Rounded order quantities to integers",
                )
                .with_details("Int64"),
            );
        }
        Ok(df)
    }

    /// Round sensor columns to the configured number of decimals.
    pub fn round_sensor_columns(
        mut df: DataFrame,
        config: &PipelineConfig,
        schema: &DatasetSchema,
        report: &mut StageReport,
    ) -> Result<DataFrame> {
        for name in &schema.sensor_columns {
            let rounded: Vec<Option<f64>> = column_as_f64(&df, name)?
                .into_iter()
                .map(|v| v.map(|x| round_half_even(x, config.sensor_precision)))
                .collect();
            df.replace(name, Series::new(name.as_str().into(), rounded))?;
            report.add_action(PreprocessingAction::new(
                ActionType::ValuesRounded,
                name,
                format!("Rounded to {} decimals", config.sensor_precision),
            ));
        }
        Ok(df)
    }
}

/// Column order after the timestamp split.
///
/// Existing `Date`/`Time` columns are overwritten, so they are dropped from
/// their old positions, as is the day-of-week column which moves next to them.
pub fn rebuild_column_order(
    columns: &[String],
    datetime_column: &str,
    day_of_week_column: &str,
    has_day_of_week: bool,
) -> Vec<String> {
    let mut ordered = Vec::with_capacity(columns.len() + 2);
    for name in columns {
        if name == DATE_COLUMN || name == TIME_COLUMN || name == day_of_week_column {
            continue;
        }
        if name == datetime_column {
            ordered.push(DATE_COLUMN.to_string());
            ordered.push(TIME_COLUMN.to_string());
            if has_day_of_week {
                ordered.push(day_of_week_column.to_string());
            }
        } else {
            ordered.push(name.clone());
        }
    }
    ordered
}

/// Stable sort by (entity, `Date`, `Time`), nulls last.
pub fn sort_by_entity_and_time(df: &DataFrame, entity_column: &str) -> Result<DataFrame> {
    let sorted = df.sort(
        [entity_column, DATE_COLUMN, TIME_COLUMN],
        SortMultipleOptions::default()
            .with_maintain_order(true)
            .with_nulls_last(true),
    )?;
    Ok(sorted)
}
