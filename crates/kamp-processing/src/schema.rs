//! Explicit schema introspection.
//!
//! Stages never rediscover columns ad hoc: they introspect the frame once
//! against the [`PipelineConfig`] naming conventions and pass the resulting
//! [`DatasetSchema`] to their steps.

use crate::config::PipelineConfig;
use crate::error::{PreprocessingError, Result};
use crate::utils::column_names;
use polars::prelude::*;
use serde::Serialize;

/// Column roles discovered in a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSchema {
    /// All columns in frame order.
    pub columns: Vec<String>,
    /// Columns whose name contains the order-quantity marker.
    pub order_columns: Vec<String>,
    /// Humidity/temperature columns, matched case-insensitively.
    pub sensor_columns: Vec<String>,
    /// Whether the day-of-week column is present.
    pub has_day_of_week: bool,
}

impl DatasetSchema {
    pub fn introspect(df: &DataFrame, config: &PipelineConfig) -> Self {
        let columns = column_names(df);

        let order_columns = columns
            .iter()
            .filter(|name| name.contains(config.order_marker.as_str()))
            .cloned()
            .collect();

        let sensor_names = [
            config.humidity_column.to_lowercase(),
            config.temperature_column.to_lowercase(),
        ];
        let sensor_columns = columns
            .iter()
            .filter(|name| sensor_names.contains(&name.to_lowercase()))
            .cloned()
            .collect();

        let has_day_of_week = columns.iter().any(|name| name == &config.day_of_week_column);

        Self {
            columns,
            order_columns,
            sensor_columns,
            has_day_of_week,
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Fail with a configuration error when `name` is absent.
    pub fn require(&self, name: &str, stage: &str) -> Result<()> {
        if self.has_column(name) {
            Ok(())
        } else {
            Err(PreprocessingError::column_not_found(name, stage))
        }
    }

    /// Fail when no order-quantity column exists.
    pub fn require_order_columns(&self, marker: &str) -> Result<&[String]> {
        if self.order_columns.is_empty() {
            Err(PreprocessingError::MissingOrderColumns(marker.to_string()))
        } else {
            Ok(&self.order_columns)
        }
    }
}
