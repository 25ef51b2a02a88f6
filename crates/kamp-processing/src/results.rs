//! Forecast results reader.
//!
//! The training scripts write one `<product>_pred.csv` per product plus an
//! ensemble summary into a shared directory. This module gathers the
//! per-product files into a single list of records, the shape the dashboard
//! consumes.

use crate::error::{PreprocessingError, Result};
use crate::io::read_csv_as_text;
use crate::utils::{column_as_strings, column_names, parse_numeric_string};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PRODUCT_COLUMN: &str = "Product_Number";
const DATE_COLUMN: &str = "Date";

/// One forecast row for one product.
///
/// Missing cells read as `0`, the date included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    #[serde(rename = "Date", default = "missing_cell")]
    pub date: Value,
    #[serde(rename = "Product_Number")]
    pub product_number: String,
    #[serde(rename = "Pred_Value", default)]
    pub pred_value: f64,
    #[serde(rename = "MAE", default)]
    pub mae: f64,
    #[serde(rename = "SMAPE", default)]
    pub smape: f64,
    #[serde(rename = "Accuracy", default)]
    pub accuracy: f64,
    /// Any further columns, numbers where they parse, text otherwise.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Reads per-product forecast files from a results directory.
pub struct ForecastResultsReader {
    dir: PathBuf,
    summary_prefix: String,
}

impl ForecastResultsReader {
    pub fn new(dir: impl Into<PathBuf>, summary_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            summary_prefix: summary_prefix.into(),
        }
    }

    /// Read every per-product file, sorted by product.
    ///
    /// Every record carries the union of the extra columns seen across all
    /// files; a column a file lacks reads as `0`. Files that fail to parse or
    /// have no `Product_Number` column are skipped with a warning. Errors only
    /// when the directory is missing or nothing readable is left.
    pub fn read_all(&self) -> Result<Vec<ForecastRecord>> {
        if !self.dir.is_dir() {
            return Err(PreprocessingError::ResultsDirNotFound(self.dir.clone()));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| self.is_forecast_file(path))
            .collect();
        files.sort();

        let mut records = Vec::new();
        let mut readable = 0usize;
        for path in &files {
            match read_forecast_file(path) {
                Ok(Some(mut file_records)) => {
                    readable += 1;
                    debug!("{}: {} records", path.display(), file_records.len());
                    records.append(&mut file_records);
                }
                Ok(None) => debug!("Skipping {}: no {} column", path.display(), PRODUCT_COLUMN),
                Err(e) => warn!("Skipping unreadable forecast file {}: {}", path.display(), e),
            }
        }

        if readable == 0 {
            return Err(PreprocessingError::NoForecastFiles(self.dir.clone()));
        }

        fill_missing_columns(&mut records);
        records.sort_by(|a, b| a.product_number.cmp(&b.product_number));
        info!("Loaded {} forecast records from {} files", records.len(), readable);
        Ok(records)
    }

    fn is_forecast_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        name.ends_with(".csv") && !name.to_lowercase().starts_with(&self.summary_prefix.to_lowercase())
    }
}

/// Product identifier encoded in a forecast file name.
pub fn product_from_file_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().replace("_pred", ""))
        .unwrap_or_default()
}

fn read_forecast_file(path: &Path) -> Result<Option<Vec<ForecastRecord>>> {
    let df = read_csv_as_text(path)?;
    let names = column_names(&df);
    if !names.iter().any(|n| n == PRODUCT_COLUMN) {
        return Ok(None);
    }

    let product = product_from_file_name(path);
    let columns = names
        .iter()
        .map(|name| column_as_strings(&df, name).map(|values| (name.as_str(), values)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let records = (0..df.height())
        .map(|row| {
            let mut record = ForecastRecord {
                date: missing_cell(),
                product_number: product.clone(),
                pred_value: 0.0,
                mae: 0.0,
                smape: 0.0,
                accuracy: 0.0,
                extra: BTreeMap::new(),
            };
            for (name, values) in &columns {
                let cell = values[row].as_deref();
                let metric = cell.and_then(parse_numeric_string).unwrap_or(0.0);
                match *name {
                    PRODUCT_COLUMN => {}
                    DATE_COLUMN => record.date = cell.map_or_else(missing_cell, Value::from),
                    "Pred_Value" => record.pred_value = metric,
                    "MAE" => record.mae = metric,
                    "SMAPE" => record.smape = metric,
                    "Accuracy" => record.accuracy = metric,
                    other => {
                        record.extra.insert(other.to_string(), cell_to_json(cell));
                    }
                }
            }
            record
        })
        .collect();

    Ok(Some(records))
}

fn missing_cell() -> Value {
    Value::from(0)
}

/// Give every record the extra columns any other file had.
fn fill_missing_columns(records: &mut [ForecastRecord]) {
    let all_columns: BTreeSet<String> = records
        .iter()
        .flat_map(|record| record.extra.keys().cloned())
        .collect();

    for record in records.iter_mut() {
        for column in &all_columns {
            record.extra.entry(column.clone()).or_insert_with(missing_cell);
        }
    }
}

/// Missing cells become `0`; numeric text becomes a number.
fn cell_to_json(cell: Option<&str>) -> Value {
    match cell {
        None => missing_cell(),
        Some(text) => match parse_numeric_string(text) {
            Some(n) => Value::from(n),
            None => Value::from(text),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_product_from_file_name() {
        assert_eq!(product_from_file_name(Path::new("out/P-100_pred.csv")), "P-100");
        assert_eq!(product_from_file_name(Path::new("P7.csv")), "P7");
    }

    #[test]
    fn test_cell_to_json() {
        assert_eq!(cell_to_json(None), Value::from(0));
        assert_eq!(cell_to_json(Some("1.5")), Value::from(1.5));
        assert_eq!(cell_to_json(Some("line-a")), Value::from("line-a"));
    }

    #[test]
    fn test_missing_directory() {
        let reader = ForecastResultsReader::new("/no/such/dir", "ensemble_summary");
        let err = reader.read_all().unwrap_err();
        assert_eq!(err.error_code(), "RESULTS_DIR_NOT_FOUND");
    }

    #[test]
    fn test_reads_sorts_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("B_pred.csv"),
            "Date,Product_Number,Pred_Value,MAE,SMAPE,Accuracy\n2022-05-12,x,10.5,1,2,98\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("A_pred.csv"),
            "Date,Product_Number,Pred_Value,MAE,SMAPE,Accuracy\n2022-05-12,x,oops,,3,97\n",
        )
        .unwrap();
        fs::write(dir.path().join("Ensemble_Summary_all.csv"), "Product_Number,MAE\nA,1\n").unwrap();
        fs::write(dir.path().join("notes.csv"), "Date,Value\n2022-05-12,1\n").unwrap();
        fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

        let records = ForecastResultsReader::new(dir.path(), "ensemble_summary")
            .read_all()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product_number, "A");
        assert_eq!(records[0].pred_value, 0.0);
        assert_eq!(records[0].mae, 0.0);
        assert_eq!(records[0].smape, 3.0);
        assert_eq!(records[1].product_number, "B");
        assert_eq!(records[1].pred_value, 10.5);
        assert_eq!(records[1].date, "2022-05-12");
    }

    #[test]
    fn test_no_readable_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ensemble_summary.csv"), "Product_Number\nA\n").unwrap();

        let err = ForecastResultsReader::new(dir.path(), "ensemble_summary")
            .read_all()
            .unwrap_err();
        assert_eq!(err.error_code(), "NO_FORECAST_FILES");
    }

    #[test]
    fn test_records_serialize_with_column_names() {
        let record = ForecastRecord {
            date: Value::from("2022-05-12"),
            product_number: "A".to_string(),
            pred_value: 1.0,
            mae: 0.5,
            smape: 2.0,
            accuracy: 98.0,
            extra: BTreeMap::from([("Model".to_string(), Value::from("lgbm"))]),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Product_Number"], "A");
        assert_eq!(json["Pred_Value"], 1.0);
        assert_eq!(json["Model"], "lgbm");
    }

    #[test]
    fn test_extra_columns_are_shared_across_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("A_pred.csv"),
            "Date,Product_Number,Pred_Value,Model\n2022-05-12,x,1,lgbm\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("B_pred.csv"),
            "Date,Product_Number,Pred_Value,Lag\n2022-05-12,x,2,7\n",
        )
        .unwrap();

        let records = ForecastResultsReader::new(dir.path(), "ensemble_summary")
            .read_all()
            .unwrap();

        assert_eq!(records[0].extra["Model"], Value::from("lgbm"));
        assert_eq!(records[0].extra["Lag"], Value::from(0));
        assert_eq!(records[1].extra["Model"], Value::from(0));
        assert_eq!(records[1].extra["Lag"], Value::from(7.0));

        let json = serde_json::to_value(&records).unwrap();
        assert_eq!(json[1]["Model"], 0);
    }

    #[test]
    fn test_missing_date_reads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("A_pred.csv"),
            "Date,Product_Number,Pred_Value\n,x,1\n2022-05-13,x,2\n",
        )
        .unwrap();

        let records = ForecastResultsReader::new(dir.path(), "ensemble_summary")
            .read_all()
            .unwrap();

        assert_eq!(records[0].date, Value::from(0));
        assert_eq!(records[1].date, "2022-05-13");
        assert_eq!(serde_json::to_value(&records[0]).unwrap()["Date"], 0);
    }
}
