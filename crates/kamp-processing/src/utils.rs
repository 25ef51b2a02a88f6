//! Shared utilities for the cleansing pipeline.
//!
//! This module contains common helper functions used across multiple stages
//! to reduce code duplication and ensure consistency.

use polars::prelude::*;
use std::collections::HashSet;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Column names of a DataFrame as owned strings, in frame order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 2] = [',', ' '];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// # Example
///
/// ```rust,ignore
/// use kamp_processing::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string(" 1,234.5 "), "1234.5");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Try to parse a string as a numeric value (f64).
///
/// Textual NaN/infinity spellings are rejected so they never sneak in as values.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Lower-cased, trimmed view of a null-token list.
pub fn null_token_set(tokens: &[String]) -> HashSet<String> {
    tokens.iter().map(|t| t.trim().to_lowercase()).collect()
}

/// Check whether a raw cell value is one of the null tokens.
///
/// Matching ignores case and surrounding whitespace, so `" N/A "`, `"none"`
/// and `"NaN"` all count as missing when the canonical token is listed.
pub fn is_null_token(value: &str, token_set: &HashSet<String>) -> bool {
    token_set.contains(&value.trim().to_lowercase())
}

// =============================================================================
// Rounding Utilities
// =============================================================================

/// Round to `digits` decimal places, ties to even.
///
/// Matches the numeric libraries the downstream training scripts use, so
/// `2.5` becomes `2` and `0.0125` at 3 digits becomes `0.012`.
pub fn round_half_even(value: f64, digits: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(digits as i32);
    (value * factor).round_ties_even() / factor
}

// =============================================================================
// Column Extraction Utilities
// =============================================================================

/// Read a column as `f64` values. String columns are parsed leniently;
/// unparseable cells become `None`.
pub fn column_as_f64(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let series = df.column(name)?.as_materialized_series();
    if series.dtype() == &DataType::String {
        Ok(series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_numeric_string))
            .collect())
    } else {
        let casted = series.cast(&DataType::Float64)?;
        Ok(casted.f64()?.into_iter().collect())
    }
}

/// Read a column as owned strings, casting non-string columns first.
pub fn column_as_strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let series = df.column(name)?.as_materialized_series();
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Total number of null cells across all columns.
pub fn total_null_count(df: &DataFrame) -> usize {
    df.get_columns().iter().map(|col| col.null_count()).sum()
}

// =============================================================================
// Row Filtering Utilities
// =============================================================================

/// Keep the rows whose flag is `true`, preserving order.
pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> PolarsResult<DataFrame> {
    let mask = BooleanChunked::from_slice(PlSmallStr::from_static("keep"), keep);
    df.filter(&mask)
}

/// Row flags that are `true` where no column holds a null.
pub fn complete_row_mask(df: &DataFrame) -> Vec<bool> {
    let mut keep = vec![true; df.height()];
    for col in df.get_columns() {
        let nulls = col.as_materialized_series().is_null();
        for (flag, is_null) in keep.iter_mut().zip(nulls.into_iter()) {
            if is_null.unwrap_or(false) {
                *flag = false;
            }
        }
    }
    keep
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("42"), Some(42.0));
        assert_eq!(parse_numeric_string(" 1,234.5 "), Some(1234.5));
        assert_eq!(parse_numeric_string("-1"), Some(-1.0));
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("NaN"), None);
        assert_eq!(parse_numeric_string("P-001"), None);
    }

    #[test]
    fn test_is_null_token_ignores_case_and_padding() {
        let tokens = null_token_set(&["NA".to_string(), "None".to_string(), "".to_string()]);
        assert!(is_null_token("na", &tokens));
        assert!(is_null_token("  NONE ", &tokens));
        assert!(is_null_token("   ", &tokens));
        assert!(!is_null_token("0", &tokens));
        assert!(!is_null_token("nan", &tokens));
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(2.5, 0), 2.0);
        assert_eq!(round_half_even(3.5, 0), 4.0);
        assert_eq!(round_half_even(-1.4, 0), -1.0);
        assert_eq!(round_half_even(23.45678, 3), 23.457);
        assert_eq!(round_half_even(10.0, 3), 10.0);
    }

    #[test]
    fn test_column_as_f64_parses_strings() {
        let df = df![
            "text" => [Some("1.5"), Some("oops"), None],
            "ints" => [1i64, 2, 3],
        ]
        .unwrap();

        assert_eq!(
            column_as_f64(&df, "text").unwrap(),
            vec![Some(1.5), None, None]
        );
        assert_eq!(
            column_as_f64(&df, "ints").unwrap(),
            vec![Some(1.0), Some(2.0), Some(3.0)]
        );
    }

    #[test]
    fn test_complete_row_mask_and_filter() {
        let df = df![
            "a" => [Some(1.0), None, Some(3.0)],
            "b" => [Some("x"), Some("y"), None],
        ]
        .unwrap();

        let keep = complete_row_mask(&df);
        assert_eq!(keep, vec![true, false, false]);

        let filtered = filter_rows(&df, &keep).unwrap();
        assert_eq!(filtered.height(), 1);
        assert_eq!(total_null_count(&filtered), 0);
    }
}
