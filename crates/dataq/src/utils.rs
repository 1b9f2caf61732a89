//! Shared utilities for the analyzers and the cleaning stage.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::{HashMap, HashSet};

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

/// Check if a DataType is a floating point type.
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Check if a DataType holds text (plain strings or categoricals).
#[inline]
pub fn is_text_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

/// Names of all columns, in schema order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

/// Names of the columns whose dtype satisfies `predicate`, in schema order.
pub fn columns_where(df: &DataFrame, predicate: impl Fn(&DataType) -> bool) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| predicate(col.dtype()))
        .map(|col| col.name().to_string())
        .collect()
}

/// Estimated in-memory footprint in megabytes.
pub fn memory_usage_mb(df: &DataFrame) -> f64 {
    df.estimated_size() as f64 / (1024.0 * 1024.0)
}

// =============================================================================
// Identifier-like Column Names
// =============================================================================

/// Name fragments that mark a numeric column as an identifier rather than a measurement.
pub const IDENTIFIER_PATTERNS: [&str; 5] = ["id", "key", "index", "number", "code"];

/// Name fragments ignored by the subset duplicate check.
pub const SUBSET_IGNORE_PATTERNS: [&str; 2] = ["id", "index"];

/// Case-insensitive substring match of `name` against any pattern.
pub fn name_contains_any(name: &str, patterns: &[&str]) -> bool {
    let lower = name.to_lowercase();
    patterns.iter().any(|p| lower.contains(p))
}

/// Numeric columns excluding identifier-like names.
pub fn measurement_columns(df: &DataFrame) -> Vec<String> {
    columns_where(df, is_numeric_dtype)
        .into_iter()
        .filter(|name| !name_contains_any(name, &IDENTIFIER_PATTERNS))
        .collect()
}

// =============================================================================
// Value Extraction
// =============================================================================

/// Values of a column as `f64`, with nulls and non-finite values (NaN, ±inf)
/// as `None`.
pub fn numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

/// Non-null values of a column as `f64`, in row order.
pub fn non_null_f64(series: &Series) -> Result<Vec<f64>> {
    Ok(numeric_values(series)?.into_iter().flatten().collect())
}

/// Per-row missing flags. Float NaN and ±inf count as missing alongside null.
pub fn missing_mask(series: &Series) -> Result<Vec<bool>> {
    if is_float_dtype(series.dtype()) {
        return Ok(numeric_values(series)?.iter().map(Option::is_none).collect());
    }
    Ok(series
        .is_null()
        .into_iter()
        .map(|v| v.unwrap_or(false))
        .collect())
}

/// Values of any column rendered as strings, with nulls as `None`.
///
/// Falls back to per-cell formatting for dtypes that cannot be cast to text.
pub fn column_strings(series: &Series) -> Result<Vec<Option<String>>> {
    match series.cast(&DataType::String) {
        Ok(casted) => Ok(casted
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()),
        Err(_) => Ok((0..series.len())
            .map(|i| {
                series
                    .get(i)
                    .ok()
                    .filter(|v| !v.is_null())
                    .map(|v| v.to_string())
            })
            .collect()),
    }
}

/// Non-null values of a column rendered as strings, in row order.
pub fn non_null_strings(series: &Series) -> Result<Vec<String>> {
    Ok(column_strings(series)?.into_iter().flatten().collect())
}

/// Number of distinct non-missing values.
///
/// Float columns count only finite values, so NaN is never a distinct value.
/// `-0.0` and `0.0` are the same value.
pub fn distinct_count(series: &Series) -> Result<usize> {
    if is_float_dtype(series.dtype()) {
        let distinct: HashSet<u64> = numeric_values(series)?
            .into_iter()
            .flatten()
            .map(|v| if v == 0.0 { 0.0f64 } else { v }.to_bits())
            .collect();
        return Ok(distinct.len());
    }
    Ok(series.drop_nulls().n_unique()?)
}

/// One key per row built from the given columns; equal keys mean equal rows.
///
/// Nulls are encoded distinctly from any string value, so a null and the
/// literal text "null" never collide.
pub fn row_keys(df: &DataFrame, columns: &[String]) -> Result<Vec<String>> {
    let mut keys = vec![String::new(); df.height()];
    for name in columns {
        let values = column_strings(df.column(name)?.as_materialized_series())?;
        for (key, value) in keys.iter_mut().zip(values) {
            match value {
                Some(s) => {
                    key.push('\u{2}');
                    key.push_str(&s);
                    key.push('\u{3}');
                }
                None => key.push('\u{0}'),
            }
        }
    }
    Ok(keys)
}

/// Frequency of each value, most frequent first; ties keep first-seen order.
pub fn value_counts<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, value) in values.into_iter().enumerate() {
        counts.entry(value).or_insert((0, idx)).0 += 1;
    }

    let mut ordered: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(value, (count, first))| (value, count, first))
        .collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ordered
        .into_iter()
        .map(|(value, count, _)| (value.to_string(), count))
        .collect()
}

/// Most frequent value; ties resolve to the lexicographically smallest.
pub fn string_mode<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let counts = value_counts(values);
    let top = counts.first()?.1;
    counts
        .into_iter()
        .filter(|(_, count)| *count == top)
        .map(|(value, _)| value)
        .min()
}

// =============================================================================
// Numeric Helpers
// =============================================================================

/// Round to a fixed number of decimal places.
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `part / total * 100`, or 0 for an empty total.
#[inline]
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

// =============================================================================
// Date Parsing
// =============================================================================

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d", "%d.%m.%Y"];

/// Parse a date or datetime string in any of the supported layouts.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== dtype tests ====================

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(is_numeric_dtype(&DataType::UInt8));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_columns_where() {
        let df = df! {
            "a" => [1i64, 2, 3],
            "b" => ["x", "y", "z"],
            "c" => [1.0f64, 2.0, 3.0],
        }
        .unwrap();
        assert_eq!(columns_where(&df, is_numeric_dtype), vec!["a", "c"]);
        assert_eq!(columns_where(&df, is_text_dtype), vec!["b"]);
    }

    #[test]
    fn test_measurement_columns_skip_identifiers() {
        let df = df! {
            "customer_id" => [1i64, 2, 3],
            "Zip_Code" => [10i64, 20, 30],
            "amount" => [1.5f64, 2.5, 3.5],
        }
        .unwrap();
        assert_eq!(measurement_columns(&df), vec!["amount"]);
    }

    // ==================== extraction tests ====================

    #[test]
    fn test_numeric_values_keeps_nulls() {
        let s = Series::new("v".into(), &[Some(1i32), None, Some(3)]);
        assert_eq!(numeric_values(&s).unwrap(), vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(non_null_f64(&s).unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_non_finite_values_are_missing() {
        let s = Series::new(
            "v".into(),
            &[Some(1.0f64), Some(f64::INFINITY), Some(f64::NAN), None, Some(f64::NEG_INFINITY)],
        );
        assert_eq!(
            numeric_values(&s).unwrap(),
            vec![Some(1.0), None, None, None, None]
        );
        assert_eq!(missing_mask(&s).unwrap(), vec![false, true, true, true, true]);
    }

    #[test]
    fn test_column_strings_of_numbers() {
        let s = Series::new("v".into(), &[Some(1i64), None]);
        assert_eq!(
            column_strings(&s).unwrap(),
            vec![Some("1".to_string()), None]
        );
    }

    #[test]
    fn test_distinct_count_ignores_nulls() {
        let s = Series::new("v".into(), &[Some("a"), None, Some("a"), Some("b")]);
        assert_eq!(distinct_count(&s).unwrap(), 2);
    }

    #[test]
    fn test_distinct_count_ignores_nan() {
        let s = Series::new(
            "v".into(),
            &[Some(1.0f64), Some(f64::NAN), Some(f64::NAN), None, Some(1.0), Some(2.0)],
        );
        assert_eq!(distinct_count(&s).unwrap(), 2);

        let zeros = Series::new("z".into(), &[0.0f64, -0.0]);
        assert_eq!(distinct_count(&zeros).unwrap(), 1);
    }

    #[test]
    fn test_row_keys_distinguish_null_from_text() {
        let df = df! {
            "a" => [Some("null"), None, Some("null")],
        }
        .unwrap();
        let keys = row_keys(&df, &column_names(&df)).unwrap();
        assert_ne!(keys[0], keys[1]);
        assert_eq!(keys[0], keys[2]);
    }

    #[test]
    fn test_row_keys_respect_column_boundaries() {
        let df = df! {
            "a" => ["ab", "a"],
            "b" => ["c", "bc"],
        }
        .unwrap();
        let keys = row_keys(&df, &column_names(&df)).unwrap();
        assert_ne!(keys[0], keys[1]);
    }

    #[test]
    fn test_value_counts_order() {
        let counts = value_counts(["b", "a", "a", "c", "b", "a"]);
        assert_eq!(
            counts,
            vec![
                ("a".to_string(), 3),
                ("b".to_string(), 2),
                ("c".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_string_mode_tie_breaks_smallest() {
        assert_eq!(string_mode(["b", "a", "b", "a"]), Some("a".to_string()));
        assert_eq!(string_mode(Vec::<&str>::new()), None);
    }

    // ==================== numeric helper tests ====================

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(round_to(2.0 / 3.0, 3), 0.667);
    }

    #[test]
    fn test_percentage_empty_total() {
        assert_eq!(percentage(5, 0), 0.0);
        assert_eq!(percentage(5, 100), 5.0);
    }

    // ==================== date parsing tests ====================

    #[test]
    fn test_parse_datetime_formats() {
        assert!(parse_datetime("2024-01-15").is_some());
        assert!(parse_datetime("01/15/2024").is_some());
        assert!(parse_datetime("01-15-2024").is_some());
        assert!(parse_datetime("2024/01/15").is_some());
        assert!(parse_datetime("2024-01-15 10:30:00").is_some());
        assert!(parse_datetime("2024-01-15T10:30:00Z").is_some());
        assert!(parse_datetime("not a date").is_none());
        assert!(parse_datetime("2024-13-45").is_none());
    }
}
