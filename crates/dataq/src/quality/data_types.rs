//! Data-type analysis: mixed types and conversion candidates.

use crate::types::SemanticType;
use crate::utils::{
    distinct_count, is_float_dtype, is_text_dtype, non_null_f64, non_null_strings, parse_datetime,
    round_to,
};
use anyhow::Result;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const DATE_SAMPLE_SIZE: usize = 100;

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\d{4}-\d{2}-\d{2}").expect("Invalid regex: YYYY-MM-DD"),
        Regex::new(r"\d{2}/\d{2}/\d{4}").expect("Invalid regex: MM/DD/YYYY"),
        Regex::new(r"\d{2}-\d{2}-\d{4}").expect("Invalid regex: MM-DD-YYYY"),
        Regex::new(r"\d{4}/\d{2}/\d{2}").expect("Invalid regex: YYYY/MM/DD"),
    ]
});

const BOOLEAN_PAIRS: [[&str; 2]; 5] = [
    ["yes", "no"],
    ["true", "false"],
    ["y", "n"],
    ["1", "0"],
    ["t", "f"],
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub numeric: usize,
    pub categorical: usize,
    pub datetime: usize,
    pub boolean: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixedTypeColumn {
    pub column: String,
    pub types_found: Vec<String>,
    pub current_dtype: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatIntCandidate {
    pub column: String,
    pub reason: String,
    pub has_nulls: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanCandidate {
    pub column: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighCardinalityColumn {
    pub column: String,
    pub unique_count: usize,
    pub cardinality_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTypesReport {
    pub raw_types: BTreeMap<String, String>,
    pub type_summary: TypeSummary,
    pub mixed_type_columns: Vec<MixedTypeColumn>,
    pub possible_date_columns: Vec<String>,
    pub float_int_candidates: Vec<String>,
    pub float_int_details: Vec<FloatIntCandidate>,
    pub possible_boolean_columns: Vec<BooleanCandidate>,
    pub high_cardinality_strings: Vec<HighCardinalityColumn>,
    /// One suggestion per flagged column; later categories overwrite earlier ones.
    pub suggestions: BTreeMap<String, String>,
}

/// Detects type problems and conversion opportunities per column.
pub struct DataTypeAnalyzer;

impl DataTypeAnalyzer {
    pub fn analyze(df: &DataFrame) -> Result<DataTypesReport> {
        let rows = df.height();
        let mut report = DataTypesReport::default();

        for col in df.get_columns() {
            let name = col.name().to_string();
            let series = col.as_materialized_series();
            let dtype = series.dtype();
            report.raw_types.insert(name.clone(), dtype.to_string());

            match SemanticType::of(dtype) {
                SemanticType::Numeric => report.type_summary.numeric += 1,
                SemanticType::Categorical => report.type_summary.categorical += 1,
                SemanticType::Datetime => report.type_summary.datetime += 1,
                SemanticType::Boolean => report.type_summary.boolean += 1,
                SemanticType::Other => {}
            }

            if is_float_dtype(dtype) {
                if let Some(candidate) = float_int_candidate(&name, series)? {
                    report.float_int_details.push(candidate);
                }
                continue;
            }
            if !is_text_dtype(dtype) {
                continue;
            }

            let values = non_null_strings(series)?;
            if values.is_empty() {
                continue;
            }

            let kinds = cell_kinds(&values);
            if kinds.len() > 1 {
                report.mixed_type_columns.push(MixedTypeColumn {
                    column: name.clone(),
                    types_found: kinds.into_iter().map(str::to_string).collect(),
                    current_dtype: dtype.to_string(),
                });
            }

            if looks_like_dates(&values) {
                report.possible_date_columns.push(name.clone());
            }

            if let Some(pair) = boolean_values(&values) {
                report.possible_boolean_columns.push(BooleanCandidate {
                    column: name.clone(),
                    values: pair,
                });
            }

            let unique_count = distinct_count(series)?;
            if unique_count as f64 > rows as f64 * 0.8 && unique_count > 100 {
                report.high_cardinality_strings.push(HighCardinalityColumn {
                    column: name,
                    unique_count,
                    cardinality_ratio: round_to(unique_count as f64 / rows as f64, 2),
                });
            }
        }

        report.float_int_candidates = report
            .float_int_details
            .iter()
            .map(|c| c.column.clone())
            .collect();
        report.suggestions = build_suggestions(&report);

        debug!(
            "Data types: {} mixed, {} date, {} int, {} boolean candidates",
            report.mixed_type_columns.len(),
            report.possible_date_columns.len(),
            report.float_int_candidates.len(),
            report.possible_boolean_columns.len()
        );
        Ok(report)
    }
}

fn float_int_candidate(name: &str, series: &Series) -> Result<Option<FloatIntCandidate>> {
    let values = non_null_f64(series)?;
    if values.is_empty() || values.iter().any(|v| v.fract() != 0.0) {
        return Ok(None);
    }
    Ok(Some(FloatIntCandidate {
        column: name.to_string(),
        reason: "All values are whole numbers".to_string(),
        has_nulls: values.len() < series.len(),
    }))
}

/// Distinct runtime kinds of the cells, in first-seen order.
fn cell_kinds(values: &[String]) -> Vec<&'static str> {
    let mut kinds: Vec<&'static str> = Vec::new();
    for v in values {
        let kind = cell_kind(v);
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    kinds
}

fn cell_kind(value: &str) -> &'static str {
    let trimmed = value.trim();
    if trimmed.parse::<i64>().is_ok() {
        "int"
    } else if trimmed.parse::<f64>().is_ok() {
        "float"
    } else if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        "bool"
    } else {
        "str"
    }
}

/// Pattern hits (summed over all four layouts) must exceed half the sample,
/// and every sampled value must parse.
fn looks_like_dates(values: &[String]) -> bool {
    let sample = &values[..values.len().min(DATE_SAMPLE_SIZE)];
    let hits: usize = DATE_PATTERNS
        .iter()
        .map(|re| sample.iter().filter(|v| re.is_match(v)).count())
        .sum();
    if hits as f64 <= sample.len() as f64 * 0.5 {
        return false;
    }
    sample.iter().all(|v| parse_datetime(v).is_some())
}

/// The two distinct values (first-seen order) if they form a boolean pair.
fn boolean_values(values: &[String]) -> Option<Vec<String>> {
    let mut distinct: Vec<&str> = Vec::with_capacity(2);
    for v in values {
        if !distinct.contains(&v.as_str()) {
            if distinct.len() == 2 {
                return None;
            }
            distinct.push(v);
        }
    }
    if distinct.len() != 2 {
        return None;
    }

    let lowered: BTreeSet<String> = distinct.iter().map(|v| v.to_lowercase()).collect();
    BOOLEAN_PAIRS
        .iter()
        .any(|pair| lowered == pair.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>())
        .then(|| distinct.iter().map(|v| v.to_string()).collect())
}

fn build_suggestions(report: &DataTypesReport) -> BTreeMap<String, String> {
    let mut suggestions = BTreeMap::new();
    for item in &report.mixed_type_columns {
        suggestions.insert(
            item.column.clone(),
            "Column has mixed data types. Clean or standardize values before conversion."
                .to_string(),
        );
    }
    for col in &report.possible_date_columns {
        suggestions.insert(
            col.clone(),
            "Convert to datetime for time-based analysis.".to_string(),
        );
    }
    for item in &report.float_int_details {
        let text = if item.has_nulls {
            "Convert to Int64 (nullable integer) to preserve null values."
        } else {
            "Convert to int64 for memory efficiency."
        };
        suggestions.insert(item.column.clone(), text.to_string());
    }
    for item in &report.possible_boolean_columns {
        suggestions.insert(
            item.column.clone(),
            format!("Convert to boolean. Values: [{}]", item.values.join(", ")),
        );
    }
    for item in &report.high_cardinality_strings {
        suggestions.insert(
            item.column.clone(),
            "High cardinality string. Consider if this should be a separate lookup table."
                .to_string(),
        );
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_summary_and_raw_types() {
        let df = df! {
            "a" => [1i64, 2],
            "b" => [1.5f64, 2.5],
            "c" => ["x", "y"],
            "d" => [true, false],
        }
        .unwrap();
        let report = DataTypeAnalyzer::analyze(&df).unwrap();
        assert_eq!(
            report.type_summary,
            TypeSummary {
                numeric: 2,
                categorical: 1,
                datetime: 0,
                boolean: 1
            }
        );
        assert_eq!(report.raw_types.len(), 4);
    }

    #[test]
    fn test_boolean_candidate() {
        let df = df! {
            "subscribed" => ["Yes", "No", "Yes", "No", "Yes"],
            "grade" => ["A", "B", "A", "B", "A"],
        }
        .unwrap();
        let report = DataTypeAnalyzer::analyze(&df).unwrap();
        assert_eq!(
            report.possible_boolean_columns,
            vec![BooleanCandidate {
                column: "subscribed".to_string(),
                values: vec!["Yes".to_string(), "No".to_string()],
            }]
        );
        assert_eq!(
            report.suggestions["subscribed"],
            "Convert to boolean. Values: [Yes, No]"
        );
        assert!(!report.suggestions.contains_key("grade"));
    }

    #[test]
    fn test_date_candidate() {
        let df = df! {
            "joined" => ["2024-01-15", "2024-02-20", "2023-12-01"],
            "mixed" => ["2024-01-15", "soon", "later"],
        }
        .unwrap();
        let report = DataTypeAnalyzer::analyze(&df).unwrap();
        assert_eq!(report.possible_date_columns, vec!["joined".to_string()]);
    }

    #[test]
    fn test_unparseable_dates_rejected() {
        let df = df! {
            "fake" => ["2024-99-99", "2024-98-01", "2024-97-02"],
        }
        .unwrap();
        let report = DataTypeAnalyzer::analyze(&df).unwrap();
        assert!(report.possible_date_columns.is_empty());
    }

    #[test]
    fn test_float_int_candidates() {
        let df = df! {
            "whole" => [Some(1.0f64), None, Some(3.0)],
            "dense" => [1.0f64, 2.0, 3.0],
            "fraction" => [1.5f64, 2.0, 3.0],
        }
        .unwrap();
        let report = DataTypeAnalyzer::analyze(&df).unwrap();
        assert_eq!(report.float_int_candidates, vec!["whole", "dense"]);
        assert!(report.float_int_details[0].has_nulls);
        assert!(!report.float_int_details[1].has_nulls);
        assert_eq!(
            report.suggestions["whole"],
            "Convert to Int64 (nullable integer) to preserve null values."
        );
        assert_eq!(
            report.suggestions["dense"],
            "Convert to int64 for memory efficiency."
        );
    }

    #[test]
    fn test_mixed_types() {
        let df = df! {
            "amount" => ["12", "13.5", "n/a", "14"],
            "labels" => ["A", "B", "C", "D"],
        }
        .unwrap();
        let report = DataTypeAnalyzer::analyze(&df).unwrap();
        assert_eq!(report.mixed_type_columns.len(), 1);
        assert_eq!(
            report.mixed_type_columns[0].types_found,
            vec!["int", "float", "str"]
        );
    }

    #[test]
    fn test_high_cardinality() {
        let ids: Vec<String> = (0..150).map(|i| format!("user-{i}")).collect();
        let df = df! { "handle" => ids }.unwrap();
        let report = DataTypeAnalyzer::analyze(&df).unwrap();
        assert_eq!(report.high_cardinality_strings.len(), 1);
        assert_eq!(report.high_cardinality_strings[0].unique_count, 150);
        assert_eq!(report.high_cardinality_strings[0].cardinality_ratio, 1.0);
    }

    #[test]
    fn test_last_writer_wins() {
        let dates: Vec<String> = (1..=12)
            .flat_map(|m| (1..=28).map(move |d| format!("2020-{m:02}-{d:02}")))
            .take(150)
            .collect();
        let df = df! { "day" => dates }.unwrap();
        let report = DataTypeAnalyzer::analyze(&df).unwrap();
        assert_eq!(report.possible_date_columns, vec!["day".to_string()]);
        assert_eq!(report.high_cardinality_strings.len(), 1);
        assert_eq!(
            report.suggestions["day"],
            "High cardinality string. Consider if this should be a separate lookup table."
        );
    }

    #[test]
    fn test_numeric_pair_is_boolean() {
        let df = df! { "flag" => ["1", "0", "1", "0"] }.unwrap();
        let report = DataTypeAnalyzer::analyze(&df).unwrap();
        assert!(report.mixed_type_columns.is_empty());
        assert_eq!(report.possible_boolean_columns.len(), 1);
    }
}
