//! Text consistency checks over string and categorical columns.

use crate::stats::{mean, std_dev};
use crate::types::Severity;
use crate::utils::{
    columns_where, is_text_dtype, non_null_strings, percentage, round_to, value_counts,
};
use anyhow::Result;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

static SPECIAL_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("Invalid regex: special characters"));
static HAS_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z]").expect("Invalid regex: letters"));
static HAS_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").expect("Invalid regex: digits"));

/// Values occurring fewer times than this are rare.
const RARE_THRESHOLD: usize = 5;

/// A per-column finding with a few offending values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledIssue {
    pub count: usize,
    pub percentage: f64,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseIssue {
    pub unique_original: usize,
    pub unique_normalized: usize,
    pub potential_duplicates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountIssue {
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RareCategories {
    pub rare_count: usize,
    pub total_unique: usize,
    pub percentage_rare: f64,
    pub examples: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthSpread {
    pub min_length: usize,
    pub max_length: usize,
    pub mean_length: f64,
    pub std_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InconsistencySummary {
    pub total_categorical_columns: usize,
    pub columns_with_issues: usize,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InconsistenciesReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<InconsistencySummary>,
    /// Set instead of `summary` when there is nothing to inspect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub strip_issues: BTreeMap<String, SampledIssue>,
    pub case_issues: BTreeMap<String, CaseIssue>,
    pub special_char_issues: BTreeMap<String, SampledIssue>,
    pub mixed_alphanumeric: BTreeMap<String, CountIssue>,
    pub rare_categories: BTreeMap<String, RareCategories>,
    pub inconsistent_formats: BTreeMap<String, LengthSpread>,
    pub suggestions: BTreeMap<String, Vec<String>>,
}

impl InconsistenciesReport {
    /// Findings counted towards severity and scoring. Length spread is
    /// informational only.
    pub fn issue_count(&self) -> usize {
        self.strip_issues.len()
            + self.case_issues.len()
            + self.special_char_issues.len()
            + self.mixed_alphanumeric.len()
            + self.rare_categories.len()
    }
}

/// Whitespace, casing, symbol, rare-value and length checks on text columns.
pub struct InconsistencyAnalyzer;

impl InconsistencyAnalyzer {
    pub fn analyze(df: &DataFrame) -> Result<InconsistenciesReport> {
        let text_columns = columns_where(df, is_text_dtype);
        if text_columns.is_empty() {
            return Ok(InconsistenciesReport {
                note: Some("No categorical columns found".to_string()),
                ..Default::default()
            });
        }

        let mut report = InconsistenciesReport::default();

        for name in &text_columns {
            let values = non_null_strings(df.column(name)?.as_materialized_series())?;
            if values.is_empty() {
                continue;
            }
            Self::inspect_column(name, &values, &mut report);
        }

        report.suggestions = build_suggestions(&report);

        let columns_with_issues = report.issue_count();
        let severity = match columns_with_issues {
            0 => Severity::None,
            1..=2 => Severity::Low,
            3..=5 => Severity::Medium,
            _ => Severity::High,
        };

        debug!(
            "Inconsistencies: {} findings across {} text columns",
            columns_with_issues,
            text_columns.len()
        );

        report.summary = Some(InconsistencySummary {
            total_categorical_columns: text_columns.len(),
            columns_with_issues,
            severity,
        });
        Ok(report)
    }

    fn inspect_column(name: &str, values: &[String], report: &mut InconsistenciesReport) {
        let total = values.len();

        let padded: Vec<&String> = values.iter().filter(|v| v.trim() != v.as_str()).collect();
        if !padded.is_empty() {
            report.strip_issues.insert(
                name.to_string(),
                SampledIssue {
                    count: padded.len(),
                    percentage: round_to(percentage(padded.len(), total), 2),
                    examples: padded.iter().take(3).map(|v| v.to_string()).collect(),
                },
            );
        }

        let unique_original = values.iter().collect::<HashSet<_>>().len();
        let unique_normalized = values
            .iter()
            .map(|v| v.to_lowercase())
            .collect::<HashSet<_>>()
            .len();
        if unique_normalized < unique_original {
            report.case_issues.insert(
                name.to_string(),
                CaseIssue {
                    unique_original,
                    unique_normalized,
                    potential_duplicates: unique_original - unique_normalized,
                },
            );
        }

        let special: Vec<&String> = values.iter().filter(|v| SPECIAL_CHAR.is_match(v)).collect();
        if !special.is_empty() {
            report.special_char_issues.insert(
                name.to_string(),
                SampledIssue {
                    count: special.len(),
                    percentage: round_to(percentage(special.len(), total), 2),
                    examples: special.iter().take(3).map(|v| v.to_string()).collect(),
                },
            );
        }

        let mixed = values
            .iter()
            .filter(|v| HAS_LETTER.is_match(v) && HAS_DIGIT.is_match(v))
            .count();
        if mixed > 0 && (mixed as f64) < total as f64 * 0.9 {
            report.mixed_alphanumeric.insert(
                name.to_string(),
                CountIssue {
                    count: mixed,
                    percentage: round_to(percentage(mixed, total), 2),
                },
            );
        }

        let counts = value_counts(values.iter().map(String::as_str));
        let rare: Vec<&(String, usize)> =
            counts.iter().filter(|(_, c)| *c < RARE_THRESHOLD).collect();
        if !rare.is_empty() && (rare.len() as f64) < counts.len() as f64 * 0.5 {
            report.rare_categories.insert(
                name.to_string(),
                RareCategories {
                    rare_count: rare.len(),
                    total_unique: counts.len(),
                    percentage_rare: round_to(percentage(rare.len(), counts.len()), 2),
                    examples: rare.iter().take(5).map(|(v, c)| (v.clone(), *c)).collect(),
                },
            );
        }

        let lengths: Vec<f64> = values.iter().map(|v| v.chars().count() as f64).collect();
        if let (Some(mean_len), Some(std_len)) = (mean(&lengths), std_dev(&lengths, 1))
            && std_len > mean_len * 0.5
            && counts.len() > 10
        {
            let min_length = values.iter().map(|v| v.chars().count()).min().unwrap_or(0);
            let max_length = values.iter().map(|v| v.chars().count()).max().unwrap_or(0);
            report.inconsistent_formats.insert(
                name.to_string(),
                LengthSpread {
                    min_length,
                    max_length,
                    mean_length: round_to(mean_len, 2),
                    std_length: round_to(std_len, 2),
                },
            );
        }
    }
}

fn build_suggestions(report: &InconsistenciesReport) -> BTreeMap<String, Vec<String>> {
    let mut suggestions: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut add = |columns: Vec<&String>, text: &str| {
        for col in columns {
            suggestions
                .entry(col.clone())
                .or_default()
                .push(text.to_string());
        }
    };

    add(
        report.strip_issues.keys().collect(),
        "Remove leading/trailing whitespace",
    );
    add(
        report.case_issues.keys().collect(),
        "Normalize text case to lowercase or title case",
    );
    add(
        report.special_char_issues.keys().collect(),
        "Review special characters. Remove if not needed for business logic",
    );
    add(
        report.mixed_alphanumeric.keys().collect(),
        "Mixed alphanumeric values detected. Validate format consistency",
    );
    add(
        report.rare_categories.keys().collect(),
        "Group rare categories into 'Other' or investigate data quality",
    );
    add(
        report.inconsistent_formats.keys().collect(),
        "Inconsistent value lengths detected. Standardize format if possible",
    );
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_text_columns() {
        let df = df! {
            "a" => [1i64, 2, 3],
        }
        .unwrap();
        let report = InconsistencyAnalyzer::analyze(&df).unwrap();
        assert_eq!(report.note.as_deref(), Some("No categorical columns found"));
        assert!(report.summary.is_none());
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn test_whitespace_and_case() {
        let df = df! {
            "city" => [" Paris", "paris", "Paris", "London ", "london", "London"],
        }
        .unwrap();
        let report = InconsistencyAnalyzer::analyze(&df).unwrap();

        let strip = &report.strip_issues["city"];
        assert_eq!(strip.count, 2);
        assert_eq!(strip.percentage, 33.33);
        assert_eq!(strip.examples, vec![" Paris".to_string(), "London ".to_string()]);

        assert_eq!(
            report.case_issues["city"],
            CaseIssue {
                unique_original: 6,
                unique_normalized: 4,
                potential_duplicates: 2,
            }
        );
        assert_eq!(
            report.suggestions["city"][..2],
            [
                "Remove leading/trailing whitespace".to_string(),
                "Normalize text case to lowercase or title case".to_string(),
            ]
        );
    }

    #[test]
    fn test_special_and_mixed() {
        let df = df! {
            "code" => ["A1", "B2", "plain", "text", "more", "x-y", "words", "here", "also", "fine"],
        }
        .unwrap();
        let report = InconsistencyAnalyzer::analyze(&df).unwrap();

        let special = &report.special_char_issues["code"];
        assert_eq!(special.count, 1);
        assert_eq!(special.examples, vec!["x-y".to_string()]);

        assert_eq!(
            report.mixed_alphanumeric["code"],
            CountIssue {
                count: 2,
                percentage: 20.0
            }
        );
    }

    #[test]
    fn test_mostly_alphanumeric_is_not_flagged() {
        let df = df! {
            "sku" => ["A1", "B2", "C3", "D4", "E5"],
        }
        .unwrap();
        let report = InconsistencyAnalyzer::analyze(&df).unwrap();
        assert!(report.mixed_alphanumeric.is_empty());
    }

    #[test]
    fn test_rare_categories() {
        let mut values: Vec<&str> = vec!["common"; 10];
        values.extend(vec!["usual"; 10]);
        values.extend(vec!["frequent"; 10]);
        values.push("odd");
        let df = df! { "kind" => values }.unwrap();
        let report = InconsistencyAnalyzer::analyze(&df).unwrap();

        let rare = &report.rare_categories["kind"];
        assert_eq!(rare.rare_count, 1);
        assert_eq!(rare.total_unique, 4);
        assert_eq!(rare.percentage_rare, 25.0);
        assert_eq!(rare.examples, BTreeMap::from([("odd".to_string(), 1)]));
    }

    #[test]
    fn test_length_spread_not_counted() {
        let values: Vec<String> = (0..12)
            .map(|i| {
                if i % 2 == 0 {
                    "a".repeat(i + 1)
                } else {
                    "b".repeat(i * 3 + 1)
                }
            })
            .collect();
        let df = df! { "note" => values }.unwrap();
        let report = InconsistencyAnalyzer::analyze(&df).unwrap();

        assert!(report.inconsistent_formats.contains_key("note"));
        let summary = report.summary.as_ref().unwrap();
        assert_eq!(summary.columns_with_issues, report.issue_count());
        assert_eq!(
            report.suggestions["note"],
            vec!["Inconsistent value lengths detected. Standardize format if possible".to_string()]
        );
    }

    #[test]
    fn test_severity_from_issue_total() {
        let df = df! {
            "a" => [" x", "X", "x"],
            "b" => ["ok", "fine", "good"],
        }
        .unwrap();
        let report = InconsistencyAnalyzer::analyze(&df).unwrap();
        let summary = report.summary.unwrap();
        assert_eq!(summary.total_categorical_columns, 2);
        assert_eq!(summary.columns_with_issues, 2);
        assert_eq!(summary.severity, Severity::Low);
    }
}
