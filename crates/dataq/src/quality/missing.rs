//! Missing-value analysis.

use crate::types::{SemanticType, Severity};
use crate::utils::{missing_mask, percentage, round_to};
use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingColumnDetail {
    pub count: usize,
    pub percentage: f64,
    pub severity: Severity,
    pub dtype: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingSummary {
    pub total_missing_values: usize,
    pub overall_missing_percentage: f64,
    pub columns_with_missing: usize,
    pub total_columns: usize,
    pub rows_with_any_missing: usize,
    pub complete_rows: usize,
}

/// A set of columns that are missing together on several rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingPattern {
    pub columns: Vec<String>,
    pub occurrences: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingValuesReport {
    pub summary: MissingSummary,
    /// Only columns with at least one missing cell.
    pub details: BTreeMap<String, MissingColumnDetail>,
    pub missing_patterns: Vec<MissingPattern>,
    pub recommendations: Vec<String>,
}

/// Per-column and dataset-level missing-value diagnostics.
pub struct MissingValueAnalyzer;

impl MissingValueAnalyzer {
    pub fn analyze(df: &DataFrame) -> Result<MissingValuesReport> {
        let rows = df.height();
        let names: Vec<String> = crate::utils::column_names(df);

        let mut masks: Vec<Vec<bool>> = Vec::with_capacity(names.len());
        let mut details = BTreeMap::new();
        let mut high_missing: Vec<String> = Vec::new();

        for col in df.get_columns() {
            let series = col.as_materialized_series();
            let mask = missing_mask(series)?;
            let count = mask.iter().filter(|&&m| m).count();
            masks.push(mask);

            if count == 0 {
                continue;
            }

            let pct = percentage(count, rows);
            if pct > 50.0 {
                high_missing.push(col.name().to_string());
            }
            details.insert(
                col.name().to_string(),
                MissingColumnDetail {
                    count,
                    percentage: round_to(pct, 2),
                    severity: severity_for(pct),
                    dtype: series.dtype().to_string(),
                    suggestion: suggestion_for(pct, SemanticType::of(series.dtype())).to_string(),
                },
            );
        }

        let total_missing: usize = details.values().map(|d| d.count).sum();
        let total_cells = rows * names.len();
        let columns_with_missing = details.len();
        let rows_with_any_missing = (0..rows)
            .filter(|&r| masks.iter().any(|m| m[r]))
            .count();

        let missing_patterns = if columns_with_missing > 1 {
            Self::find_patterns(&masks, &names, rows)
        } else {
            Vec::new()
        };

        let overall = percentage(total_missing, total_cells);
        let mut recommendations = Vec::new();
        if !high_missing.is_empty() {
            recommendations.push(format!(
                "Consider dropping columns with >50% missing: {}",
                high_missing.join(", ")
            ));
        }
        if overall > 30.0 {
            recommendations.push(
                "Dataset has significant missing data. Investigate data collection process."
                    .to_string(),
            );
        }
        if !missing_patterns.is_empty() {
            recommendations.push(
                "Detected patterns in missing data. Missing values may not be random.".to_string(),
            );
        }
        if columns_with_missing as f64 > names.len() as f64 * 0.7 {
            recommendations
                .push("Most columns have missing values. Review data quality at source.".to_string());
        }

        debug!(
            "Missing values: {} cells across {} columns",
            total_missing, columns_with_missing
        );

        Ok(MissingValuesReport {
            summary: MissingSummary {
                total_missing_values: total_missing,
                overall_missing_percentage: round_to(overall, 2),
                columns_with_missing,
                total_columns: names.len(),
                rows_with_any_missing,
                complete_rows: rows - rows_with_any_missing,
            },
            details,
            missing_patterns,
            recommendations,
        })
    }

    /// The five most frequent row masks, keeping those shared by more than
    /// one row and spanning at least two columns.
    fn find_patterns(masks: &[Vec<bool>], names: &[String], rows: usize) -> Vec<MissingPattern> {
        let mut counts: HashMap<Vec<bool>, (usize, usize)> = HashMap::new();
        for r in 0..rows {
            let pattern: Vec<bool> = masks.iter().map(|m| m[r]).collect();
            counts.entry(pattern).or_insert((0, r)).0 += 1;
        }

        let mut ordered: Vec<(Vec<bool>, usize, usize)> = counts
            .into_iter()
            .map(|(pattern, (count, first))| (pattern, count, first))
            .collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        ordered
            .into_iter()
            .take(5)
            .filter_map(|(pattern, count, _)| {
                let columns: Vec<String> = pattern
                    .iter()
                    .zip(names)
                    .filter(|(missing, _)| **missing)
                    .map(|(_, name)| name.clone())
                    .collect();
                (count > 1 && columns.len() > 1).then(|| MissingPattern {
                    columns,
                    occurrences: count,
                    percentage: round_to(percentage(count, rows), 2),
                })
            })
            .collect()
    }
}

fn severity_for(pct: f64) -> Severity {
    if pct == 0.0 {
        Severity::None
    } else if pct < 5.0 {
        Severity::Low
    } else if pct < 20.0 {
        Severity::Medium
    } else {
        Severity::High
    }
}

fn suggestion_for(pct: f64, semantic: SemanticType) -> &'static str {
    if pct == 0.0 {
        return "No action needed";
    }
    if pct > 50.0 {
        return "Consider dropping this column due to high missing rate";
    }
    match semantic {
        SemanticType::Numeric => "Options: median imputation, mean imputation, or forward fill",
        SemanticType::Datetime => "Options: forward fill, backward fill, or interpolation",
        _ => "Options: mode imputation, 'Unknown' category, or forward fill",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_df() -> DataFrame {
        let values: Vec<Option<f64>> = (0..100)
            .map(|i| if i % 10 == 0 { None } else { Some(i as f64) })
            .collect();
        let category: Vec<&str> = (0..100).map(|i| if i < 60 { "A" } else { "B" }).collect();
        df! {
            "id" => (1..=100).collect::<Vec<i64>>(),
            "value" => values,
            "category" => category,
        }
        .unwrap()
    }

    #[test]
    fn test_column_detail_and_severity() {
        let report = MissingValueAnalyzer::analyze(&sample_df()).unwrap();
        let detail = &report.details["value"];
        assert_eq!(detail.count, 10);
        assert_eq!(detail.percentage, 10.0);
        assert_eq!(detail.severity, Severity::Medium);
        assert_eq!(
            detail.suggestion,
            "Options: median imputation, mean imputation, or forward fill"
        );
        assert!(!report.details.contains_key("id"));
    }

    #[test]
    fn test_summary() {
        let report = MissingValueAnalyzer::analyze(&sample_df()).unwrap();
        assert_eq!(
            report.summary,
            MissingSummary {
                total_missing_values: 10,
                overall_missing_percentage: 3.33,
                columns_with_missing: 1,
                total_columns: 3,
                rows_with_any_missing: 10,
                complete_rows: 90,
            }
        );
        assert!(report.missing_patterns.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_complete_dataset() {
        let df = df! {
            "a" => [1i64, 2, 3],
            "b" => ["x", "y", "z"],
        }
        .unwrap();
        let report = MissingValueAnalyzer::analyze(&df).unwrap();
        assert_eq!(report.summary.complete_rows, df.height());
        assert!(report.details.is_empty());
    }

    #[test]
    fn test_empty_dataset_is_zeroed() {
        let report = MissingValueAnalyzer::analyze(&DataFrame::empty()).unwrap();
        assert_eq!(report.summary, MissingSummary::default());
    }

    #[test]
    fn test_patterns_and_recommendations() {
        let df = df! {
            "a" => [None, None, None, Some(1i64), Some(2)],
            "b" => [None, None, None, Some("x"), Some("y")],
            "c" => [Some(1.0f64), Some(2.0), Some(3.0), Some(4.0), Some(5.0)],
        }
        .unwrap();
        let report = MissingValueAnalyzer::analyze(&df).unwrap();

        assert_eq!(
            report.missing_patterns,
            vec![MissingPattern {
                columns: vec!["a".to_string(), "b".to_string()],
                occurrences: 3,
                percentage: 60.0,
            }]
        );
        assert_eq!(report.details["a"].severity, Severity::High);
        assert_eq!(
            report.details["b"].suggestion,
            "Consider dropping this column due to high missing rate"
        );
        assert_eq!(
            report.recommendations,
            vec![
                "Consider dropping columns with >50% missing: a, b".to_string(),
                "Dataset has significant missing data. Investigate data collection process."
                    .to_string(),
                "Detected patterns in missing data. Missing values may not be random.".to_string(),
            ]
        );
    }

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(severity_for(0.0), Severity::None);
        assert_eq!(severity_for(4.99), Severity::Low);
        assert_eq!(severity_for(5.0), Severity::Medium);
        assert_eq!(severity_for(19.9), Severity::Medium);
        assert_eq!(severity_for(20.0), Severity::High);
    }
}
