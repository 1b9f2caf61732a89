//! Numeric correlations and categorical associations.

use crate::stats::{chi_square_contingency, pearson};
use crate::types::UnitOutcome;
use crate::utils::{
    column_strings, columns_where, distinct_count, is_text_dtype, measurement_columns,
    numeric_values, round_to,
};
use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

const HIGH_CORRELATION: f64 = 0.7;
const MULTICOLLINEARITY: f64 = 0.9;
const SIGNIFICANCE: f64 = 0.05;
/// Categorical columns must have a distinct count inside this range.
const CARDINALITY_RANGE: std::ops::RangeInclusive<usize> = 2..=49;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedPair {
    pub column1: String,
    pub column2: String,
    pub correlation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalAssociation {
    pub chi2_statistic: f64,
    pub p_value: f64,
    pub cramers_v: f64,
    pub significant: bool,
    pub association_strength: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPair {
    pub pair: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationsReport {
    /// Full matrix; `None` where a correlation is undefined.
    pub numeric_correlations: BTreeMap<String, BTreeMap<String, Option<f64>>>,
    pub high_correlations: Vec<CorrelatedPair>,
    pub multicollinearity_candidates: Vec<CorrelatedPair>,
    /// Keyed `"<a>_vs_<b>"`; only significant associations are kept.
    pub categorical_associations: BTreeMap<String, CategoricalAssociation>,
    pub skipped_pairs: Vec<SkippedPair>,
    pub warnings: Vec<String>,
}

pub struct CorrelationAnalyzer;

impl CorrelationAnalyzer {
    pub fn analyze(df: &DataFrame) -> Result<CorrelationsReport> {
        let numeric = measurement_columns(df);
        if numeric.len() < 2 {
            return Ok(CorrelationsReport {
                warnings: vec!["Not enough numeric columns for correlation analysis".to_string()],
                ..Default::default()
            });
        }

        let mut report = CorrelationsReport::default();

        let mut values: Vec<Vec<Option<f64>>> = Vec::with_capacity(numeric.len());
        for name in &numeric {
            values.push(numeric_values(df.column(name)?.as_materialized_series())?);
        }

        for (i, a) in numeric.iter().enumerate() {
            let row = report.numeric_correlations.entry(a.clone()).or_default();
            for (j, b) in numeric.iter().enumerate() {
                row.insert(b.clone(), pairwise_pearson(&values[i], &values[j]));
            }
        }

        for (i, a) in numeric.iter().enumerate() {
            for b in numeric.iter().skip(i + 1) {
                let Some(r) = report.numeric_correlations[a][b] else {
                    continue;
                };
                if r.abs() <= HIGH_CORRELATION {
                    continue;
                }
                let rounded = round_to(r, 3);
                report.high_correlations.push(CorrelatedPair {
                    column1: a.clone(),
                    column2: b.clone(),
                    correlation: rounded,
                    strength: Some(
                        if r > 0.0 { "strong positive" } else { "strong negative" }.to_string(),
                    ),
                });
                if rounded.abs() > MULTICOLLINEARITY {
                    report.multicollinearity_candidates.push(CorrelatedPair {
                        column1: a.clone(),
                        column2: b.clone(),
                        correlation: rounded,
                        strength: None,
                    });
                }
            }
        }

        Self::categorical_associations(df, &mut report)?;

        if !report.high_correlations.is_empty() {
            report.warnings.push(format!(
                "Found {} pairs of highly correlated features. Consider feature selection.",
                report.high_correlations.len()
            ));
        }
        if !report.multicollinearity_candidates.is_empty() {
            let pairs: Vec<String> = report
                .multicollinearity_candidates
                .iter()
                .map(|p| format!("{} and {}", p.column1, p.column2))
                .collect();
            report.warnings.push(format!(
                "Potential multicollinearity detected. Review: {}",
                pairs.join(", ")
            ));
        }

        debug!(
            "Correlations: {} high, {} categorical associations",
            report.high_correlations.len(),
            report.categorical_associations.len()
        );
        Ok(report)
    }

    /// Chi-square tests between the first five eligible categorical columns
    /// and the columns following each, up to the sixth.
    fn categorical_associations(df: &DataFrame, report: &mut CorrelationsReport) -> Result<()> {
        let mut eligible: Vec<String> = Vec::new();
        for name in columns_where(df, is_text_dtype) {
            let distinct = distinct_count(df.column(&name)?.as_materialized_series())?;
            if CARDINALITY_RANGE.contains(&distinct) {
                eligible.push(name);
            }
        }
        if eligible.len() < 2 {
            return Ok(());
        }

        let mut strings: HashMap<&str, Vec<Option<String>>> = HashMap::new();
        for name in eligible.iter().take(6) {
            strings.insert(
                name.as_str(),
                column_strings(df.column(name)?.as_materialized_series())?,
            );
        }

        for (i, a) in eligible.iter().take(5).enumerate() {
            for b in eligible.iter().take(6).skip(i + 1) {
                let pair = format!("{a}_vs_{b}");
                match association(&strings[a.as_str()], &strings[b.as_str()]) {
                    UnitOutcome::Done(Some(found)) => {
                        report.categorical_associations.insert(pair, found);
                    }
                    UnitOutcome::Done(None) => {}
                    UnitOutcome::Skipped(reason) => {
                        report.skipped_pairs.push(SkippedPair { pair, reason });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Pearson correlation over rows where both values are present.
fn pairwise_pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();
    pearson(&xs, &ys)
}

/// Significant association between two label columns, `None` when the test
/// is not significant.
fn association(
    a: &[Option<String>],
    b: &[Option<String>],
) -> UnitOutcome<Option<CategoricalAssociation>> {
    let mut row_ids: BTreeMap<&str, usize> = BTreeMap::new();
    let mut col_ids: BTreeMap<&str, usize> = BTreeMap::new();
    let pairs: Vec<(&str, &str)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some((x.as_deref()?, y.as_deref()?)))
        .collect();
    for &(x, y) in &pairs {
        let next = row_ids.len();
        row_ids.entry(x).or_insert(next);
        let next = col_ids.len();
        col_ids.entry(y).or_insert(next);
    }

    let mut table = vec![vec![0.0; col_ids.len()]; row_ids.len()];
    for &(x, y) in &pairs {
        table[row_ids[x]][col_ids[y]] += 1.0;
    }

    let Some(result) = chi_square_contingency(&table) else {
        return UnitOutcome::skipped("degenerate contingency table");
    };
    if result.p_value >= SIGNIFICANCE {
        return UnitOutcome::Done(None);
    }
    let Some(v) = result.cramers_v() else {
        return UnitOutcome::skipped("Cramér's V undefined");
    };

    let strength = if v > 0.5 {
        "strong"
    } else if v > 0.3 {
        "moderate"
    } else {
        "weak"
    };
    UnitOutcome::Done(Some(CategoricalAssociation {
        chi2_statistic: round_to(result.statistic, 4),
        p_value: round_to(result.p_value, 4),
        cramers_v: round_to(v, 3),
        significant: true,
        association_strength: strength.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_not_enough_numeric_columns() {
        let df = df! {
            "id" => [1i64, 2, 3],
            "value" => [1.0f64, 2.0, 3.0],
        }
        .unwrap();
        let report = CorrelationAnalyzer::analyze(&df).unwrap();
        assert_eq!(
            report.warnings,
            vec!["Not enough numeric columns for correlation analysis".to_string()]
        );
        assert!(report.numeric_correlations.is_empty());
    }

    #[test]
    fn test_high_correlation_and_multicollinearity() {
        let x: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let z: Vec<f64> = x.iter().map(|v| -v).collect();
        let df = df! {
            "x" => x,
            "y" => y,
            "z" => z,
        }
        .unwrap();
        let report = CorrelationAnalyzer::analyze(&df).unwrap();

        let diagonal = report.numeric_correlations["x"]["x"].unwrap();
        assert!((diagonal - 1.0).abs() < 1e-12);
        assert_eq!(report.high_correlations.len(), 3);
        assert_eq!(
            report.high_correlations[0],
            CorrelatedPair {
                column1: "x".to_string(),
                column2: "y".to_string(),
                correlation: 1.0,
                strength: Some("strong positive".to_string()),
            }
        );
        assert_eq!(
            report.high_correlations[1].strength.as_deref(),
            Some("strong negative")
        );
        assert_eq!(report.multicollinearity_candidates.len(), 3);
        assert_eq!(
            report.warnings,
            vec![
                "Found 3 pairs of highly correlated features. Consider feature selection."
                    .to_string(),
                "Potential multicollinearity detected. Review: x and y, x and z, y and z"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_constant_column_correlation_is_undefined() {
        let df = df! {
            "a" => [1.0f64, 2.0, 3.0, 4.0],
            "flat" => [5.0f64, 5.0, 5.0, 5.0],
        }
        .unwrap();
        let report = CorrelationAnalyzer::analyze(&df).unwrap();
        assert_eq!(report.numeric_correlations["a"]["flat"], None);
        assert!(report.high_correlations.is_empty());
    }

    #[test]
    fn test_pairwise_complete_observations() {
        let a = [Some(1.0), Some(2.0), None, Some(4.0)];
        let b = [Some(2.0), Some(4.0), Some(100.0), Some(8.0)];
        let r = pairwise_pearson(&a, &b).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_categorical_association() {
        let colour: Vec<&str> = (0..100).map(|i| if i < 50 { "red" } else { "blue" }).collect();
        let size: Vec<&str> = (0..100).map(|i| if i < 50 { "big" } else { "small" }).collect();
        let df = df! {
            "colour" => colour,
            "size" => size,
            "a" => (0..100).map(|i| i as f64).collect::<Vec<f64>>(),
            "b" => (0..100).map(|i| (i % 7) as f64).collect::<Vec<f64>>(),
        }
        .unwrap();
        let report = CorrelationAnalyzer::analyze(&df).unwrap();

        let assoc = &report.categorical_associations["colour_vs_size"];
        assert!(assoc.significant);
        assert_eq!(assoc.association_strength, "strong");
        assert!(assoc.p_value < 0.05);
        assert!(assoc.cramers_v > 0.9);
    }

    #[test]
    fn test_independent_categories_not_reported() {
        let first: Vec<&str> = (0..100).map(|i| if i % 2 == 0 { "p" } else { "q" }).collect();
        let second: Vec<&str> = (0..100)
            .map(|i| if (i / 2) % 2 == 0 { "u" } else { "v" })
            .collect();
        let df = df! {
            "first" => first,
            "second" => second,
            "a" => (0..100).map(|i| i as f64).collect::<Vec<f64>>(),
            "b" => (0..100).map(|i| (i % 7) as f64).collect::<Vec<f64>>(),
        }
        .unwrap();
        let report = CorrelationAnalyzer::analyze(&df).unwrap();
        assert!(report.categorical_associations.is_empty());
        assert!(report.skipped_pairs.is_empty());
    }
}
