//! Distribution drift between a reference dataset and a candidate dataset.

use crate::stats::{
    ks_two_sample, mean, median, min_max, population_stability_index, std_dev,
    wasserstein_distance,
};
use crate::types::{Severity, UnitOutcome};
use crate::utils::{
    IDENTIFIER_PATTERNS, columns_where, is_numeric_dtype, is_text_dtype, name_contains_any,
    non_null_f64, non_null_strings, round_to,
};
use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Both sides need at least this many non-null values.
const MIN_VALUES: usize = 10;
const MAX_CATEGORICAL_COLUMNS: usize = 10;
const KS_SIGNIFICANCE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericDrift {
    pub mean_old: f64,
    pub mean_new: f64,
    pub mean_drift: f64,
    /// Relative to the reference mean; absent when that mean is zero.
    pub mean_drift_percent: Option<f64>,
    pub median_old: f64,
    pub median_new: f64,
    pub median_drift: f64,
    pub std_old: f64,
    pub std_new: f64,
    pub std_drift: f64,
    pub range_old: ValueRange,
    pub range_new: ValueRange,
    pub wasserstein_distance: f64,
    /// Wasserstein distance over the reference range.
    pub normalized_drift: f64,
    pub ks_statistic: f64,
    pub ks_pvalue: f64,
    pub distribution_changed: bool,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalDrift {
    pub psi: f64,
    pub severity: Severity,
    pub new_categories: Vec<String>,
    pub missing_categories: Vec<String>,
    pub category_count_old: usize,
    pub category_count_new: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub numeric_drift: BTreeMap<String, NumericDrift>,
    pub categorical_drift: BTreeMap<String, CategoricalDrift>,
    pub suggestions: BTreeMap<String, String>,
    pub skipped: BTreeMap<String, String>,
    pub overall_severity: Severity,
    pub high_drift_columns: Vec<String>,
    pub columns_checked: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Compares a candidate dataset against a reference.
pub struct DriftAnalyzer;

impl DriftAnalyzer {
    pub fn analyze(old: &DataFrame, new: &DataFrame) -> Result<DriftReport> {
        let numeric = common_columns(old, new, is_numeric_dtype)
            .into_iter()
            .filter(|name| !name_contains_any(name, &IDENTIFIER_PATTERNS))
            .collect::<Vec<_>>();
        if numeric.is_empty() {
            return Ok(DriftReport {
                error: Some("No common numeric columns for drift analysis".to_string()),
                ..Default::default()
            });
        }

        let mut report = DriftReport {
            columns_checked: numeric.clone(),
            ..Default::default()
        };

        for name in &numeric {
            let outcome = column_values(old, new, name)
                .map(|(a, b)| numeric_drift(&a, &b))
                .unwrap_or_else(UnitOutcome::skipped);
            match outcome {
                UnitOutcome::Done(drift) => {
                    report.numeric_drift.insert(name.clone(), drift);
                }
                UnitOutcome::Skipped(reason) => {
                    warn!("Drift check skipped for '{}': {}", name, reason);
                    report.skipped.insert(name.clone(), reason);
                }
            }
        }

        for name in common_columns(old, new, is_text_dtype)
            .into_iter()
            .take(MAX_CATEGORICAL_COLUMNS)
        {
            let old_values = non_null_strings(old.column(&name)?.as_materialized_series())?;
            let new_values = non_null_strings(new.column(&name)?.as_materialized_series())?;
            report
                .categorical_drift
                .insert(name, categorical_drift(&old_values, &new_values));
        }

        for (name, drift) in &report.numeric_drift {
            let mut text = match drift.severity {
                Severity::High => {
                    "Critical drift detected. Retrain models and investigate data pipeline changes."
                }
                Severity::Medium => {
                    "Moderate drift detected. Monitor closely and validate model performance."
                }
                Severity::Low => "Minor drift detected. Continue monitoring in production.",
                Severity::None => "No significant drift detected.",
            }
            .to_string();
            if drift.distribution_changed {
                text.push_str(" Distribution shape has changed significantly (KS test).");
            }
            report.suggestions.insert(name.clone(), text);
        }
        for (name, drift) in &report.categorical_drift {
            if drift.severity == Severity::High {
                report.suggestions.insert(
                    name.clone(),
                    "High categorical drift. Review new/missing categories.".to_string(),
                );
            } else if !drift.new_categories.is_empty() {
                report.suggestions.insert(
                    name.clone(),
                    format!("New categories detected: {}", drift.new_categories.join(", ")),
                );
            }
        }

        report.high_drift_columns = report
            .numeric_drift
            .iter()
            .filter(|(_, d)| d.severity == Severity::High)
            .map(|(name, _)| name.clone())
            .collect();
        let high = report.high_drift_columns.len() as f64;
        report.overall_severity = if high > numeric.len() as f64 * 0.3 {
            Severity::High
        } else if high > 0.0 {
            Severity::Medium
        } else {
            Severity::Low
        };

        debug!(
            "Drift: {} numeric, {} categorical columns compared, overall {}",
            report.numeric_drift.len(),
            report.categorical_drift.len(),
            report.overall_severity
        );
        Ok(report)
    }
}

/// Columns present in both frames whose dtype satisfies `predicate` on both
/// sides, in reference schema order.
fn common_columns(
    old: &DataFrame,
    new: &DataFrame,
    predicate: impl Fn(&DataType) -> bool + Copy,
) -> Vec<String> {
    let candidate: BTreeSet<String> = columns_where(new, predicate).into_iter().collect();
    columns_where(old, predicate)
        .into_iter()
        .filter(|name| candidate.contains(name))
        .collect()
}

fn column_values(old: &DataFrame, new: &DataFrame, name: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let a = non_null_f64(old.column(name)?.as_materialized_series())?;
    let b = non_null_f64(new.column(name)?.as_materialized_series())?;
    Ok((a, b))
}

fn numeric_drift(old: &[f64], new: &[f64]) -> UnitOutcome<NumericDrift> {
    if old.len() < MIN_VALUES || new.len() < MIN_VALUES {
        return UnitOutcome::skipped(format!(
            "fewer than {MIN_VALUES} non-null values on one side"
        ));
    }

    let summary = |xs: &[f64]| -> Option<(f64, f64, f64, ValueRange)> {
        let (min, max) = min_max(xs)?;
        Some((mean(xs)?, median(xs)?, std_dev(xs, 1)?, ValueRange { min, max }))
    };
    let (
        Some((mean_old, median_old, std_old, range_old)),
        Some((mean_new, median_new, std_new, range_new)),
    ) = (summary(old), summary(new))
    else {
        return UnitOutcome::skipped("summary statistics unavailable");
    };
    let (Some(wasserstein), Some(ks)) = (wasserstein_distance(old, new), ks_two_sample(old, new))
    else {
        return UnitOutcome::skipped("distribution comparison unavailable");
    };

    let mean_drift = (mean_new - mean_old).abs();
    let span = range_old.max - range_old.min;
    let normalized_drift = if span > 0.0 { wasserstein / span } else { 0.0 };

    UnitOutcome::Done(NumericDrift {
        mean_old,
        mean_new,
        mean_drift,
        mean_drift_percent: (mean_old != 0.0)
            .then(|| round_to(mean_drift / mean_old.abs() * 100.0, 2)),
        median_old,
        median_new,
        median_drift: (median_new - median_old).abs(),
        std_old,
        std_new,
        std_drift: (std_new - std_old).abs(),
        range_old,
        range_new,
        wasserstein_distance: wasserstein,
        normalized_drift,
        ks_statistic: ks.statistic,
        ks_pvalue: ks.p_value,
        distribution_changed: ks.p_value < KS_SIGNIFICANCE,
        severity: numeric_severity(normalized_drift),
    })
}

fn numeric_severity(normalized_drift: f64) -> Severity {
    if normalized_drift < 0.1 {
        Severity::None
    } else if normalized_drift < 0.3 {
        Severity::Low
    } else if normalized_drift < 0.7 {
        Severity::Medium
    } else {
        Severity::High
    }
}

fn categorical_drift(old: &[String], new: &[String]) -> CategoricalDrift {
    let psi = population_stability_index(
        old.iter().map(String::as_str),
        new.iter().map(String::as_str),
    );
    let old_set: BTreeSet<&str> = old.iter().map(String::as_str).collect();
    let new_set: BTreeSet<&str> = new.iter().map(String::as_str).collect();

    CategoricalDrift {
        psi,
        severity: if psi > 0.2 {
            Severity::High
        } else if psi > 0.1 {
            Severity::Medium
        } else {
            Severity::Low
        },
        new_categories: new_set
            .difference(&old_set)
            .take(5)
            .map(|s| s.to_string())
            .collect(),
        missing_categories: old_set
            .difference(&new_set)
            .take(5)
            .map(|s| s.to_string())
            .collect(),
        category_count_old: old_set.len(),
        category_count_new: new_set.len(),
    }
}
