//! Outlier detection: a multivariate isolation forest for the dataset-level
//! count plus per-column Z-score and IQR checks.

use crate::stats::{IsolationForest, iqr_bounds, mean, std_dev};
use crate::types::{Severity, UnitOutcome};
use crate::utils::{measurement_columns, numeric_values, percentage, round_to};
use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Minimum complete rows for the isolation forest.
const MIN_COMPLETE_ROWS: usize = 10;
/// Minimum non-null values for the per-column checks.
const MIN_COLUMN_VALUES: usize = 4;
const Z_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierDetail {
    pub sample_values: Vec<f64>,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub q1: f64,
    pub q3: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutliersReport {
    pub numeric_columns: Vec<String>,
    pub method: String,
    pub total_outliers: usize,
    pub outlier_percentage: f64,
    pub severity: Severity,
    pub per_column: BTreeMap<String, usize>,
    pub details: BTreeMap<String, OutlierDetail>,
    pub outlier_indices: BTreeMap<String, Vec<usize>>,
    pub suggestions: BTreeMap<String, String>,
    pub skipped: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutliersReport {
    fn not_applicable(numeric_columns: Vec<String>, error: &str) -> Self {
        Self {
            numeric_columns,
            method: METHOD.to_string(),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

const METHOD: &str = "isolation_forest";

/// Per-column result of the univariate checks.
struct ColumnOutliers {
    count: usize,
    detail: OutlierDetail,
    indices: Vec<usize>,
}

pub struct OutlierAnalyzer;

impl OutlierAnalyzer {
    pub fn analyze(df: &DataFrame) -> Result<OutliersReport> {
        let columns = measurement_columns(df);
        if columns.is_empty() {
            return Ok(OutliersReport::not_applicable(
                columns,
                "No suitable numeric columns for outlier detection",
            ));
        }

        let mut values: Vec<Vec<Option<f64>>> = Vec::with_capacity(columns.len());
        for name in &columns {
            values.push(numeric_values(df.column(name)?.as_materialized_series())?);
        }

        let complete_rows: Vec<Vec<f64>> = (0..df.height())
            .filter_map(|r| values.iter().map(|col| col[r]).collect::<Option<Vec<f64>>>())
            .collect();
        if complete_rows.len() < MIN_COMPLETE_ROWS {
            return Ok(OutliersReport::not_applicable(
                columns,
                "Insufficient data for outlier detection",
            ));
        }

        let total_outliers = IsolationForest::default()
            .predict_outliers(&complete_rows)
            .into_iter()
            .filter(|&flag| flag)
            .count();

        let rows = df.height();
        let mut report = OutliersReport {
            numeric_columns: columns.clone(),
            method: METHOD.to_string(),
            total_outliers,
            ..Default::default()
        };

        for (name, column) in columns.iter().zip(&values) {
            let count = match column_outliers(column) {
                UnitOutcome::Done(found) => {
                    report.details.insert(name.clone(), found.detail);
                    report.outlier_indices.insert(name.clone(), found.indices);
                    found.count
                }
                UnitOutcome::Skipped(reason) => {
                    warn!("Outlier check skipped for '{}': {}", name, reason);
                    report.skipped.insert(name.clone(), reason);
                    0
                }
            };
            report.per_column.insert(name.clone(), count);
            report
                .suggestions
                .insert(name.clone(), suggestion_for(count, rows).to_string());
        }

        let pct = percentage(total_outliers, rows);
        report.outlier_percentage = round_to(pct, 2);
        report.severity = if pct > 10.0 {
            Severity::High
        } else if pct > 5.0 {
            Severity::Medium
        } else {
            Severity::Low
        };

        debug!(
            "Outliers: {} rows flagged by isolation forest ({:.2}%)",
            total_outliers, pct
        );
        Ok(report)
    }
}

/// Z-score and IQR checks over one column's non-null values.
fn column_outliers(column: &[Option<f64>]) -> UnitOutcome<ColumnOutliers> {
    let present: Vec<(usize, f64)> = column
        .iter()
        .enumerate()
        .filter_map(|(idx, v)| v.map(|x| (idx, x)))
        .collect();
    if present.len() < MIN_COLUMN_VALUES {
        return UnitOutcome::skipped(format!(
            "fewer than {MIN_COLUMN_VALUES} non-null values"
        ));
    }

    let xs: Vec<f64> = present.iter().map(|(_, x)| *x).collect();
    let Some(bounds) = iqr_bounds(&xs) else {
        return UnitOutcome::skipped("quartiles unavailable");
    };

    let z_count = match (mean(&xs), std_dev(&xs, 0)) {
        (Some(mu), Some(sigma)) if sigma > 0.0 => xs
            .iter()
            .filter(|&&x| ((x - mu) / sigma).abs() > Z_THRESHOLD)
            .count(),
        _ => 0,
    };

    let outside: Vec<(usize, f64)> = present
        .into_iter()
        .filter(|(_, x)| !bounds.contains(*x))
        .collect();

    UnitOutcome::Done(ColumnOutliers {
        count: z_count.max(outside.len()),
        detail: OutlierDetail {
            sample_values: outside.iter().take(5).map(|(_, x)| *x).collect(),
            lower_bound: bounds.lower,
            upper_bound: bounds.upper,
            q1: bounds.q1,
            q3: bounds.q3,
        },
        indices: outside.iter().take(10).map(|(idx, _)| *idx).collect(),
    })
}

fn suggestion_for(count: usize, rows: usize) -> &'static str {
    match count {
        0 => "No outliers detected",
        1..=9 => "Few outliers found. Review manually or apply IQR clipping",
        10..=49 => "Moderate outliers detected. Consider IQR clipping or winsorization",
        _ if percentage(count, rows) > 10.0 => {
            "High outlier rate. Investigate data source or distribution"
        }
        _ => "Many outliers detected. Use robust scaling or log transformation",
    }
}
