//! Duplicate-row analysis.

use crate::types::Severity;
use crate::utils::{
    SUBSET_IGNORE_PATTERNS, column_names, name_contains_any, percentage, round_to, row_keys,
};
use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Group detection is skipped entirely at or above this many duplicates.
const GROUPING_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub group_size: usize,
    pub sample_indices: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetDuplicates {
    pub columns_checked: Vec<String>,
    pub duplicate_count: usize,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuplicatesReport {
    pub duplicate_count: usize,
    pub duplicate_percent: f64,
    pub total_rows: usize,
    pub unique_rows: usize,
    pub severity: Severity,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub subset_duplicates: Option<SubsetDuplicates>,
    pub suggestions: Vec<String>,
}

/// Exact and identifier-agnostic duplicate detection.
pub struct DuplicateAnalyzer;

impl DuplicateAnalyzer {
    pub fn analyze(df: &DataFrame) -> Result<DuplicatesReport> {
        let total_rows = df.height();
        let all_columns = column_names(df);
        let keys = row_keys(df, &all_columns)?;

        let flags = duplicated_keep_first(&keys);
        let duplicate_count = flags.iter().filter(|&&d| d).count();
        let duplicate_percent = percentage(duplicate_count, total_rows);

        let subset_duplicates = Self::subset_duplicates(df, &all_columns, duplicate_count)?;

        let duplicate_groups = if duplicate_count > 0 && duplicate_count < GROUPING_LIMIT {
            largest_groups(&keys, 5)
        } else {
            Vec::new()
        };

        let severity = severity_for(duplicate_percent);
        let mut suggestions = Vec::new();
        if duplicate_count == 0 {
            suggestions.push("No duplicate rows detected. Dataset is clean.".to_string());
        } else if duplicate_percent < 1.0 {
            suggestions
                .push("Very few duplicates. Safe to remove with keep-first deduplication.".to_string());
        } else if duplicate_percent < 5.0 {
            suggestions.push(
                "Moderate duplicates found. Review if data represents transactions or events."
                    .to_string(),
            );
        } else {
            suggestions.push(
                "High duplicate rate detected. Investigate data collection process.".to_string(),
            );
            suggestions.push(
                "Check if duplicates are legitimate (e.g., repeated measurements) or errors."
                    .to_string(),
            );
        }
        if subset_duplicates.is_some() {
            suggestions.push(
                "Found more duplicates when ignoring ID columns. Consider subset-based deduplication."
                    .to_string(),
            );
        }

        debug!(
            "Duplicates: {} of {} rows ({:.2}%)",
            duplicate_count, total_rows, duplicate_percent
        );

        Ok(DuplicatesReport {
            duplicate_count,
            duplicate_percent: round_to(duplicate_percent, 2),
            total_rows,
            unique_rows: total_rows - duplicate_count,
            severity,
            duplicate_groups,
            subset_duplicates,
            suggestions,
        })
    }

    /// Rows in duplicated groups once identifier-like columns are ignored.
    /// Only reported when this exceeds the exact duplicate count.
    fn subset_duplicates(
        df: &DataFrame,
        all_columns: &[String],
        duplicate_count: usize,
    ) -> Result<Option<SubsetDuplicates>> {
        let important: Vec<String> = all_columns
            .iter()
            .filter(|name| !name_contains_any(name, &SUBSET_IGNORE_PATTERNS))
            .cloned()
            .collect();
        if important.is_empty() {
            return Ok(None);
        }

        let keys = row_keys(df, &important)?;
        let subset_count = duplicated_keep_none(&keys).iter().filter(|&&d| d).count();
        if subset_count <= duplicate_count {
            return Ok(None);
        }

        Ok(Some(SubsetDuplicates {
            columns_checked: important,
            duplicate_count: subset_count,
            note: "More duplicates found when ignoring ID columns".to_string(),
        }))
    }
}

/// `true` for every row that repeats an earlier row.
pub fn duplicated_keep_first(keys: &[String]) -> Vec<bool> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(keys.len());
    keys.iter().map(|k| !seen.insert(k.as_str())).collect()
}

/// `true` for every row that has at least one identical row.
pub fn duplicated_keep_none(keys: &[String]) -> Vec<bool> {
    let mut counts: HashMap<&str, usize> = HashMap::with_capacity(keys.len());
    for k in keys {
        *counts.entry(k.as_str()).or_insert(0) += 1;
    }
    keys.iter().map(|k| counts[k.as_str()] > 1).collect()
}

/// The `limit` largest groups of identical rows (ties by first occurrence),
/// each with up to three row indices.
fn largest_groups(keys: &[String], limit: usize) -> Vec<DuplicateGroup> {
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, k) in keys.iter().enumerate() {
        groups.entry(k.as_str()).or_default().push(idx);
    }

    let mut groups: Vec<Vec<usize>> = groups.into_values().filter(|g| g.len() > 1).collect();
    groups.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));

    groups
        .into_iter()
        .take(limit)
        .map(|g| DuplicateGroup {
            group_size: g.len(),
            sample_indices: g.into_iter().take(3).collect(),
        })
        .collect()
}

fn severity_for(pct: f64) -> Severity {
    if pct == 0.0 {
        Severity::None
    } else if pct < 1.0 {
        Severity::Low
    } else if pct < 5.0 {
        Severity::Medium
    } else {
        Severity::High
    }
}
