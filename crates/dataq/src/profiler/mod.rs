//! Dataset profiling.
//!
//! Produces a structural overview of a dataset:
//! - Shape, memory footprint and semantic column-type counts
//! - Per-column statistics by semantic type
//! - Identifier-like, constant and high-cardinality columns
//! - Dataset-level warnings

mod statistics;

pub use statistics::{CategoricalStats, DatetimeStats, NumericStats, ValueCount};

use crate::quality::duplicated_keep_first;
use crate::types::SemanticType;
use crate::utils::{
    column_names, distinct_count, memory_usage_mb, missing_mask, percentage, round_to, row_keys,
};
use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnTypeCounts {
    pub numeric: usize,
    pub categorical: usize,
    pub datetime: usize,
    /// Booleans and everything else.
    pub other: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub shape: Shape,
    pub column_types: ColumnTypeCounts,
    pub memory_usage_mb: f64,
    pub duplicate_rows: usize,
    pub potential_id_columns: Vec<String>,
    pub constant_columns: Vec<String>,
    pub high_cardinality_categoricals: Vec<String>,
}

/// Type-specific part of a column profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnStats {
    Numeric(NumericStats),
    Categorical(CategoricalStats),
    Datetime(DatetimeStats),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    /// Physical dtype.
    #[serde(rename = "type")]
    pub dtype: String,
    pub unique_values: usize,
    pub null_count: usize,
    pub null_percentage: f64,
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ColumnStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilingReport {
    pub summary: ProfileSummary,
    pub column_profiles: BTreeMap<String, ColumnProfile>,
    pub warnings: Vec<String>,
}

/// Data profiler for summarizing dataset structure.
pub struct DataProfiler;

impl DataProfiler {
    pub fn profile(df: &DataFrame) -> Result<ProfilingReport> {
        let rows = df.height();
        let mut column_types = ColumnTypeCounts::default();
        let mut column_profiles = BTreeMap::new();
        let mut potential_id_columns = Vec::new();
        let mut constant_columns = Vec::new();
        let mut high_cardinality_categoricals = Vec::new();

        for col in df.get_columns() {
            let name = col.name().to_string();
            let series = col.as_materialized_series();
            let semantic = SemanticType::of(series.dtype());
            let unique_values = distinct_count(series)?;
            let null_count = missing_mask(series)?.iter().filter(|&&m| m).count();

            match semantic {
                SemanticType::Numeric => column_types.numeric += 1,
                SemanticType::Categorical => column_types.categorical += 1,
                SemanticType::Datetime => column_types.datetime += 1,
                SemanticType::Boolean | SemanticType::Other => column_types.other += 1,
            }

            if rows > 0 && unique_values == rows && null_count == 0 {
                potential_id_columns.push(name.clone());
            }
            if unique_values == 1 {
                constant_columns.push(name.clone());
            }
            if semantic == SemanticType::Categorical && unique_values as f64 > rows as f64 * 0.5 {
                high_cardinality_categoricals.push(name.clone());
            }

            let stats = match semantic {
                SemanticType::Numeric => Some(ColumnStats::Numeric(statistics::numeric_stats(
                    series,
                )?)),
                SemanticType::Categorical => Some(ColumnStats::Categorical(
                    statistics::categorical_stats(series, unique_values, rows)?,
                )),
                SemanticType::Datetime => Some(ColumnStats::Datetime(
                    statistics::datetime_stats(series)?,
                )),
                SemanticType::Boolean | SemanticType::Other => None,
            };

            debug!(
                "Profiled column '{}': {} ({} unique, {} missing)",
                name,
                semantic.as_str(),
                unique_values,
                null_count
            );

            column_profiles.insert(
                name,
                ColumnProfile {
                    dtype: series.dtype().to_string(),
                    unique_values,
                    null_count,
                    null_percentage: round_to(percentage(null_count, rows), 2),
                    stats,
                },
            );
        }

        let keys = row_keys(df, &column_names(df))?;
        let duplicate_rows = duplicated_keep_first(&keys).iter().filter(|&&d| d).count();
        let memory_mb = memory_usage_mb(df);

        let mut warnings = Vec::new();
        if memory_mb > 100.0 {
            warnings.push(
                "Dataset is large (>100MB). Consider sampling or chunking for analysis."
                    .to_string(),
            );
        }
        if duplicate_rows as f64 > rows as f64 * 0.05 {
            warnings.push(format!(
                "High number of duplicate rows ({duplicate_rows}). Review data source."
            ));
        }
        if !constant_columns.is_empty() {
            warnings.push(format!(
                "Found {} constant columns. These can be removed.",
                constant_columns.len()
            ));
        }
        if !high_cardinality_categoricals.is_empty() {
            warnings.push(format!(
                "Found {} high-cardinality categorical columns. May need encoding strategy.",
                high_cardinality_categoricals.len()
            ));
        }

        Ok(ProfilingReport {
            summary: ProfileSummary {
                shape: Shape {
                    rows,
                    columns: df.width(),
                },
                column_types,
                memory_usage_mb: round_to(memory_mb, 2),
                duplicate_rows,
                potential_id_columns,
                constant_columns,
                high_cardinality_categoricals,
            },
            column_profiles,
            warnings,
        })
    }
}
