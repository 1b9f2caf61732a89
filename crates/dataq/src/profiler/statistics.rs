//! Per-column statistics for the profiling report.

use crate::stats::{mean, median, min_max, std_dev};
use crate::utils::{non_null_f64, non_null_strings, value_counts};
use anyhow::Result;
use chrono::DateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

const MS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Sample standard deviation.
    pub std: Option<f64>,
    pub zeros: usize,
    pub negatives: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStats {
    /// Up to ten most frequent values, most frequent first.
    pub top_values: Vec<ValueCount>,
    /// `low`, `medium` or `high`.
    pub cardinality: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatetimeStats {
    pub min_date: Option<String>,
    pub max_date: Option<String>,
    pub date_range_days: i64,
}

pub(crate) fn numeric_stats(series: &Series) -> Result<NumericStats> {
    let values = non_null_f64(series)?;
    let (min, max) = match min_max(&values) {
        Some((lo, hi)) => (Some(lo), Some(hi)),
        None => (None, None),
    };
    Ok(NumericStats {
        min,
        max,
        mean: mean(&values),
        median: median(&values),
        std: std_dev(&values, 1),
        zeros: values.iter().filter(|&&v| v == 0.0).count(),
        negatives: values.iter().filter(|&&v| v < 0.0).count(),
    })
}

pub(crate) fn categorical_stats(
    series: &Series,
    unique_count: usize,
    total_rows: usize,
) -> Result<CategoricalStats> {
    let values = non_null_strings(series)?;
    let top_values = value_counts(values.iter().map(String::as_str))
        .into_iter()
        .take(10)
        .map(|(value, count)| ValueCount { value, count })
        .collect();

    let cardinality = if unique_count as f64 > total_rows as f64 * 0.5 {
        "high"
    } else if unique_count > 20 {
        "medium"
    } else {
        "low"
    };

    Ok(CategoricalStats {
        top_values,
        cardinality: cardinality.to_string(),
    })
}

/// Earliest and latest timestamps plus the whole-day span between them.
///
/// Time-of-day columns have no calendar span and produce empty stats.
pub(crate) fn datetime_stats(series: &Series) -> Result<DatetimeStats> {
    let empty = DatetimeStats {
        min_date: None,
        max_date: None,
        date_range_days: 0,
    };
    if matches!(series.dtype(), DataType::Time) {
        return Ok(empty);
    }

    let millis = series
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        .cast(&DataType::Int64)?;
    let (lo, hi) = millis
        .i64()?
        .into_iter()
        .flatten()
        .fold((None, None), |(lo, hi): (Option<i64>, Option<i64>), v| {
            (
                Some(lo.map_or(v, |l| l.min(v))),
                Some(hi.map_or(v, |h| h.max(v))),
            )
        });
    let (Some(lo), Some(hi)) = (lo, hi) else {
        return Ok(empty);
    };

    let render = |ms: i64| {
        DateTime::from_timestamp_millis(ms)
            .map(|dt| dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string())
    };
    Ok(DatetimeStats {
        min_date: render(lo),
        max_date: render(hi),
        date_range_days: (hi - lo).div_euclid(MS_PER_DAY),
    })
}
