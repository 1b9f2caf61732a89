//! Outlier treatment using per-column 1.5×IQR fences.
//!
//! Fences are recomputed from the data being cleaned rather than taken from
//! the outlier report, since earlier cleaning steps may have changed values.

use crate::config::OutlierMethod;
use crate::stats::{IqrBounds, iqr_bounds};
use crate::utils::numeric_values;
use anyhow::{Context, Result, bail};
use polars::prelude::*;

/// Fences for one column, or an error if it has no observed values.
pub(crate) fn column_bounds(series: &Series) -> Result<(Vec<Option<f64>>, IqrBounds)> {
    let values = numeric_values(series)?;
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let bounds = iqr_bounds(&present).context("no observed values")?;
    if bounds.lower.is_nan() || bounds.upper.is_nan() || bounds.lower > bounds.upper {
        bail!("IQR fences are not ordered");
    }
    Ok((values, bounds))
}

/// Clamp values into the fences. Returns the new series and how many
/// values moved.
pub(crate) fn clip(series: &Series) -> Result<(Series, usize)> {
    let (values, bounds) = column_bounds(series)?;
    let mut clipped = 0;
    let out: Vec<Option<f64>> = values
        .into_iter()
        .map(|v| {
            v.map(|x| {
                if bounds.contains(x) {
                    x
                } else {
                    clipped += 1;
                    x.clamp(bounds.lower, bounds.upper)
                }
            })
        })
        .collect();

    let mut out = Series::new(series.name().clone(), out);
    // Integer dtype survives only when no value moved.
    if clipped == 0 {
        out = out.cast(series.dtype())?;
    }
    Ok((out, clipped))
}

/// Per-row flags: `true` when the value lies outside the fences. Nulls are
/// never outliers.
pub(crate) fn outlier_mask(series: &Series) -> Result<Vec<bool>> {
    let (values, bounds) = column_bounds(series)?;
    Ok(values
        .iter()
        .map(|v| v.is_some_and(|x| !bounds.contains(x)))
        .collect())
}

/// Apply `method` to one column of `df`, returning a short description of
/// what changed.
pub(crate) fn treat_column(
    df: &mut DataFrame,
    name: &str,
    method: OutlierMethod,
) -> Result<String> {
    let series = df.column(name)?.as_materialized_series().clone();
    match method {
        OutlierMethod::Clip => {
            let (clipped, count) = clip(&series)?;
            df.replace(name, clipped)?;
            Ok(format!("Clipped {count} outlier values in '{name}' to IQR bounds"))
        }
        OutlierMethod::Flag => {
            let mask = outlier_mask(&series)?;
            let count = mask.iter().filter(|&&m| m).count();
            let flag_name = format!("{name}_is_outlier");
            df.with_column(Series::new(flag_name.as_str().into(), mask))?;
            Ok(format!("Flagged {count} outliers in '{name}' as '{flag_name}'"))
        }
        OutlierMethod::Remove => {
            let mask = outlier_mask(&series)?;
            let keep: Vec<bool> = mask.iter().map(|&m| !m).collect();
            let before = df.height();
            *df = df.filter(&BooleanChunked::from_slice("keep".into(), &keep))?;
            Ok(format!(
                "Removed {} rows with outliers in '{name}'",
                before - df.height()
            ))
        }
        OutlierMethod::Keep => Ok(format!("Kept outliers in '{name}'")),
    }
}
