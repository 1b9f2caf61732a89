//! Missing-value imputation.
//!
//! Numeric columns are filled according to [`MissingStrategy`]; datetime
//! columns are forward- then backward-filled; everything text-like gets its
//! most frequent value, or `"Unknown"` when nothing was observed.

use crate::config::MissingStrategy;
use crate::stats::{mean, median};
use crate::types::SemanticType;
use crate::utils::{column_strings, is_float_dtype, missing_mask, numeric_values, string_mode};
use anyhow::{Result, bail};
use polars::prelude::*;

pub(crate) const UNKNOWN_FILL: &str = "Unknown";

/// A filled column plus a description of the fill.
pub(crate) struct Imputed {
    pub series: Series,
    pub filled: usize,
    pub method: String,
}

/// Fill the missing values of one column.
///
/// Returns `Ok(None)` when the column has nothing to fill.
pub(crate) fn impute_column(series: &Series, strategy: MissingStrategy) -> Result<Option<Imputed>> {
    let missing = missing_mask(series)?.iter().filter(|&&m| m).count();
    if missing == 0 {
        return Ok(None);
    }

    let imputed = match SemanticType::of(series.dtype()) {
        SemanticType::Numeric => impute_numeric(series, strategy, missing)?,
        SemanticType::Datetime => {
            let filled = series
                .fill_null(FillNullStrategy::Forward(None))?
                .fill_null(FillNullStrategy::Backward(None))?;
            let filled_count = missing - filled.null_count();
            Imputed {
                series: filled,
                filled: filled_count,
                method: "forward/backward fill".to_string(),
            }
        }
        SemanticType::Boolean => impute_boolean(series, missing)?,
        SemanticType::Categorical => impute_text(series, missing)?,
        SemanticType::Other => bail!("unsupported dtype {}", series.dtype()),
    };
    Ok(Some(imputed))
}

fn impute_numeric(series: &Series, strategy: MissingStrategy, missing: usize) -> Result<Imputed> {
    let values = numeric_values(series)?;
    let present: Vec<f64> = values.iter().flatten().copied().collect();

    let (fill, label) = match strategy {
        MissingStrategy::Mean => (mean(&present), "mean"),
        MissingStrategy::Zero => (Some(0.0), "zero"),
        MissingStrategy::Median | MissingStrategy::Mode => (median(&present), "median"),
    };
    let Some(fill) = fill else {
        bail!("no observed values to compute the {label}");
    };

    let filled: Vec<Option<f64>> = values.iter().map(|v| Some(v.unwrap_or(fill))).collect();

    // Integer columns keep their dtype when the fill value is whole.
    let series = if !is_float_dtype(series.dtype()) && fill.fract() == 0.0 {
        let ints: Vec<Option<i64>> = filled.iter().map(|v| v.map(|x| x as i64)).collect();
        Series::new(series.name().clone(), ints).cast(series.dtype())?
    } else {
        Series::new(series.name().clone(), filled)
    };

    Ok(Imputed {
        series,
        filled: missing,
        method: format!("{label} ({fill})"),
    })
}

fn impute_boolean(series: &Series, missing: usize) -> Result<Imputed> {
    let values: Vec<Option<bool>> = series.bool()?.into_iter().collect();
    let observed = values.iter().flatten().map(|b| if *b { "true" } else { "false" });
    let Some(mode) = string_mode(observed) else {
        bail!("no observed values to compute the mode");
    };
    let fill = mode == "true";

    let filled: Vec<Option<bool>> = values.iter().map(|v| Some(v.unwrap_or(fill))).collect();
    Ok(Imputed {
        series: Series::new(series.name().clone(), filled),
        filled: missing,
        method: format!("mode ({mode})"),
    })
}

fn impute_text(series: &Series, missing: usize) -> Result<Imputed> {
    let values = column_strings(series)?;
    let fill = string_mode(values.iter().flatten().map(String::as_str))
        .unwrap_or_else(|| UNKNOWN_FILL.to_string());

    let filled: Vec<Option<String>> = values
        .into_iter()
        .map(|v| Some(v.unwrap_or_else(|| fill.clone())))
        .collect();
    Ok(Imputed {
        series: Series::new(series.name().clone(), filled),
        filled: missing,
        method: format!("mode ('{fill}')"),
    })
}
