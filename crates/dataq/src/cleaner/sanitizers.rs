//! Text normalization for string columns.

use anyhow::Result;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex: WHITESPACE_RUN"));

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("Invalid regex: NON_ALPHANUMERIC"));

/// Normalize one value.
///
/// The value is always trimmed. Aggressive mode lower-cases it and strips
/// every character that is not ASCII alphanumeric or whitespace; the default
/// mode collapses internal whitespace runs to a single space.
pub(crate) fn normalize_value(value: &str, aggressive: bool) -> String {
    let trimmed = value.trim();
    if aggressive {
        NON_ALPHANUMERIC
            .replace_all(&trimmed.to_lowercase(), "")
            .into_owned()
    } else {
        WHITESPACE_RUN.replace_all(trimmed, " ").into_owned()
    }
}

/// Normalize every value of a text column. Nulls stay null.
///
/// Returns the new series and the number of values that changed.
pub(crate) fn normalize_column(series: &Series, aggressive: bool) -> Result<(Series, usize)> {
    let text = series.cast(&DataType::String)?;
    let mut changed = 0;
    let values: Vec<Option<String>> = text
        .str()?
        .into_iter()
        .map(|opt| {
            opt.map(|val| {
                let normalized = normalize_value(val, aggressive);
                if normalized != val {
                    changed += 1;
                }
                normalized
            })
        })
        .collect();

    Ok((Series::new(series.name().clone(), values), changed))
}
