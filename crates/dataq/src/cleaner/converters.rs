//! Type fixes driven by the data-type report.

use crate::utils::{
    column_strings, is_datetime_dtype, is_float_dtype, numeric_values, parse_datetime,
};
use anyhow::{Result, bail};
use polars::prelude::*;

/// Parse a text column into millisecond datetimes.
///
/// Values that do not parse become null. Returns the converted series and
/// the number of non-null inputs that failed to parse.
pub(crate) fn parse_dates(series: &Series) -> Result<(Series, usize)> {
    if is_datetime_dtype(series.dtype()) {
        bail!("already a temporal column");
    }

    let mut unparsed = 0;
    let millis: Vec<Option<i64>> = column_strings(series)?
        .into_iter()
        .map(|opt| {
            opt.and_then(|val| {
                let parsed = parse_datetime(&val).map(|dt| dt.and_utc().timestamp_millis());
                if parsed.is_none() {
                    unparsed += 1;
                }
                parsed
            })
        })
        .collect();

    let converted = Series::new(series.name().clone(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    Ok((converted, unparsed))
}

/// Convert a float column whose values are all whole numbers to `Int64`.
///
/// Integrality is checked again here because imputation may have introduced
/// fractional fill values since the data-type report was produced.
pub(crate) fn float_to_int(series: &Series) -> Result<Series> {
    if !is_float_dtype(series.dtype()) {
        bail!("not a float column ({})", series.dtype());
    }

    let values = numeric_values(series)?;
    if let Some(v) = values.iter().flatten().find(|v| v.fract() != 0.0) {
        bail!("holds a fractional value ({v})");
    }

    let ints: Vec<Option<i64>> = values.iter().map(|v| v.map(|x| x as i64)).collect();
    Ok(Series::new(series.name().clone(), ints))
}
