//! Cleaning stage.
//!
//! Applies a fixed sequence of transforms to a dataset, guided by the
//! analyzer reports and the [`CleaningConfig`]:
//! 1. Impute missing values
//! 2. Handle duplicate rows
//! 3. Fix column types flagged by the data-type report
//! 4. Normalize text columns
//! 5. Treat outliers in the columns the outlier report examined
//! 6. Optionally drop constant columns
//!
//! A step whose report is absent passes the data through. A failure in one
//! column is logged and skipped; it never aborts the stage.

mod converters;
mod imputation;
mod outliers;
mod sanitizers;

use crate::config::{CleaningConfig, DuplicateStrategy, MissingStrategy, OutlierMethod};
use crate::quality::{DataTypesReport, DuplicatesReport, OutliersReport, duplicated_keep_first};
use crate::types::Severity;
use crate::utils::{
    column_names, columns_where, distinct_count, is_numeric_dtype, is_text_dtype, row_keys,
};
use anyhow::Result;
use polars::prelude::*;
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Name of the marker column added by the `flag` duplicate strategy.
pub const DUPLICATE_FLAG_COLUMN: &str = "_is_duplicate";

/// Reports the cleaning stage consults. Any of them may be absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleaningInputs<'a> {
    pub duplicates: Option<&'a DuplicatesReport>,
    pub data_types: Option<&'a DataTypesReport>,
    pub outliers: Option<&'a OutliersReport>,
}

/// Cleaned dataset plus an ordered log of what was done.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub data: DataFrame,
    pub steps: Vec<String>,
}

/// Data cleaner applying the configured strategies.
pub struct DataCleaner;

impl DataCleaner {
    pub fn clean(
        df: DataFrame,
        inputs: CleaningInputs<'_>,
        config: &CleaningConfig,
    ) -> CleaningOutcome {
        let mut df = df;
        let mut steps = Vec::new();

        info!(
            "Cleaning dataset ({} rows x {} columns)...",
            df.height(),
            df.width()
        );

        Self::impute_missing(&mut df, config.missing_strategy, &mut steps);

        if let Err(e) = Self::handle_duplicates(
            &mut df,
            inputs.duplicates,
            config.duplicate_strategy,
            &mut steps,
        ) {
            skip(&mut steps, "duplicate handling", e);
        }

        if let Some(report) = inputs.data_types {
            Self::fix_types(&mut df, report, &mut steps);
        }

        if config.normalize_text {
            Self::normalize_text(&mut df, config.aggressive_text, &mut steps);
        }

        if let Some(report) = inputs.outliers {
            Self::treat_outliers(&mut df, report, config.outlier_method, &mut steps);
        }

        if config.remove_constants
            && let Err(e) = Self::remove_constant_columns(&mut df, &mut steps)
        {
            skip(&mut steps, "constant column removal", e);
        }

        info!(
            "Cleaning complete: {} rows x {} columns, {} steps",
            df.height(),
            df.width(),
            steps.len()
        );

        CleaningOutcome { data: df, steps }
    }

    fn impute_missing(df: &mut DataFrame, strategy: MissingStrategy, steps: &mut Vec<String>) {
        for name in column_names(df) {
            let result = df
                .column(&name)
                .map_err(anyhow::Error::from)
                .and_then(|col| {
                    imputation::impute_column(col.as_materialized_series(), strategy)
                });

            match result {
                Ok(Some(imputed)) => {
                    if let Err(e) = df.replace(&name, imputed.series) {
                        skip(steps, &format!("imputation of '{name}'"), e);
                        continue;
                    }
                    debug!("Imputed '{}' with {}", name, imputed.method);
                    steps.push(format!(
                        "Filled {} missing values in '{}' with {}",
                        imputed.filled, name, imputed.method
                    ));
                }
                Ok(None) => {}
                Err(e) => skip(steps, &format!("imputation of '{name}'"), e),
            }
        }
    }

    /// Apply the duplicate strategy. Duplicates are found from the rows
    /// themselves, so `keep`, `flag` and `remove` behave the same with or
    /// without a report. Only `auto` consults the report; without one it
    /// falls back to flagging.
    fn handle_duplicates(
        df: &mut DataFrame,
        report: Option<&DuplicatesReport>,
        strategy: DuplicateStrategy,
        steps: &mut Vec<String>,
    ) -> Result<()> {
        let remove = match strategy {
            DuplicateStrategy::Keep => {
                steps.push("Kept duplicate rows".to_string());
                return Ok(());
            }
            DuplicateStrategy::Flag => false,
            DuplicateStrategy::Remove => true,
            DuplicateStrategy::Auto => matches!(
                report.map(|r| r.severity),
                Some(Severity::High | Severity::Medium)
            ),
        };

        let keys = row_keys(df, &column_names(df))?;
        let duplicated = duplicated_keep_first(&keys);
        let count = duplicated.iter().filter(|&&d| d).count();

        if remove {
            let keep: Vec<bool> = duplicated.iter().map(|&d| !d).collect();
            *df = df.filter(&BooleanChunked::from_slice("keep".into(), &keep))?;
            steps.push(format!("Removed {count} duplicate rows (kept first occurrence)"));
        } else {
            df.with_column(Series::new(DUPLICATE_FLAG_COLUMN.into(), duplicated))?;
            steps.push(format!(
                "Flagged {count} duplicate rows in '{DUPLICATE_FLAG_COLUMN}'"
            ));
        }
        Ok(())
    }

    fn fix_types(df: &mut DataFrame, report: &DataTypesReport, steps: &mut Vec<String>) {
        for name in &report.possible_date_columns {
            let Ok(col) = df.column(name) else {
                continue;
            };
            match converters::parse_dates(col.as_materialized_series()) {
                Ok((parsed, unparsed)) => {
                    if let Err(e) = df.replace(name, parsed) {
                        skip(steps, &format!("date conversion of '{name}'"), e);
                        continue;
                    }
                    steps.push(format!(
                        "Converted '{name}' to datetime ({unparsed} unparseable values set to null)"
                    ));
                }
                Err(e) => skip(steps, &format!("date conversion of '{name}'"), e),
            }
        }

        for name in &report.float_int_candidates {
            let Ok(col) = df.column(name) else {
                continue;
            };
            match converters::float_to_int(col.as_materialized_series()) {
                Ok(ints) => {
                    if let Err(e) = df.replace(name, ints) {
                        skip(steps, &format!("integer conversion of '{name}'"), e);
                        continue;
                    }
                    steps.push(format!("Converted '{name}' from float to Int64"));
                }
                Err(e) => skip(steps, &format!("integer conversion of '{name}'"), e),
            }
        }
    }

    fn normalize_text(df: &mut DataFrame, aggressive: bool, steps: &mut Vec<String>) {
        let mode = if aggressive { "aggressive" } else { "standard" };
        for name in columns_where(df, is_text_dtype) {
            let result = df
                .column(&name)
                .map_err(anyhow::Error::from)
                .and_then(|col| {
                    sanitizers::normalize_column(col.as_materialized_series(), aggressive)
                });

            match result {
                Ok((normalized, changed)) => {
                    if let Err(e) = df.replace(&name, normalized) {
                        skip(steps, &format!("text normalization of '{name}'"), e);
                        continue;
                    }
                    if changed > 0 {
                        steps.push(format!(
                            "Normalized {changed} text values in '{name}' ({mode})"
                        ));
                    }
                }
                Err(e) => skip(steps, &format!("text normalization of '{name}'"), e),
            }
        }
    }

    fn treat_outliers(
        df: &mut DataFrame,
        report: &OutliersReport,
        method: OutlierMethod,
        steps: &mut Vec<String>,
    ) {
        if method == OutlierMethod::Keep {
            steps.push("Kept outliers unchanged".to_string());
            return;
        }

        for name in &report.numeric_columns {
            let numeric = df
                .column(name)
                .map(|col| is_numeric_dtype(col.dtype()))
                .unwrap_or(false);
            if !numeric {
                debug!("Outlier column '{}' is no longer numeric; skipping", name);
                continue;
            }
            match outliers::treat_column(df, name, method) {
                Ok(step) => steps.push(step),
                Err(e) => skip(steps, &format!("outlier treatment of '{name}'"), e),
            }
        }
    }

    fn remove_constant_columns(df: &mut DataFrame, steps: &mut Vec<String>) -> Result<()> {
        let mut constant = Vec::new();
        for col in df.get_columns() {
            if distinct_count(col.as_materialized_series())? == 1 {
                constant.push(col.name().to_string());
            }
        }

        if constant.is_empty() {
            return Ok(());
        }

        let names: Vec<PlSmallStr> = constant.iter().map(|s| s.as_str().into()).collect();
        *df = df.drop_many(names);
        steps.push(format!(
            "Removed {} constant columns: {}",
            constant.len(),
            constant.join(", ")
        ));
        Ok(())
    }
}

fn skip(steps: &mut Vec<String>, what: &str, reason: impl Display) {
    warn!("Skipped {}: {}", what, reason);
    steps.push(format!("Skipped {what}: {reason}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::DuplicatesReport;
    use pretty_assertions::assert_eq;

    fn config() -> CleaningConfig {
        CleaningConfig::default()
    }

    fn dirty_df() -> DataFrame {
        df! {
            "name" => [Some("  alice  "), Some("bob"), Some("bob"), None],
            "age" => [Some(30i64), Some(40), Some(40), None],
            "joined" => ["2024-01-01", "2024-02-01", "2024-02-01", "bad"],
        }
        .unwrap()
    }

    #[test]
    fn test_default_cleaning_flags_duplicates() {
        let outcome = DataCleaner::clean(dirty_df(), CleaningInputs::default(), &config());
        let df = outcome.data;

        assert_eq!(df.height(), 4);
        let flags: Vec<Option<bool>> = df
            .column(DUPLICATE_FLAG_COLUMN)
            .unwrap()
            .as_materialized_series()
            .bool()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(flags, vec![Some(false), Some(false), Some(true), Some(false)]);

        let names: Vec<Option<&str>> = df
            .column("name")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(names, vec![Some("alice"), Some("bob"), Some("bob"), Some("bob")]);
        assert_eq!(df.column("age").unwrap().null_count(), 0);
    }

    #[test]
    fn test_auto_removes_on_high_severity() {
        let report = DuplicatesReport {
            duplicate_count: 1,
            severity: Severity::High,
            ..Default::default()
        };
        let config = CleaningConfig::builder()
            .duplicate_strategy(DuplicateStrategy::Auto)
            .build()
            .unwrap();
        let inputs = CleaningInputs {
            duplicates: Some(&report),
            ..Default::default()
        };
        let df = df! { "a" => [1i64, 1, 2] }.unwrap();
        let outcome = DataCleaner::clean(df, inputs, &config);
        assert_eq!(outcome.data.height(), 2);
        assert!(outcome.data.column(DUPLICATE_FLAG_COLUMN).is_err());
    }

    #[test]
    fn test_auto_without_report_flags() {
        let config = CleaningConfig::builder()
            .duplicate_strategy(DuplicateStrategy::Auto)
            .build()
            .unwrap();
        let df = df! { "a" => [1i64, 1, 2] }.unwrap();
        let outcome = DataCleaner::clean(df, CleaningInputs::default(), &config);
        assert_eq!(outcome.data.height(), 3);
        assert!(outcome.data.column(DUPLICATE_FLAG_COLUMN).is_ok());
    }

    #[test]
    fn test_remove_without_report() {
        let config = CleaningConfig::builder()
            .duplicate_strategy(DuplicateStrategy::Remove)
            .build()
            .unwrap();
        let df = df! { "a" => [1i64, 1, 2, 1] }.unwrap();
        let outcome = DataCleaner::clean(df, CleaningInputs::default(), &config);

        assert_eq!(outcome.data.height(), 2);
        assert!(outcome.data.column(DUPLICATE_FLAG_COLUMN).is_err());
        assert!(
            outcome
                .steps
                .contains(&"Removed 2 duplicate rows (kept first occurrence)".to_string())
        );
    }

    #[test]
    fn test_keep_without_report_leaves_rows() {
        let config = CleaningConfig::builder()
            .duplicate_strategy(DuplicateStrategy::Keep)
            .build()
            .unwrap();
        let df = df! { "a" => [1i64, 1, 2] }.unwrap();
        let outcome = DataCleaner::clean(df.clone(), CleaningInputs::default(), &config);

        assert!(outcome.data.equals(&df));
        assert_eq!(outcome.steps, vec!["Kept duplicate rows".to_string()]);
    }

    #[test]
    fn test_type_fixes_from_report() {
        let report = DataTypesReport {
            possible_date_columns: vec!["joined".to_string(), "missing_col".to_string()],
            ..Default::default()
        };
        let inputs = CleaningInputs {
            data_types: Some(&report),
            ..Default::default()
        };
        let config = CleaningConfig::builder()
            .duplicate_strategy(DuplicateStrategy::Keep)
            .build()
            .unwrap();
        let outcome = DataCleaner::clean(dirty_df(), inputs, &config);
        let joined = outcome.data.column("joined").unwrap();
        assert_eq!(
            joined.dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, None)
        );
        assert_eq!(joined.null_count(), 1);
        let expected = "Converted 'joined' to datetime (1 unparseable values set to null)";
        assert!(outcome.steps.iter().any(|s| s == expected));
    }

    #[test]
    fn test_outliers_only_on_reported_columns() {
        let df = df! {
            "a" => [1.0f64, 2.0, 3.0, 4.0, 100.0],
            "b" => [1.0f64, 2.0, 3.0, 4.0, 100.0],
        }
        .unwrap();
        let report = OutliersReport {
            numeric_columns: vec!["a".to_string()],
            ..Default::default()
        };
        let inputs = CleaningInputs {
            outliers: Some(&report),
            ..Default::default()
        };
        let config = CleaningConfig::builder()
            .duplicate_strategy(DuplicateStrategy::Keep)
            .build()
            .unwrap();
        let outcome = DataCleaner::clean(df, inputs, &config);
        let max_of = |name: &str| {
            outcome
                .data
                .column(name)
                .unwrap()
                .as_materialized_series()
                .max::<f64>()
                .unwrap()
        };
        let (max_a, max_b) = (max_of("a"), max_of("b"));
        assert_eq!(max_a, Some(7.0));
        assert_eq!(max_b, Some(100.0));
    }

    #[test]
    fn test_remove_constants() {
        let df = df! {
            "a" => [1i64, 2, 3],
            "k" => ["x", "x", "x"],
        }
        .unwrap();
        let config = CleaningConfig::builder()
            .duplicate_strategy(DuplicateStrategy::Keep)
            .remove_constants(true)
            .build()
            .unwrap();
        let outcome = DataCleaner::clean(df, CleaningInputs::default(), &config);
        assert_eq!(column_names(&outcome.data), vec!["a".to_string()]);
        assert_eq!(outcome.steps.last().unwrap(), "Removed 1 constant columns: k");
    }

    #[test]
    fn test_aggressive_text() {
        let df = df! { "t" => ["  Hello, World! "] }.unwrap();
        let config = CleaningConfig::builder()
            .duplicate_strategy(DuplicateStrategy::Keep)
            .aggressive_text(true)
            .build()
            .unwrap();
        let outcome = DataCleaner::clean(df, CleaningInputs::default(), &config);
        let t = outcome.data.column("t").unwrap().as_materialized_series().clone();
        assert_eq!(t.str().unwrap().get(0), Some("hello world"));
    }
}
