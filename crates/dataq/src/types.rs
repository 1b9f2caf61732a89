//! Shared types for the data-quality pipeline.

use crate::profiler::ProfilingReport;
use crate::quality::{
    CorrelationsReport, DataTypesReport, DriftReport, DuplicatesReport, InconsistenciesReport,
    MissingValuesReport, OutliersReport, QualityScore,
};
use polars::prelude::DataType;
use serde::{Deserialize, Serialize};

/// Ordered severity scale shared by every analyzer.
///
/// Each analyzer maps its own metric onto this scale with fixed thresholds,
/// so the ordering (`None < Low < Medium < High`) is meaningful across reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic family of a column, derived from its physical dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// Integer or floating point numbers
    Numeric,
    /// Free text or categorical labels
    Categorical,
    /// Date, datetime or time values
    Datetime,
    /// True/false values
    Boolean,
    /// Anything else (lists, structs, binary, ...)
    Other,
}

impl SemanticType {
    /// Classify a polars dtype.
    pub fn of(dtype: &DataType) -> Self {
        if crate::utils::is_numeric_dtype(dtype) {
            Self::Numeric
        } else if crate::utils::is_datetime_dtype(dtype) {
            Self::Datetime
        } else if matches!(dtype, DataType::Boolean) {
            Self::Boolean
        } else if crate::utils::is_text_dtype(dtype) {
            Self::Categorical
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Datetime => "datetime",
            Self::Boolean => "boolean",
            Self::Other => "other",
        }
    }
}

/// Result of one per-column or per-pair unit of work inside an analyzer.
///
/// Analyzers collect these instead of aborting on the first bad column;
/// skipped units end up in the report's `skipped` map.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome<T> {
    Done(T),
    Skipped(String),
}

impl<T> UnitOutcome<T> {
    pub fn skipped(reason: impl ToString) -> Self {
        Self::Skipped(reason.to_string())
    }

    /// Fold a fallible computation into an outcome.
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Done(value),
            Err(e) => Self::Skipped(e.to_string()),
        }
    }
}

/// Top-level summary block of a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub rows_original: usize,
    pub rows_cleaned: usize,
    pub columns: usize,
    pub columns_cleaned: usize,
    pub memory_usage_mb: f64,
    pub duration_ms: u64,
    /// Ordered log of what the cleaning stage did (and skipped).
    pub cleaning_steps: Vec<String>,
}

/// Combined report keyed by analyzer name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub profiling: ProfilingReport,
    pub missing_values: MissingValuesReport,
    pub duplicates: DuplicatesReport,
    pub data_types: DataTypesReport,
    pub inconsistencies: InconsistenciesReport,
    pub outliers: OutliersReport,
    pub correlations: CorrelationsReport,
    /// Absent unless a reference dataset was supplied.
    pub drift: Option<DriftReport>,
    pub quality_score: QualityScore,
    pub summary: PipelineSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::None < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert_eq!(Severity::default(), Severity::None);
    }

    #[test]
    fn test_severity_serializes_as_label() {
        assert_eq!(serde_json::to_string(&Severity::Medium).unwrap(), "\"Medium\"");
        assert_eq!(serde_json::to_string(&Severity::None).unwrap(), "\"None\"");
    }

    #[test]
    fn test_semantic_type_of() {
        assert_eq!(SemanticType::of(&DataType::Int64), SemanticType::Numeric);
        assert_eq!(SemanticType::of(&DataType::Float32), SemanticType::Numeric);
        assert_eq!(SemanticType::of(&DataType::String), SemanticType::Categorical);
        assert_eq!(SemanticType::of(&DataType::Date), SemanticType::Datetime);
        assert_eq!(SemanticType::of(&DataType::Boolean), SemanticType::Boolean);
        assert_eq!(SemanticType::of(&DataType::Null), SemanticType::Other);
    }

    #[test]
    fn test_unit_outcome_from_result() {
        let ok: Result<i32, String> = Ok(3);
        let err: Result<i32, String> = Err("bad column".to_string());
        assert_eq!(UnitOutcome::from_result(ok), UnitOutcome::Done(3));
        assert_eq!(
            UnitOutcome::from_result(err),
            UnitOutcome::<i32>::Skipped("bad column".to_string())
        );
    }
}
