//! Data quality analyzers.
//!
//! Each analyzer is a unit struct with an associated `analyze` function that
//! takes a dataset and returns a plain, serializable report. Analyzers never
//! mutate their input and are independent of each other, so the pipeline can
//! run them concurrently. The [`QualityScorer`] folds four of the reports into
//! a single 0-100 score.

mod correlations;
mod data_types;
mod drift;
mod duplicates;
mod inconsistencies;
mod missing;
mod outliers;
mod scorer;

pub use correlations::{
    CategoricalAssociation, CorrelatedPair, CorrelationAnalyzer, CorrelationsReport, SkippedPair,
};
pub use data_types::{
    BooleanCandidate, DataTypeAnalyzer, DataTypesReport, FloatIntCandidate, HighCardinalityColumn,
    MixedTypeColumn, TypeSummary,
};
pub use drift::{CategoricalDrift, DriftAnalyzer, DriftReport, NumericDrift, ValueRange};
pub use duplicates::{
    DuplicateAnalyzer, DuplicateGroup, DuplicatesReport, SubsetDuplicates, duplicated_keep_first,
};
pub use inconsistencies::{
    CaseIssue, CountIssue, InconsistenciesReport, InconsistencyAnalyzer, InconsistencySummary,
    LengthSpread, RareCategories, SampledIssue,
};
pub use missing::{
    MissingColumnDetail, MissingPattern, MissingSummary, MissingValueAnalyzer, MissingValuesReport,
};
pub use outliers::{OutlierAnalyzer, OutlierDetail, OutliersReport};
pub use scorer::{Grade, QualityScore, QualityScorer, ScoreBreakdown};
