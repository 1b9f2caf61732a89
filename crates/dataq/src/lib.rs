//! Data-quality analysis and cleaning for tabular datasets, built on Polars.
//!
//! # Overview
//!
//! A run takes one dataset (plus an optional reference dataset) and produces:
//!
//! - **Profiling**: shape, per-column semantic type, descriptive statistics
//! - **Quality analysis**: missing values, duplicates, data-type problems, text
//!   inconsistencies, outliers, correlations and (with a reference) drift
//! - **Cleaning**: imputation, duplicate handling, type fixes, text
//!   normalization, outlier treatment and optional constant-column removal
//! - **Scoring**: a 0-100 quality score with a letter grade
//!
//! All reports are plain serde data, so the combined [`DataQualityReport`]
//! serializes straight to JSON.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dataq::{CleaningConfig, DuplicateStrategy, IngestConfig, Pipeline};
//! use dataq::ingest::read_csv_file;
//!
//! let df = read_csv_file("data/sales.csv", &IngestConfig::default())?;
//!
//! let config = CleaningConfig::builder()
//!     .duplicate_strategy(DuplicateStrategy::Remove)
//!     .remove_constants(true)
//!     .build()?;
//!
//! let output = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(df)?;
//!
//! println!(
//!     "Quality: {:.1} ({:?})",
//!     output.report.quality_score.score, output.report.quality_score.grade
//! );
//! ```
//!
//! # Drift
//!
//! Supplying a reference dataset adds a `drift` section comparing the
//! numeric and categorical distributions of the two:
//!
//! ```rust,ignore
//! let output = Pipeline::builder()
//!     .reference(last_month)
//!     .build()?
//!     .run(this_month)?;
//! assert!(output.report.drift.is_some());
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod ingest;
pub mod jobs;
pub mod pipeline;
pub mod profiler;
pub mod quality;
pub mod reporting;
pub mod stats;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{CleaningInputs, CleaningOutcome, DataCleaner};
pub use config::{
    CleaningConfig, CleaningConfigBuilder, ConfigValidationError, DuplicateStrategy, IngestConfig,
    MissingStrategy, OutlierMethod,
};
pub use error::{DataQualityError, Result as DataQualityResult, ResultExt};
pub use jobs::{JobInfo, JobStore};
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineOutput, PipelineStage,
    ProgressReporter, ProgressUpdate,
};
pub use profiler::{DataProfiler, ProfilingReport};
pub use quality::{Grade, QualityScore, QualityScorer};
pub use reporting::ReportWriter;
pub use types::{DataQualityReport, PipelineSummary, SemanticType, Severity};

static_assertions::assert_impl_all!(DataQualityReport: Send, Sync);
