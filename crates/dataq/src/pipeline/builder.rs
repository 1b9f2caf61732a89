//! Pipeline orchestration.
//!
//! The `Pipeline` profiles a dataset, runs the quality analyzers, cleans the
//! data using their reports and scores the result.

use crate::cleaner::{CleaningInputs, DataCleaner};
use crate::config::{CleaningConfig, ConfigValidationError};
use crate::error::{DataQualityError, Result};
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::{DataProfiler, ProfilingReport};
use crate::quality::{
    CorrelationAnalyzer, CorrelationsReport, DataTypeAnalyzer, DataTypesReport, DriftAnalyzer,
    DriftReport, DuplicateAnalyzer, DuplicatesReport, InconsistenciesReport,
    InconsistencyAnalyzer, MissingValueAnalyzer, MissingValuesReport, OutlierAnalyzer,
    OutliersReport, QualityScore, QualityScorer,
};
use crate::types::{DataQualityReport, PipelineSummary};
use crate::utils::{memory_usage_mb, round_to};
use polars::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::ScopedJoinHandle;
use std::time::Instant;
use tracing::{debug, error, info};

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub report: DataQualityReport,
    pub cleaned: DataFrame,
}

/// The data-quality pipeline.
///
/// Use [`Pipeline::builder()`] to create a pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use dataq::{CleaningConfig, DuplicateStrategy, Pipeline};
///
/// let output = Pipeline::builder()
///     .config(
///         CleaningConfig::builder()
///             .duplicate_strategy(DuplicateStrategy::Remove)
///             .build()?,
///     )
///     .reference(last_month)
///     .on_progress(|update| println!("{}", update.message))
///     .build()?
///     .run(this_month)?;
///
/// println!("score: {}", output.report.quality_score.score);
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    reference: Option<DataFrame>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

/// Reports produced during the analysis stage.
struct AnalysisReports {
    missing_values: MissingValuesReport,
    duplicates: DuplicatesReport,
    data_types: DataTypesReport,
    inconsistencies: InconsistenciesReport,
    outliers: OutliersReport,
    correlations: CorrelationsReport,
    drift: Option<DriftReport>,
}

/// Finished-analyzer counter shared by the analysis threads.
struct AnalysisProgress {
    done: AtomicUsize,
    total: usize,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Analyze and clean `df`.
    ///
    /// # Errors
    ///
    /// Returns [`DataQualityError::AnalysisFailed`] if any analyzer fails
    /// outright. No partial report is produced in that case.
    pub fn run(&self, df: DataFrame) -> Result<PipelineOutput> {
        match self.run_internal(df) {
            Ok(output) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Pipeline completed with quality score {}",
                    output.report.quality_score.score
                )));
                Ok(output)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self, df: DataFrame) -> Result<PipelineOutput> {
        let start_time = Instant::now();

        info!("Starting data-quality pipeline...");
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Initializing,
            0.0,
            "Starting data-quality pipeline...",
        ));

        let rows_original = df.height();
        let columns = df.width();
        let memory_mb = round_to(memory_usage_mb(&df), 2);
        debug!(
            "Input: {} rows x {} columns ({} MB)",
            rows_original, columns, memory_mb
        );

        // Step 1: Profile
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Profiling,
            0.0,
            "Profiling dataset...",
        ));
        info!("Step 1: Profiling dataset...");
        let profiling = run_step("profiling", || DataProfiler::profile(&df))?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Profiling,
            1.0,
            "Profiling complete",
        ));

        // Step 2: Quality analyzers
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Analysis,
            0.0,
            "Analyzing data quality...",
        ));
        info!(
            "Step 2: Running quality analyzers ({})...",
            if self.config.parallel_analysis {
                "parallel"
            } else {
                "sequential"
            }
        );
        let reports = if self.config.parallel_analysis {
            self.analyze_parallel(&df)?
        } else {
            self.analyze_sequential(&df)?
        };

        // Step 3: Clean
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Cleaning,
            0.0,
            "Cleaning dataset...",
        ));
        info!("Step 3: Cleaning dataset...");
        let inputs = CleaningInputs {
            duplicates: Some(&reports.duplicates),
            data_types: Some(&reports.data_types),
            outliers: Some(&reports.outliers),
        };
        let outcome = DataCleaner::clean(df, inputs, &self.config);
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Cleaning,
            1.0,
            format!("Cleaning complete ({} steps)", outcome.steps.len()),
        ));

        // Step 4: Score
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Scoring,
            0.0,
            "Scoring data quality...",
        ));
        let quality_score = QualityScorer::score(
            &reports.missing_values,
            &reports.duplicates,
            &reports.outliers,
            &reports.inconsistencies,
        );
        info!(
            "Step 4: Quality score {} ({})",
            quality_score.score, quality_score.grade
        );

        let summary = PipelineSummary {
            rows_original,
            rows_cleaned: outcome.data.height(),
            columns,
            columns_cleaned: outcome.data.width(),
            memory_usage_mb: memory_mb,
            duration_ms: start_time.elapsed().as_millis() as u64,
            cleaning_steps: outcome.steps,
        };

        info!(
            "Pipeline finished in {} ms: {} -> {} rows",
            summary.duration_ms, summary.rows_original, summary.rows_cleaned
        );

        Ok(PipelineOutput {
            report: assemble(profiling, reports, quality_score, summary),
            cleaned: outcome.data,
        })
    }

    fn analysis_progress(&self) -> AnalysisProgress {
        AnalysisProgress {
            done: AtomicUsize::new(0),
            total: if self.reference.is_some() { 7 } else { 6 },
        }
    }

    /// Run one analyzer and report its completion.
    fn run_analyzer<T>(
        &self,
        name: &str,
        progress: &AnalysisProgress,
        analyze: impl FnOnce() -> anyhow::Result<T>,
    ) -> Result<T> {
        let result = run_step(name, analyze);
        let done = progress.done.fetch_add(1, Ordering::SeqCst) + 1;
        self.report_progress(ProgressUpdate::with_items(
            PipelineStage::Analysis,
            name,
            done,
            progress.total,
            format!("Finished {name} analysis"),
        ));
        result
    }

    fn analyze_sequential(&self, df: &DataFrame) -> Result<AnalysisReports> {
        let progress = self.analysis_progress();
        Ok(AnalysisReports {
            missing_values: self.run_analyzer("missing_values", &progress, || {
                MissingValueAnalyzer::analyze(df)
            })?,
            duplicates: self.run_analyzer("duplicates", &progress, || {
                DuplicateAnalyzer::analyze(df)
            })?,
            data_types: self.run_analyzer("data_types", &progress, || {
                DataTypeAnalyzer::analyze(df)
            })?,
            inconsistencies: self.run_analyzer("inconsistencies", &progress, || {
                InconsistencyAnalyzer::analyze(df)
            })?,
            outliers: self.run_analyzer("outliers", &progress, || OutlierAnalyzer::analyze(df))?,
            correlations: self.run_analyzer("correlations", &progress, || {
                CorrelationAnalyzer::analyze(df)
            })?,
            drift: self
                .reference
                .as_ref()
                .map(|reference| {
                    self.run_analyzer("drift", &progress, || {
                        DriftAnalyzer::analyze(reference, df)
                    })
                })
                .transpose()?,
        })
    }

    /// Run every analyzer on its own scoped thread. The dataset is shared
    /// read-only; each thread returns its own report.
    fn analyze_parallel(&self, df: &DataFrame) -> Result<AnalysisReports> {
        let progress = self.analysis_progress();
        let progress = &progress;

        std::thread::scope(|s| {
            let missing_values = s.spawn(|| {
                self.run_analyzer("missing_values", progress, || {
                    MissingValueAnalyzer::analyze(df)
                })
            });
            let duplicates = s.spawn(|| {
                self.run_analyzer("duplicates", progress, || DuplicateAnalyzer::analyze(df))
            });
            let data_types = s.spawn(|| {
                self.run_analyzer("data_types", progress, || DataTypeAnalyzer::analyze(df))
            });
            let inconsistencies = s.spawn(|| {
                self.run_analyzer("inconsistencies", progress, || {
                    InconsistencyAnalyzer::analyze(df)
                })
            });
            let outliers = s.spawn(|| {
                self.run_analyzer("outliers", progress, || OutlierAnalyzer::analyze(df))
            });
            let correlations = s.spawn(|| {
                self.run_analyzer("correlations", progress, || CorrelationAnalyzer::analyze(df))
            });
            let drift = self.reference.as_ref().map(|reference| {
                s.spawn(move || {
                    self.run_analyzer("drift", progress, || {
                        DriftAnalyzer::analyze(reference, df)
                    })
                })
            });

            // Join every thread before propagating any failure.
            let missing_values = join("missing_values", missing_values);
            let duplicates = join("duplicates", duplicates);
            let data_types = join("data_types", data_types);
            let inconsistencies = join("inconsistencies", inconsistencies);
            let outliers = join("outliers", outliers);
            let correlations = join("correlations", correlations);
            let drift = drift.map(|handle| join("drift", handle)).transpose();

            Ok(AnalysisReports {
                missing_values: missing_values?,
                duplicates: duplicates?,
                data_types: data_types?,
                inconsistencies: inconsistencies?,
                outliers: outliers?,
                correlations: correlations?,
                drift: drift?,
            })
        })
    }
}

/// Run a fallible analysis step, converting failures to the boundary error.
fn run_step<T>(name: &str, step: impl FnOnce() -> anyhow::Result<T>) -> Result<T> {
    let started = Instant::now();
    let result = step().map_err(|e| DataQualityError::analysis(name, format!("{e:#}")));
    debug!("{} finished in {:?}", name, started.elapsed());
    result
}

fn join<T>(name: &str, handle: ScopedJoinHandle<'_, Result<T>>) -> Result<T> {
    handle
        .join()
        .map_err(|_| DataQualityError::analysis(name, "analyzer thread panicked"))?
}

fn assemble(
    profiling: ProfilingReport,
    reports: AnalysisReports,
    quality_score: QualityScore,
    summary: PipelineSummary,
) -> DataQualityReport {
    DataQualityReport {
        profiling,
        missing_values: reports.missing_values,
        duplicates: reports.duplicates,
        data_types: reports.data_types,
        inconsistencies: reports.inconsistencies,
        outliers: reports.outliers,
        correlations: reports.correlations,
        drift: reports.drift,
        quality_score,
        summary,
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    reference: Option<DataFrame>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the cleaning configuration.
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a reference dataset. Enables drift analysis, with the reference
    /// as the "old" side.
    pub fn reference(mut self, reference: DataFrame) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Set a progress reporter for receiving updates during a run.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use dataq::{ProgressReporter, ProgressUpdate};
    /// use std::sync::Arc;
    ///
    /// struct StderrReporter;
    ///
    /// impl ProgressReporter for StderrReporter {
    ///     fn report(&self, update: ProgressUpdate) {
    ///         eprintln!("{}: {}", update.stage.display_name(), update.message);
    ///     }
    /// }
    ///
    /// let pipeline = Pipeline::builder()
    ///     .progress_reporter(Arc::new(StderrReporter))
    ///     .build()?;
    /// ```
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// The closure may be called from analyzer threads.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            reference: self.reference,
            progress_reporter: self.progress_reporter,
        })
    }
}
