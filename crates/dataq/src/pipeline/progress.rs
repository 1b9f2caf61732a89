//! Progress reporting for pipeline runs.
//!
//! # Example
//!
//! ```rust,ignore
//! use dataq::Pipeline;
//!
//! let output = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(df)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Validating configuration and input
    Initializing,
    /// Building the dataset profile
    Profiling,
    /// Running the quality analyzers
    Analysis,
    /// Applying the cleaning strategies
    Cleaning,
    /// Computing the overall quality score
    Scoring,
    /// Run finished successfully
    Complete,
    /// Run aborted with an error
    Failed,
}

impl PipelineStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Profiling => "Profiling Dataset",
            Self::Analysis => "Analyzing Quality",
            Self::Cleaning => "Cleaning Data",
            Self::Scoring => "Scoring Quality",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run taken by this stage. The non-terminal stages
    /// sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.05,
            Self::Profiling => 0.15,
            Self::Analysis => 0.50,
            Self::Cleaning => 0.25,
            Self::Scoring => 0.05,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::Profiling => 0.05,
            Self::Analysis => 0.20,
            Self::Cleaning => 0.70,
            Self::Scoring => 0.95,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// One progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,

    /// Finer-grained activity, e.g. the analyzer that just finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within the current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        Self {
            stage,
            sub_stage: None,
            progress: (stage.base_progress() + stage.weight() * stage_progress).clamp(0.0, 1.0),
            stage_progress,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Update counting finished items within a stage.
    pub fn with_items(
        stage: PipelineStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            sub_stage: Some(sub_stage.into()),
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::new(stage, stage_progress, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Complete, 1.0, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            progress: 0.0,
            stage_progress: 0.0,
            ..Self::new(PipelineStage::Failed, 0.0, message)
        }
    }
}

/// Receiver of progress updates.
///
/// Implementations must be `Send + Sync`: analyzers running on worker
/// threads report their completion directly.
pub trait ProgressReporter: Send + Sync {
    /// Called once per stage transition and once per finished analyzer.
    /// Implementations should return quickly.
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
