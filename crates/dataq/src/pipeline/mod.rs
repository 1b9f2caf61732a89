//! Pipeline module.
//!
//! Orchestrates profiling, the quality analyzers, cleaning and scoring.

mod builder;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder, PipelineOutput};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
