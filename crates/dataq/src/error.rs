//! Error types for the data-quality pipeline.
//!
//! Analyzers and cleaning helpers work with `anyhow::Result` internally; the
//! pipeline boundary converts failures into [`DataQualityError`], which carries
//! a stable error code and serializes as `{code, message}` for API consumers.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the data-quality pipeline.
#[derive(Error, Debug)]
pub enum DataQualityError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input exceeded the configured byte ceiling.
    #[error("Input is {size} bytes, exceeding the limit of {limit} bytes")]
    InputTooLarge { size: u64, limit: u64 },

    /// Input could not be parsed into a dataset.
    #[error("Failed to load dataset: {0}")]
    IngestFailed(String),

    /// An analyzer failed outright.
    #[error("{analyzer} analysis failed: {reason}")]
    AnalysisFailed { analyzer: String, reason: String },

    /// Report export failed.
    #[error("Failed to write report: {0}")]
    ReportWriteFailed(String),

    /// Requested job does not exist (or has expired).
    #[error("Job '{0}' not found")]
    JobNotFound(String),

    /// Internal error (e.g., thread join failure).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<DataQualityError>,
    },
}

impl DataQualityError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        DataQualityError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for an analyzer failure.
    pub fn analysis(analyzer: impl Into<String>, reason: impl ToString) -> Self {
        DataQualityError::AnalysisFailed {
            analyzer: analyzer.into(),
            reason: reason.to_string(),
        }
    }

    /// Get error code for client handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InputTooLarge { .. } => "INPUT_TOO_LARGE",
            Self::IngestFailed(_) => "INGEST_FAILED",
            Self::AnalysisFailed { .. } => "ANALYSIS_FAILED",
            Self::ReportWriteFailed(_) => "REPORT_WRITE_FAILED",
            Self::JobNotFound(_) => "JOB_NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the caller supplied input the pipeline cannot process
    /// (as opposed to an internal fault).
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::InputTooLarge { .. }
            | Self::IngestFailed(_)
            | Self::InvalidConfig(_)
            | Self::ColumnNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for DataQualityError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("DataQualityError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, DataQualityError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| DataQualityError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            DataQualityError::ColumnNotFound("test".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            DataQualityError::InputTooLarge { size: 10, limit: 5 }.error_code(),
            "INPUT_TOO_LARGE"
        );
        assert_eq!(
            DataQualityError::analysis("outliers", "boom").error_code(),
            "ANALYSIS_FAILED"
        );
    }

    #[test]
    fn test_is_input_error() {
        assert!(DataQualityError::InputTooLarge { size: 10, limit: 5 }.is_input_error());
        assert!(DataQualityError::IngestFailed("bad".into()).is_input_error());
        assert!(!DataQualityError::Internal("panic".into()).is_input_error());
        assert!(
            DataQualityError::IngestFailed("bad".into())
                .with_context("Loading upload")
                .is_input_error()
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = DataQualityError::JobNotFound("abc123".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("JOB_NOT_FOUND"));
        assert!(json.contains("abc123"));
    }

    #[test]
    fn test_with_context() {
        let error =
            DataQualityError::ColumnNotFound("test".to_string()).with_context("During profiling");
        assert!(error.to_string().contains("During profiling"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_analysis_message() {
        let error = DataQualityError::analysis("correlations", "matrix failed");
        assert_eq!(
            error.to_string(),
            "correlations analysis failed: matrix failed"
        );
    }
}
