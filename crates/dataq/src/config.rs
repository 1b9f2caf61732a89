//! Configuration types for the cleaning pipeline and CSV ingestion.
//!
//! Strategy enums parse tolerantly: an unrecognized token maps to a documented
//! fallback instead of failing, so configs coming from loosely typed callers
//! (query strings, JSON forms) always produce a runnable pipeline.

use serde::{Deserialize, Serialize};

/// How duplicate rows are handled by the cleaning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DuplicateStrategy {
    /// Leave duplicates untouched
    Keep,
    /// Add an `_is_duplicate` marker column
    #[default]
    Flag,
    /// Drop repeated rows, keeping first occurrences
    Remove,
    /// Remove on High/Medium duplicate severity, otherwise flag
    Auto,
}

impl From<&str> for DuplicateStrategy {
    /// Unknown tokens fall back to [`DuplicateStrategy::Keep`].
    fn from(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "flag" => Self::Flag,
            "remove" => Self::Remove,
            "auto" => Self::Auto,
            _ => Self::Keep,
        }
    }
}

impl From<String> for DuplicateStrategy {
    fn from(token: String) -> Self {
        Self::from(token.as_str())
    }
}

/// How missing numeric values are imputed. Non-numeric columns always use
/// the most frequent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum MissingStrategy {
    #[default]
    Median,
    Mean,
    Zero,
    /// Most frequent value; numeric columns fall back to the median
    Mode,
}

impl From<&str> for MissingStrategy {
    /// Unknown tokens fall back to [`MissingStrategy::Median`].
    fn from(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "mean" => Self::Mean,
            "zero" => Self::Zero,
            "mode" => Self::Mode,
            _ => Self::Median,
        }
    }
}

impl From<String> for MissingStrategy {
    fn from(token: String) -> Self {
        Self::from(token.as_str())
    }
}

/// How the cleaning stage treats values outside the 1.5×IQR fences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum OutlierMethod {
    /// Clamp into the fences
    #[default]
    Clip,
    /// Add a `{column}_is_outlier` marker column
    Flag,
    /// Drop rows outside the fences
    Remove,
    /// No outlier treatment
    Keep,
}

impl From<&str> for OutlierMethod {
    /// Unknown tokens fall back to [`OutlierMethod::Keep`].
    fn from(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "clip" => Self::Clip,
            "flag" => Self::Flag,
            "remove" => Self::Remove,
            _ => Self::Keep,
        }
    }
}

impl From<String> for OutlierMethod {
    fn from(token: String) -> Self {
        Self::from(token.as_str())
    }
}

/// Configuration for one pipeline run.
///
/// Use [`CleaningConfig::builder()`] for a validated configuration.
///
/// # Example
///
/// ```rust,ignore
/// use dataq::config::{CleaningConfig, DuplicateStrategy, OutlierMethod};
///
/// let config = CleaningConfig::builder()
///     .duplicate_strategy(DuplicateStrategy::Remove)
///     .outlier_method(OutlierMethod::Flag)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Default: Flag
    pub duplicate_strategy: DuplicateStrategy,

    /// Default: Median
    pub missing_strategy: MissingStrategy,

    /// Default: Clip
    pub outlier_method: OutlierMethod,

    /// Trim and collapse whitespace in text columns.
    /// Default: true
    pub normalize_text: bool,

    /// Additionally lower-case text and strip symbols.
    /// Requires `normalize_text`. Default: false
    pub aggressive_text: bool,

    /// Drop columns holding a single distinct value.
    /// Default: false
    pub remove_constants: bool,

    /// Run the analyzers on parallel threads.
    /// Default: true
    pub parallel_analysis: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            duplicate_strategy: DuplicateStrategy::default(),
            missing_strategy: MissingStrategy::default(),
            outlier_method: OutlierMethod::default(),
            normalize_text: true,
            aggressive_text: false,
            remove_constants: false,
            parallel_analysis: true,
        }
    }
}

impl CleaningConfig {
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.aggressive_text && !self.normalize_text {
            return Err(ConfigValidationError::AggressiveWithoutNormalize);
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Aggressive text normalization requires text normalization to be enabled")]
    AggressiveWithoutNormalize,

    #[error("Invalid value for '{field}': must be greater than zero")]
    ZeroLimit { field: String },
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    duplicate_strategy: Option<DuplicateStrategy>,
    missing_strategy: Option<MissingStrategy>,
    outlier_method: Option<OutlierMethod>,
    normalize_text: Option<bool>,
    aggressive_text: Option<bool>,
    remove_constants: Option<bool>,
    parallel_analysis: Option<bool>,
}

impl CleaningConfigBuilder {
    pub fn duplicate_strategy(mut self, strategy: DuplicateStrategy) -> Self {
        self.duplicate_strategy = Some(strategy);
        self
    }

    pub fn missing_strategy(mut self, strategy: MissingStrategy) -> Self {
        self.missing_strategy = Some(strategy);
        self
    }

    pub fn outlier_method(mut self, method: OutlierMethod) -> Self {
        self.outlier_method = Some(method);
        self
    }

    /// Enable or disable whitespace normalization of text columns.
    pub fn normalize_text(mut self, enable: bool) -> Self {
        self.normalize_text = Some(enable);
        self
    }

    /// Enable lower-casing and symbol stripping on top of normalization.
    pub fn aggressive_text(mut self, enable: bool) -> Self {
        self.aggressive_text = Some(enable);
        self
    }

    pub fn remove_constants(mut self, enable: bool) -> Self {
        self.remove_constants = Some(enable);
        self
    }

    /// Run analyzers concurrently (default) or one after another.
    pub fn parallel_analysis(mut self, enable: bool) -> Self {
        self.parallel_analysis = Some(enable);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let defaults = CleaningConfig::default();
        let config = CleaningConfig {
            duplicate_strategy: self.duplicate_strategy.unwrap_or_default(),
            missing_strategy: self.missing_strategy.unwrap_or_default(),
            outlier_method: self.outlier_method.unwrap_or_default(),
            normalize_text: self.normalize_text.unwrap_or(defaults.normalize_text),
            aggressive_text: self.aggressive_text.unwrap_or(defaults.aggressive_text),
            remove_constants: self.remove_constants.unwrap_or(defaults.remove_constants),
            parallel_analysis: self.parallel_analysis.unwrap_or(defaults.parallel_analysis),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Default upload ceiling: 100 MB.
pub const DEFAULT_MAX_BYTES: u64 = 100 * 1024 * 1024;

/// Limits applied when reading CSV input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Files larger than this are rejected before parsing.
    pub max_bytes: u64,
    /// Rows sampled for schema inference.
    pub infer_schema_length: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            infer_schema_length: 100,
        }
    }
}

impl IngestConfig {
    /// Set the byte ceiling in whole megabytes.
    pub fn with_max_megabytes(mut self, megabytes: u64) -> Self {
        self.max_bytes = megabytes.saturating_mul(1024 * 1024);
        self
    }

    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_bytes == 0 {
            return Err(ConfigValidationError::ZeroLimit {
                field: "max_bytes".to_string(),
            });
        }
        if self.infer_schema_length == 0 {
            return Err(ConfigValidationError::ZeroLimit {
                field: "infer_schema_length".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.duplicate_strategy, DuplicateStrategy::Flag);
        assert_eq!(config.missing_strategy, MissingStrategy::Median);
        assert_eq!(config.outlier_method, OutlierMethod::Clip);
        assert!(config.normalize_text);
        assert!(!config.aggressive_text);
        assert!(!config.remove_constants);
        assert!(config.parallel_analysis);
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let config = CleaningConfig::builder().build().unwrap();
        assert_eq!(config, CleaningConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = CleaningConfig::builder()
            .duplicate_strategy(DuplicateStrategy::Auto)
            .missing_strategy(MissingStrategy::Zero)
            .outlier_method(OutlierMethod::Remove)
            .aggressive_text(true)
            .remove_constants(true)
            .parallel_analysis(false)
            .build()
            .unwrap();

        assert_eq!(config.duplicate_strategy, DuplicateStrategy::Auto);
        assert_eq!(config.missing_strategy, MissingStrategy::Zero);
        assert_eq!(config.outlier_method, OutlierMethod::Remove);
        assert!(config.aggressive_text);
        assert!(config.remove_constants);
        assert!(!config.parallel_analysis);
    }

    #[test]
    fn test_validation_aggressive_requires_normalize() {
        let result = CleaningConfig::builder()
            .normalize_text(false)
            .aggressive_text(true)
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::AggressiveWithoutNormalize
        ));
    }

    #[test]
    fn test_tolerant_tokens() {
        assert_eq!(DuplicateStrategy::from("REMOVE"), DuplicateStrategy::Remove);
        assert_eq!(DuplicateStrategy::from("dedupe"), DuplicateStrategy::Keep);
        assert_eq!(MissingStrategy::from("interpolate"), MissingStrategy::Median);
        assert_eq!(OutlierMethod::from(" flag "), OutlierMethod::Flag);
        assert_eq!(OutlierMethod::from("winsorize"), OutlierMethod::Keep);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "duplicate_strategy": "auto",
            "missing_strategy": "bogus",
            "outlier_method": "clip",
            "remove_constants": true
        }"#;

        let config: CleaningConfig =
            serde_json::from_str(json).expect("Should deserialize partial JSON");

        assert_eq!(config.duplicate_strategy, DuplicateStrategy::Auto);
        assert_eq!(config.missing_strategy, MissingStrategy::Median);
        assert_eq!(config.outlier_method, OutlierMethod::Clip);
        assert!(config.remove_constants);
        assert!(config.normalize_text);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = CleaningConfig::builder()
            .outlier_method(OutlierMethod::Flag)
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"outlier_method\":\"flag\""));
        let back: CleaningConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_ingest_config() {
        let config = IngestConfig::default();
        assert_eq!(config.max_bytes, 100 * 1024 * 1024);
        assert_eq!(config.infer_schema_length, 100);
        assert_eq!(IngestConfig::default().with_max_megabytes(5).max_bytes, 5 * 1024 * 1024);

        let invalid = IngestConfig::default().with_infer_schema_length(0);
        assert!(matches!(
            invalid.validate().unwrap_err(),
            ConfigValidationError::ZeroLimit { .. }
        ));
    }
}
