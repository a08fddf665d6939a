//! Custom error types for the report pipeline.
//!
//! Stage-boundary failures (load, analyze, render) are [`ReportError`]s and
//! abort the run. Failures confined to a single column or a single chart are
//! [`ComputationWarning`]s: they are collected, logged and skipped.
//!
//! Errors are serializable so they can be emitted as JSON by the CLI.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the report pipeline.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Input file extension is not one of csv/xlsx/xls.
    #[error("Unsupported file format: '{0}'")]
    UnsupportedFormat(String),

    /// Input file could not be read or parsed.
    #[error("Failed to parse '{}': {reason}", path.display())]
    ParseError { path: PathBuf, reason: String },

    /// Table has no rows or no columns.
    #[error("No data loaded or dataset is empty")]
    EmptyInput,

    /// Renderer was invoked without an analysis record.
    #[error("No analysis results available")]
    MissingAnalysis,

    /// Document assembly or PDF write failed.
    #[error("Failed to render report: {0}")]
    RenderError(String),

    /// No valid values found in a column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

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
        source: Box<ReportError>,
    },
}

impl ReportError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReportError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a [`ReportError::ParseError`].
    pub fn parse(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        ReportError::ParseError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Get a stable error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::ParseError { .. } => "PARSE_ERROR",
            Self::EmptyInput => "EMPTY_INPUT",
            Self::MissingAnalysis => "MISSING_ANALYSIS",
            Self::RenderError(_) => "RENDER_ERROR",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error came from the loading stage.
    pub fn is_load_failure(&self) -> bool {
        match self {
            Self::UnsupportedFormat(_) | Self::ParseError { .. } => true,
            Self::WithContext { source, .. } => source.is_load_failure(),
            _ => false,
        }
    }
}

/// Serialize as `{ code, message }`.
impl Serialize for ReportError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ReportError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

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
        self.map_err(|e| ReportError::Polars(e).with_context(context))
    }
}

/// A non-fatal failure confined to one column or one chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationWarning {
    /// Column name or chart name the failure belongs to.
    pub subject: String,
    /// Human-readable cause.
    pub reason: String,
}

impl ComputationWarning {
    pub fn new(subject: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            subject: subject.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ComputationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not analyze '{}': {}", self.subject, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(ReportError::EmptyInput.error_code(), "EMPTY_INPUT");
        assert_eq!(
            ReportError::UnsupportedFormat(".txt".to_string()).error_code(),
            "UNSUPPORTED_FORMAT"
        );
        assert_eq!(
            ReportError::parse("data.csv", "bad quote").error_code(),
            "PARSE_ERROR"
        );
    }

    #[test]
    fn test_is_load_failure() {
        assert!(ReportError::UnsupportedFormat("txt".to_string()).is_load_failure());
        assert!(ReportError::parse("a.csv", "boom").is_load_failure());
        assert!(!ReportError::EmptyInput.is_load_failure());
        assert!(
            ReportError::parse("a.csv", "boom")
                .with_context("Loading dataset")
                .is_load_failure()
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = ReportError::NoValidValues("Age".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("NO_VALID_VALUES"));
        assert!(json.contains("Age"));
    }

    #[test]
    fn test_with_context() {
        let error = ReportError::MissingAnalysis.with_context("During rendering");
        assert!(error.to_string().contains("During rendering"));
        assert_eq!(error.error_code(), "MISSING_ANALYSIS"); // Preserves original code
    }

    #[test]
    fn test_result_ext_context() {
        let polars: std::result::Result<(), _> =
            Err(polars::error::PolarsError::NoData("empty".into()));
        let err = polars.context("Counting duplicate rows").unwrap_err();
        assert_eq!(err.error_code(), "POLARS_ERROR");
        assert!(err.to_string().starts_with("Counting duplicate rows: "));

        let own: Result<()> = Err(ReportError::EmptyInput);
        let err = own.context("Analyzing data.csv").unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_INPUT");
    }

    #[test]
    fn test_parse_error_message_names_path() {
        let error = ReportError::parse("/tmp/sales.csv", "unexpected EOF");
        let message = error.to_string();
        assert!(message.contains("/tmp/sales.csv"));
        assert!(message.contains("unexpected EOF"));
    }

    #[test]
    fn test_computation_warning_display() {
        let warning = ComputationWarning::new("amount", "contains non-finite value");
        assert_eq!(
            warning.to_string(),
            "Could not analyze 'amount': contains non-finite value"
        );
    }
}
