//! Configuration types for the report pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default report title used when the operator leaves the prompt empty.
pub const DEFAULT_TITLE: &str = "Data Analysis Report";

/// Default author used when the operator leaves the prompt empty.
pub const DEFAULT_AUTHOR: &str = "Data Analyst";

/// Configuration for the report pipeline.
///
/// Use [`ReportConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_report::config::ReportConfig;
///
/// let config = ReportConfig::builder()
///     .output_path("out/report.pdf")
///     .scratch_dir("/tmp/lex-charts")
///     .chart_dpi(96)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Where the PDF report is written.
    /// Default: "analysis_report.pdf"
    pub output_path: PathBuf,

    /// Directory holding transient chart images during a run.
    /// Created on demand and removed once empty.
    /// Default: "temp_charts"
    pub scratch_dir: PathBuf,

    /// Rasterization resolution for chart images (36 - 600).
    /// Default: 150
    pub chart_dpi: u32,

    /// Number of bins per histogram.
    /// Default: 20
    pub histogram_bins: usize,

    /// Maximum number of columns shown per chart grid (1 - 4).
    /// Default: 4
    pub max_chart_columns: usize,

    /// Categorical columns with more distinct values than this are left
    /// out of the bar chart grid.
    /// Default: 20
    pub max_categorical_cardinality: usize,

    /// Number of most frequent values kept per categorical column.
    /// Default: 10
    pub top_values: usize,

    /// Delete chart images even when rendering fails.
    /// When false, a failed render leaves them in the scratch directory.
    /// Default: false
    pub cleanup_on_failure: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("analysis_report.pdf"),
            scratch_dir: PathBuf::from("temp_charts"),
            chart_dpi: 150,
            histogram_bins: 20,
            max_chart_columns: 4,
            max_categorical_cardinality: 20,
            top_values: 10,
            cleanup_on_failure: false,
        }
    }
}

impl ReportConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    /// Read a configuration from a JSON file and validate it.
    ///
    /// Missing fields take their default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ReportConfig = serde_json::from_str(&content)?;
        config
            .validate()
            .map_err(|e| crate::error::ReportError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(36..=600).contains(&self.chart_dpi) {
            return Err(ConfigValidationError::InvalidDpi(self.chart_dpi));
        }

        if !(1..=4).contains(&self.max_chart_columns) {
            return Err(ConfigValidationError::OutOfRange {
                field: "max_chart_columns".to_string(),
                value: self.max_chart_columns,
                min: 1,
                max: 4,
            });
        }

        for (field, value) in [
            ("histogram_bins", self.histogram_bins),
            ("max_categorical_cardinality", self.max_categorical_cardinality),
            ("top_values", self.top_values),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::OutOfRange {
                    field: field.to_string(),
                    value,
                    min: 1,
                    max: usize::MAX,
                });
            }
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyPath("output_path".to_string()));
        }

        if self.scratch_dir.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyPath("scratch_dir".to_string()));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid chart DPI: {0} (must be between 36 and 600)")]
    InvalidDpi(u32),

    #[error("Invalid value for '{field}': {value} (must be between {min} and {max})")]
    OutOfRange {
        field: String,
        value: usize,
        min: usize,
        max: usize,
    },

    #[error("Path for '{0}' must not be empty")]
    EmptyPath(String),
}

/// Builder for [`ReportConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ReportConfigBuilder {
    output_path: Option<PathBuf>,
    scratch_dir: Option<PathBuf>,
    chart_dpi: Option<u32>,
    histogram_bins: Option<usize>,
    max_chart_columns: Option<usize>,
    max_categorical_cardinality: Option<usize>,
    top_values: Option<usize>,
    cleanup_on_failure: Option<bool>,
}

impl ReportConfigBuilder {
    /// Set the path of the generated PDF.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Set the scratch directory for chart images.
    pub fn scratch_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(path.into());
        self
    }

    /// Set the chart rasterization resolution.
    pub fn chart_dpi(mut self, dpi: u32) -> Self {
        self.chart_dpi = Some(dpi);
        self
    }

    /// Set the number of histogram bins.
    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = Some(bins);
        self
    }

    /// Set how many columns each chart grid shows.
    pub fn max_chart_columns(mut self, columns: usize) -> Self {
        self.max_chart_columns = Some(columns);
        self
    }

    /// Set the distinct-value limit for bar charts.
    pub fn max_categorical_cardinality(mut self, limit: usize) -> Self {
        self.max_categorical_cardinality = Some(limit);
        self
    }

    /// Set how many top values are kept per categorical column.
    pub fn top_values(mut self, n: usize) -> Self {
        self.top_values = Some(n);
        self
    }

    /// Delete chart images even if rendering fails.
    pub fn cleanup_on_failure(mut self, cleanup: bool) -> Self {
        self.cleanup_on_failure = Some(cleanup);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ReportConfig` or an error if validation fails.
    pub fn build(self) -> Result<ReportConfig, ConfigValidationError> {
        let defaults = ReportConfig::default();
        let config = ReportConfig {
            output_path: self.output_path.unwrap_or(defaults.output_path),
            scratch_dir: self.scratch_dir.unwrap_or(defaults.scratch_dir),
            chart_dpi: self.chart_dpi.unwrap_or(defaults.chart_dpi),
            histogram_bins: self.histogram_bins.unwrap_or(defaults.histogram_bins),
            max_chart_columns: self.max_chart_columns.unwrap_or(defaults.max_chart_columns),
            max_categorical_cardinality: self
                .max_categorical_cardinality
                .unwrap_or(defaults.max_categorical_cardinality),
            top_values: self.top_values.unwrap_or(defaults.top_values),
            cleanup_on_failure: self
                .cleanup_on_failure
                .unwrap_or(defaults.cleanup_on_failure),
        };

        config.validate()?;
        Ok(config)
    }
}
