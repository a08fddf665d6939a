//! Chart production.
//!
//! [`ChartProducer`] derives up to three PNG images from a table:
//!
//! 1. numeric distributions (histogram grid), when a numeric column exists
//! 2. categorical analysis (bar grid), when a categorical column exists
//! 3. correlation heatmap, when at least two numeric columns exist
//!
//! Every chart is best-effort. A failing chart becomes a
//! [`ComputationWarning`] and the remaining charts are still produced.

mod canvas;
pub mod figures;
mod raster;
mod style;

pub use raster::Rasterizer;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::statistics;
use crate::config::ReportConfig;
use crate::error::{ComputationWarning, Result};
use crate::loader::Table;
use crate::scratch::ScratchDir;
use crate::utils::{self, ColumnKind};

use figures::{BarPanel, HistogramPanel};

/// The chart kinds, in production order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    NumericDistributions,
    CategoricalAnalysis,
    CorrelationHeatmap,
}

impl ChartKind {
    /// File name stem for images of this kind.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::NumericDistributions => "numerical_distributions",
            Self::CategoricalAnalysis => "categorical_analysis",
            Self::CorrelationHeatmap => "correlation_heatmap",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NumericDistributions => "numerical distributions",
            Self::CategoricalAnalysis => "categorical analysis",
            Self::CorrelationHeatmap => "correlation heatmap",
        }
    }
}

/// A chart image waiting in the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartArtifact {
    pub kind: ChartKind,
    pub path: PathBuf,
}

/// Outcome of one attempted chart.
pub type ChartOutcome = std::result::Result<ChartArtifact, ComputationWarning>;

/// Produces chart images for a table.
pub struct ChartProducer {
    scratch: ScratchDir,
    rasterizer: Rasterizer,
    histogram_bins: usize,
    max_chart_columns: usize,
    max_categorical_cardinality: usize,
    top_values: usize,
}

impl ChartProducer {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            scratch: ScratchDir::new(&config.scratch_dir),
            rasterizer: Rasterizer::new(config.chart_dpi),
            histogram_bins: config.histogram_bins,
            max_chart_columns: config.max_chart_columns,
            max_categorical_cardinality: config.max_categorical_cardinality,
            top_values: config.top_values,
        }
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Produce every applicable chart, keeping only the successes.
    pub fn produce(&self, table: &Table) -> Vec<ChartArtifact> {
        self.produce_with_outcomes(table)
            .into_iter()
            .filter_map(|outcome| outcome.ok())
            .collect()
    }

    /// Produce every applicable chart and report each attempt.
    ///
    /// Never fails as a whole. An empty table or an unusable scratch
    /// directory yields a single warning and no artifacts.
    pub fn produce_with_outcomes(&self, table: &Table) -> Vec<ChartOutcome> {
        if table.is_empty() {
            let warning = ComputationWarning::new("visualizations", "no data to visualize");
            warn!("{}", warning);
            return vec![Err(warning)];
        }

        if let Err(e) = self.scratch.ensure() {
            let warning = ComputationWarning::new(
                "visualizations",
                format!(
                    "cannot create scratch directory {}: {}",
                    self.scratch.path().display(),
                    e
                ),
            );
            warn!("{}", warning);
            return vec![Err(warning)];
        }

        let df = table.data();
        let numeric = utils::columns_of_kind(df, ColumnKind::Numeric);
        let categorical = utils::columns_of_kind(df, ColumnKind::Categorical);
        debug!(
            "Charting {} numeric and {} categorical columns",
            numeric.len(),
            categorical.len()
        );

        let mut planned = Vec::new();
        if !numeric.is_empty() {
            planned.push(ChartKind::NumericDistributions);
        }
        if !categorical.is_empty() {
            planned.push(ChartKind::CategoricalAnalysis);
        }
        if numeric.len() >= 2 {
            planned.push(ChartKind::CorrelationHeatmap);
        }

        let mut produced = 0;
        let outcomes: Vec<ChartOutcome> = planned
            .into_iter()
            .map(|kind| {
                let path = self.scratch.artifact_path(kind.file_stem(), produced);
                let result = match kind {
                    ChartKind::NumericDistributions => self.numeric_distributions(table, &numeric),
                    ChartKind::CategoricalAnalysis => {
                        self.categorical_analysis(table, &categorical)
                    }
                    ChartKind::CorrelationHeatmap => self.correlation_heatmap(table, &numeric),
                }
                .and_then(|svg| self.rasterizer.write_png(&svg, &path));

                match result {
                    Ok(()) => {
                        produced += 1;
                        Ok(ChartArtifact { kind, path })
                    }
                    Err(e) => {
                        discard_partial(&path);
                        let warning = ComputationWarning::new(kind.display_name(), e);
                        warn!("Could not create {}: {}", kind.display_name(), warning.reason);
                        Err(warning)
                    }
                }
            })
            .collect();

        info!("Created {} visualizations", produced);
        if produced == 0 {
            self.scratch.remove_if_empty();
        }
        outcomes
    }

    fn numeric_distributions(&self, table: &Table, columns: &[String]) -> Result<String> {
        let mut panels = Vec::new();
        for name in columns.iter().take(self.max_chart_columns) {
            let series = table.data().column(name)?.as_materialized_series();
            let values = utils::numeric_values(series)?;
            panels.push(HistogramPanel {
                column: name,
                bins: statistics::histogram(&values, self.histogram_bins),
            });
        }
        Ok(figures::numeric_distributions(&panels))
    }

    fn categorical_analysis(&self, table: &Table, columns: &[String]) -> Result<String> {
        let mut panels = Vec::new();
        for name in columns.iter().take(self.max_chart_columns) {
            let series = table.data().column(name)?.as_materialized_series();
            let mut counts = statistics::value_counts(utils::string_values(series)?);

            let counts = if counts.len() > self.max_categorical_cardinality {
                debug!(
                    "Leaving '{}' panel empty: {} distinct values",
                    name,
                    counts.len()
                );
                None
            } else {
                counts.truncate(self.top_values);
                Some(counts)
            };
            panels.push(BarPanel {
                column: name,
                counts,
            });
        }
        Ok(figures::categorical_analysis(&panels))
    }

    fn correlation_heatmap(&self, table: &Table, columns: &[String]) -> Result<String> {
        let values = columns
            .iter()
            .map(|name| {
                let series = table.data().column(name)?.as_materialized_series();
                Ok(utils::numeric_values_aligned(series)?)
            })
            .collect::<Result<Vec<_>>>()?;

        let matrix = figures::correlation_matrix(&values);
        Ok(figures::correlation_heatmap(columns, &matrix))
    }
}

fn discard_partial(path: &Path) {
    if path.exists()
        && let Err(e) = std::fs::remove_file(path)
    {
        debug!("Could not remove partial chart {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn producer(dir: &Path) -> ChartProducer {
        let config = ReportConfig::builder()
            .scratch_dir(dir.join("charts"))
            .chart_dpi(36)
            .build()
            .unwrap();
        ChartProducer::new(&config)
    }

    #[test]
    fn test_empty_table_yields_warning_only() {
        let dir = tempfile::tempdir().unwrap();
        let outcomes =
            producer(dir.path()).produce_with_outcomes(&Table::new(DataFrame::empty(), "e.csv"));

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_err());
        assert!(!dir.path().join("charts").exists());
    }

    #[test]
    fn test_numeric_and_categorical_without_heatmap() {
        let dir = tempfile::tempdir().unwrap();
        let df = df![
            "amount" => [1.0, 2.0, 3.0, 4.0],
            "region" => ["n", "s", "n", "e"],
        ]
        .unwrap();

        let artifacts = producer(dir.path()).produce(&Table::new(df, "t.csv"));
        let kinds: Vec<ChartKind> = artifacts.iter().map(|a| a.kind).collect();

        assert_eq!(
            kinds,
            vec![ChartKind::NumericDistributions, ChartKind::CategoricalAnalysis]
        );
        for artifact in &artifacts {
            assert!(artifact.path.exists());
            assert!(artifact.path.starts_with(dir.path().join("charts")));
        }
    }

    #[test]
    fn test_heatmap_needs_two_numeric_columns() {
        let dir = tempfile::tempdir().unwrap();
        let df = df![
            "x" => [1.0, 2.0, 3.0],
            "y" => [2.0, 4.0, 7.0],
        ]
        .unwrap();

        let artifacts = producer(dir.path()).produce(&Table::new(df, "t.csv"));
        let kinds: Vec<ChartKind> = artifacts.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![ChartKind::NumericDistributions, ChartKind::CorrelationHeatmap]
        );
    }

    #[test]
    fn test_no_numeric_columns_means_no_histogram() {
        let dir = tempfile::tempdir().unwrap();
        let df = df!["s" => ["a", "b", "a"]].unwrap();

        let artifacts = producer(dir.path()).produce(&Table::new(df, "t.csv"));
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].kind, ChartKind::CategoricalAnalysis);
    }

    #[test]
    fn test_unusable_scratch_dir_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("charts");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let df = df!["x" => [1.0, 2.0]].unwrap();
        let outcomes = producer(dir.path()).produce_with_outcomes(&Table::new(df, "t.csv"));

        assert_eq!(outcomes.len(), 1);
        let warning = outcomes[0].as_ref().unwrap_err();
        assert!(warning.reason.contains("scratch directory"));
    }

    #[test]
    fn test_chart_kind_names() {
        assert_eq!(
            ChartKind::NumericDistributions.file_stem(),
            "numerical_distributions"
        );
        assert_eq!(
            serde_json::to_string(&ChartKind::CorrelationHeatmap).unwrap(),
            "\"correlation_heatmap\""
        );
    }
}
