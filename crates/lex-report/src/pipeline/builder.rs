//! Report pipeline driver.
//!
//! Runs `load -> analyze -> visualize -> render` for one input file and
//! reports progress for each stage.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::analysis::{AnalysisRecord, Analyzer};
use crate::charts::{ChartArtifact, ChartProducer};
use crate::config::{ConfigValidationError, ReportConfig};
use crate::error::{ComputationWarning, Result, ResultExt};
use crate::loader;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::reporting;

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub report_path: PathBuf,
    pub records: usize,
    pub columns: usize,
    pub charts: usize,
    /// Columns and charts that were skipped, in the order they failed
    pub warnings: Vec<ComputationWarning>,
    pub elapsed_ms: u64,
    /// Full analysis, available for `--emit-analysis`
    #[serde(skip)]
    pub analysis: AnalysisRecord,
}

/// The report pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use lex_report::{Pipeline, ReportConfig};
///
/// let config = ReportConfig::builder()
///     .output_path("out/sales.pdf")
///     .build()?;
///
/// let summary = Pipeline::builder()
///     .config(config)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run("sales.csv", "Q3 Sales", "Finance")?;
///
/// println!("{} charts in {}", summary.charts, summary.report_path.display());
/// ```
pub struct Pipeline {
    config: ReportConfig,
    analyzer: Analyzer,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// The pipeline may be moved to a worker thread by embedding callers
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Generate a report for `input`.
    ///
    /// The PDF is written to the configured output path.
    ///
    /// # Errors
    ///
    /// Load failures (`UnsupportedFormat`, `ParseError`), `EmptyInput` from
    /// analysis and `RenderError` from rendering. Chart failures never fail
    /// the run; they show up in [`RunSummary::warnings`].
    pub fn run(&self, input: impl AsRef<Path>, title: &str, author: &str) -> Result<RunSummary> {
        match self.run_internal(input.as_ref(), title, author) {
            Ok(summary) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Report saved to {}",
                    summary.report_path.display()
                )));
                Ok(summary)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self, input: &Path, title: &str, author: &str) -> Result<RunSummary> {
        let start_time = Instant::now();

        info!("Starting report pipeline for {}", input.display());
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Initializing,
            0.0,
            "Starting report pipeline...",
        ));

        // Step 1: Load
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Loading,
            0.0,
            format!("Loading {}...", input.display()),
        ));
        let table = loader::load(input)?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Loading,
            1.0,
            format!("Loaded {} rows, {} columns", table.height(), table.width()),
        ));

        // Step 2: Analyze
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Analyzing,
            0.0,
            "Computing statistics...",
        ));
        let analysis = self
            .analyzer
            .analyze(&table)
            .context(format!("Analyzing {}", input.display()))?;
        for warning in &analysis.warnings {
            debug!("Analysis warning: {}", warning);
        }
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Analyzing,
            1.0,
            format!(
                "Analyzed {} numeric and {} categorical columns",
                analysis.numeric_stats.len(),
                analysis.categorical_stats.len()
            ),
        ));

        // Step 3: Visualize, never fatal
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Visualizing,
            0.0,
            "Creating visualizations...",
        ));
        let producer = ChartProducer::new(&self.config);
        let mut warnings = analysis.warnings.clone();
        let mut artifacts: Vec<ChartArtifact> = Vec::new();
        for outcome in producer.produce_with_outcomes(&table) {
            match outcome {
                Ok(artifact) => artifacts.push(artifact),
                Err(warning) => warnings.push(warning),
            }
        }
        let charts = artifacts.len();
        self.report_progress(ProgressUpdate::with_items(
            PipelineStage::Visualizing,
            charts,
            charts,
            format!("Created {} visualizations", charts),
        ));

        // Step 4: Render
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Rendering,
            0.0,
            "Generating PDF report...",
        ));
        let kept = if self.config.cleanup_on_failure {
            artifacts.clone()
        } else {
            Vec::new()
        };
        let report_path = match reporting::render(
            Some(&analysis),
            artifacts,
            title,
            author,
            &self.config.output_path,
        ) {
            Ok(path) => path,
            Err(e) => {
                if self.config.cleanup_on_failure {
                    debug!("Removing {} chart images after failed render", kept.len());
                    reporting::discard_artifacts(&kept);
                } else {
                    warn!(
                        "Chart images left in {} for inspection",
                        producer.scratch().path().display()
                    );
                }
                return Err(e);
            }
        };

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Report pipeline finished in {} ms with {} warnings",
            elapsed_ms,
            warnings.len()
        );

        Ok(RunSummary {
            report_path,
            records: analysis.basic_info.total_rows,
            columns: analysis.basic_info.total_columns,
            charts,
            warnings,
            elapsed_ms,
            analysis,
        })
    }
}

/// Builder for creating a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<ReportConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: ReportConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback.
    ///
    /// Shorthand for [`progress_reporter`](Self::progress_reporter) with a
    /// [`ClosureProgressReporter`].
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
            analyzer: Analyzer::from_config(&config),
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorded_pipeline(config: ReportConfig) -> (Pipeline, Arc<Mutex<Vec<ProgressUpdate>>>) {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();
        let pipeline = Pipeline::builder()
            .config(config)
            .on_progress(move |update| sink.lock().unwrap().push(update))
            .build()
            .unwrap();
        (pipeline, updates)
    }

    fn config_in(dir: &Path) -> ReportConfig {
        ReportConfig::builder()
            .output_path(dir.join("report.pdf"))
            .scratch_dir(dir.join("charts"))
            .chart_dpi(36)
            .build()
            .unwrap()
    }

    // ==================== builder tests ====================

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config(), &ReportConfig::default());
        assert!(pipeline.progress_reporter.is_none());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let mut config = ReportConfig::default();
        config.chart_dpi = 5;
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    // ==================== run tests ====================

    #[test]
    fn test_run_reports_stages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("data.csv");
        std::fs::write(&input, "x,y,label\n1,2,a\n2,4,b\n3,7,a\n").unwrap();

        let (pipeline, updates) = recorded_pipeline(config_in(dir.path()));
        let summary = pipeline.run(&input, "T", "A").unwrap();

        assert_eq!(summary.records, 3);
        assert_eq!(summary.columns, 3);
        assert_eq!(summary.charts, 3);
        assert!(summary.report_path.exists());

        let mut stages: Vec<PipelineStage> =
            updates.lock().unwrap().iter().map(|u| u.stage).collect();
        stages.dedup();
        assert_eq!(
            stages,
            vec![
                PipelineStage::Initializing,
                PipelineStage::Loading,
                PipelineStage::Analyzing,
                PipelineStage::Visualizing,
                PipelineStage::Rendering,
                PipelineStage::Complete,
            ]
        );
    }

    #[test]
    fn test_run_unsupported_format_stops_early() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, "hello").unwrap();

        let (pipeline, updates) = recorded_pipeline(config_in(dir.path()));
        let err = pipeline.run(&input, "T", "A").unwrap_err();

        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
        let stages: Vec<PipelineStage> =
            updates.lock().unwrap().iter().map(|u| u.stage).collect();
        assert_eq!(stages.last(), Some(&PipelineStage::Failed));
        assert!(!stages.contains(&PipelineStage::Analyzing));
        assert!(!dir.path().join("report.pdf").exists());
    }

    #[test]
    fn test_run_header_only_csv_is_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.csv");
        std::fs::write(&input, "a,b\n").unwrap();

        let (pipeline, updates) = recorded_pipeline(config_in(dir.path()));
        let err = pipeline.run(&input, "T", "A").unwrap_err();

        assert_eq!(err.error_code(), "EMPTY_INPUT");
        assert!(err.to_string().starts_with("Analyzing "));
        let stages: Vec<PipelineStage> =
            updates.lock().unwrap().iter().map(|u| u.stage).collect();
        assert!(!stages.contains(&PipelineStage::Visualizing));
    }

    fn failing_render_setup(cleanup: bool) -> (tempfile::TempDir, Result<RunSummary>) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("data.csv");
        std::fs::write(&input, "x\n1\n2\n3\n").unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();

        let config = ReportConfig::builder()
            .output_path(blocker.join("report.pdf"))
            .scratch_dir(dir.path().join("charts"))
            .chart_dpi(36)
            .cleanup_on_failure(cleanup)
            .build()
            .unwrap();
        let result = Pipeline::builder().config(config).build().unwrap().run(&input, "T", "A");
        (dir, result)
    }

    fn chart_files(dir: &Path) -> usize {
        std::fs::read_dir(dir.join("charts"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[test]
    fn test_render_failure_leaves_charts_by_default() {
        let (dir, result) = failing_render_setup(false);
        assert_eq!(result.unwrap_err().error_code(), "RENDER_ERROR");
        assert_eq!(chart_files(dir.path()), 1);
    }

    #[test]
    fn test_render_failure_cleanup_when_configured() {
        let (dir, result) = failing_render_setup(true);
        assert_eq!(result.unwrap_err().error_code(), "RENDER_ERROR");
        assert_eq!(chart_files(dir.path()), 0);
        assert!(!dir.path().join("charts").exists());
    }
}
