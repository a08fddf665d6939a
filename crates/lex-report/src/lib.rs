//! Automated Data Analysis Report Library
//!
//! Turns a CSV or Excel dataset into a PDF report with descriptive
//! statistics and charts, built with Rust and Polars.
//!
//! # Overview
//!
//! A run is a linear pipeline with four stages:
//!
//! - **Loading**: `.csv` via Polars with lenient fallbacks, `.xlsx`/`.xls` via calamine
//! - **Analysis**: per-column numeric and categorical summaries plus table quality figures
//! - **Visualization**: histogram grid, bar chart grid and correlation heatmap as PNG
//! - **Rendering**: paginated A4 PDF with summary tables and the chart images
//!
//! Per-column and per-chart failures are recorded as warnings and never
//! abort the run. Loading, analysis and rendering failures do.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_report::{Pipeline, ReportConfig};
//!
//! let config = ReportConfig::builder()
//!     .output_path("out/sales.pdf")
//!     .scratch_dir("/tmp/lex-charts")
//!     .build()?;
//!
//! let summary = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run("sales.csv", "Q3 Sales", "Finance")?;
//!
//! println!("{} records, {} charts", summary.records, summary.charts);
//! ```
//!
//! # Using the stages directly
//!
//! ```rust,ignore
//! use lex_report::{analysis, charts::ChartProducer, loader, reporting, ReportConfig};
//!
//! let config = ReportConfig::default();
//! let table = loader::load("sales.xlsx")?;
//! let record = analysis::analyze(&table)?;
//! let artifacts = ChartProducer::new(&config).produce(&table);
//! reporting::render(Some(&record), artifacts, "Sales", "Finance", "sales.pdf")?;
//! ```

pub mod analysis;
pub mod charts;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod reporting;
pub mod scratch;
pub mod utils;

// Re-exports for convenient access
pub use analysis::{
    AnalysisRecord, Analyzer, BasicInfo, CategoricalSummary, ColumnMap, DataQuality,
    NumericSummary,
};
pub use charts::{ChartArtifact, ChartKind, ChartProducer};
pub use config::{
    ConfigValidationError, DEFAULT_AUTHOR, DEFAULT_TITLE, ReportConfig, ReportConfigBuilder,
};
pub use error::{ComputationWarning, ReportError, Result as ReportResult, ResultExt};
pub use loader::{InputFormat, Table};
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineStage, ProgressReporter,
    ProgressUpdate, RunSummary,
};
pub use reporting::{Block, Document};
pub use utils::ColumnKind;

static_assertions::assert_impl_all!(ReportConfig: Send, Sync);
