//! Turns an analysis record plus chart images into the final PDF.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::analysis::AnalysisRecord;
use crate::charts::ChartArtifact;
use crate::error::{ReportError, Result};
use crate::scratch;

use super::document::{Block, Document};

/// Chart images are placed at 6 x 4 inches.
pub const IMAGE_WIDTH: f64 = 432.0;
pub const IMAGE_HEIGHT: f64 = 288.0;
const SPACER: f64 = 20.0;

const NUMERIC_HEADER: [&str; 6] = ["Column", "Mean", "Median", "Std Dev", "Min", "Max"];
const NUMERIC_WIDTHS: [f64; 6] = [101.0, 70.0, 70.0, 70.0, 70.0, 70.0];
const CATEGORICAL_HEADER: [&str; 4] = ["Column", "Unique", "Most Frequent", "Frequency"];
const CATEGORICAL_WIDTHS: [f64; 4] = [131.0, 80.0, 160.0, 80.0];

/// Lay out the report content without writing anything.
///
/// Artifacts whose file no longer exists are skipped. The visualization
/// section only appears when at least one image remains.
pub fn build_document(
    analysis: &AnalysisRecord,
    artifacts: &[ChartArtifact],
    title: &str,
    author: &str,
) -> Document {
    let mut doc = Document::new(title, author);
    let info = &analysis.basic_info;

    doc.push(Block::Title(title.to_string()));
    doc.push(Block::Spacer(SPACER));
    doc.push(Block::KeyValueTable(vec![
        (
            "Report Generated:".to_string(),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        ("Author:".to_string(), author.to_string()),
        ("Total Records:".to_string(), info.total_rows.to_string()),
        ("Total Columns:".to_string(), info.total_columns.to_string()),
    ]));
    doc.push(Block::PageBreak);

    doc.push(Block::Heading("Data Summary".to_string()));
    if !analysis.numeric_stats.is_empty() {
        let rows = analysis
            .numeric_stats
            .iter()
            .map(|(name, s)| {
                vec![
                    name.to_string(),
                    format!("{:.2}", s.mean),
                    format!("{:.2}", s.median),
                    format!("{:.2}", s.std),
                    format!("{:.2}", s.min),
                    format!("{:.2}", s.max),
                ]
            })
            .collect();
        doc.push(table(&NUMERIC_HEADER, rows, &NUMERIC_WIDTHS));
    }

    if !analysis.categorical_stats.is_empty() {
        doc.push(Block::Heading("Categorical Summary".to_string()));
        let rows = analysis
            .categorical_stats
            .iter()
            .map(|(name, s)| {
                vec![
                    name.to_string(),
                    s.unique_values.to_string(),
                    s.most_frequent.clone(),
                    s.frequency.to_string(),
                ]
            })
            .collect();
        doc.push(table(&CATEGORICAL_HEADER, rows, &CATEGORICAL_WIDTHS));
    }

    let quality = &analysis.data_quality;
    doc.push(Block::Heading("Data Quality".to_string()));
    doc.push(Block::KeyValueTable(vec![
        (
            "Completeness:".to_string(),
            format!("{:.1}%", quality.completeness_rate),
        ),
        (
            "Duplicate Rows:".to_string(),
            quality.duplicate_rows.to_string(),
        ),
        ("Unique Rows:".to_string(), quality.unique_rows.to_string()),
    ]));

    let existing: Vec<&ChartArtifact> = artifacts.iter().filter(|a| a.path.exists()).collect();
    if existing.len() < artifacts.len() {
        debug!(
            "Skipping {} chart images that no longer exist",
            artifacts.len() - existing.len()
        );
    }
    if !existing.is_empty() {
        doc.push(Block::PageBreak);
        doc.push(Block::Heading("Data Visualizations".to_string()));
        for artifact in existing {
            doc.push(Block::Image {
                path: artifact.path.clone(),
                width: IMAGE_WIDTH,
                height: IMAGE_HEIGHT,
            });
            doc.push(Block::Spacer(SPACER));
        }
    }

    doc
}

fn table(header: &[&str], rows: Vec<Vec<String>>, widths: &[f64]) -> Block {
    Block::Table {
        header: header.iter().map(|h| h.to_string()).collect(),
        rows,
        widths: widths.to_vec(),
    }
}

/// Render the report to `output` and return the written path.
///
/// Takes ownership of the artifacts: once the PDF is written they are
/// deleted along with their scratch directory if it ended up empty. On
/// failure they are left in place.
pub fn render(
    analysis: Option<&AnalysisRecord>,
    artifacts: Vec<ChartArtifact>,
    title: &str,
    author: &str,
    output: impl AsRef<Path>,
) -> Result<PathBuf> {
    let analysis = analysis.ok_or(ReportError::MissingAnalysis)?;
    let output = output.as_ref();

    let doc = build_document(analysis, &artifacts, title, author);
    let rendered = doc.write_pdf(output)?;
    info!(
        "Wrote {} ({} pages, {} charts)",
        output.display(),
        rendered.page_count,
        rendered.image_count
    );

    discard_artifacts(&artifacts);
    Ok(output.to_path_buf())
}

/// Delete chart images best-effort and drop their directories once empty.
pub fn discard_artifacts(artifacts: &[ChartArtifact]) {
    scratch::remove_artifacts(artifacts.iter().map(|a| a.path.as_path()));
}
