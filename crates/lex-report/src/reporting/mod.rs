//! PDF report rendering.
//!
//! The renderer lays out an [`AnalysisRecord`](crate::analysis::AnalysisRecord)
//! and its chart images as a list of [`Block`]s, then writes the paginated
//! document with `pdf-writer`.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_report::reporting;
//!
//! let record = lex_report::analysis::analyze(&table)?;
//! let charts = producer.produce(&table);
//!
//! // Inspect the layout without writing anything
//! let doc = reporting::build_document(&record, &charts, "Sales", "Finance");
//! assert!(doc.headings().contains(&"Data Summary"));
//!
//! // Write the PDF; chart images are deleted afterwards
//! let path = reporting::render(Some(&record), charts, "Sales", "Finance", "report.pdf")?;
//! ```

pub mod document;
mod renderer;

pub use document::{Block, Document, RenderedPdf};
pub use renderer::{IMAGE_HEIGHT, IMAGE_WIDTH, build_document, discard_artifacts, render};
