//! Dataset loading.
//!
//! [`load`] picks a parser from the file extension and returns a read-only
//! [`Table`]. Only `.csv`, `.xlsx` and `.xls` are accepted; the content
//! itself is not sniffed.

mod csv;
mod spreadsheet;

pub use csv::clean_csv_content;

use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;
use tracing::info;

use crate::error::{ReportError, Result};

/// Input formats recognized by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Comma-delimited text with a header row
    Csv,
    /// Excel workbook (`.xlsx` or legacy `.xls`)
    Spreadsheet,
}

impl InputFormat {
    /// Determine the format from the file extension, ignoring case.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") | Some("xls") => Ok(Self::Spreadsheet),
            Some(other) => Err(ReportError::UnsupportedFormat(format!(".{other}"))),
            None => Err(ReportError::UnsupportedFormat("(no extension)".to_string())),
        }
    }
}

/// A loaded dataset.
///
/// Columns are uniquely named and of equal length. After loading, the table
/// is only ever handed out by shared reference.
#[derive(Debug, Clone)]
pub struct Table {
    data: DataFrame,
    source: PathBuf,
}

impl Table {
    pub fn new(data: DataFrame, source: impl Into<PathBuf>) -> Self {
        Self {
            data,
            source: source.into(),
        }
    }

    /// The underlying polars frame.
    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Path the table was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn width(&self) -> usize {
        self.data.width()
    }

    /// True when the table has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.height() == 0 || self.width() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }
}

/// Load a dataset from `path`.
///
/// # Errors
///
/// - [`ReportError::UnsupportedFormat`] when the extension is not csv/xlsx/xls
/// - [`ReportError::ParseError`] when the file is missing, unreadable or malformed
pub fn load(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let format = InputFormat::from_path(path)?;

    if !path.is_file() {
        return Err(ReportError::parse(path, "file not found"));
    }

    info!("Loading data from {}", path.display());

    let data = match format {
        InputFormat::Csv => csv::read_csv(path)?,
        InputFormat::Spreadsheet => spreadsheet::read_workbook(path)?,
    };

    let table = Table::new(data, path);
    info!(
        "Data loaded successfully. Shape: ({}, {})",
        table.height(),
        table.width()
    );
    info!("Columns: {}", table.column_names().join(", "));

    Ok(table)
}
