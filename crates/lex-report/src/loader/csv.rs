//! CSV parsing with fallbacks for messy exports.
//!
//! Attempts, in order:
//! 1. standard read with `"` quoting, schema inferred from the first rows
//! 2. standard read with the schema inferred from the whole file
//! 3. read with quote handling disabled
//! 4. read pre-cleaned content from memory
//!
//! The first success wins. If all fail, the last error is reported.

use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use crate::error::{ReportError, Result};

/// Rows used for the first, fast schema inference.
const INFER_SCHEMA_ROWS: usize = 100;

pub(crate) fn read_csv(path: &Path) -> Result<DataFrame> {
    match read_with_quote(path, Some(b'"'), Some(INFER_SCHEMA_ROWS)) {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Standard loading failed: {}", e),
    }

    // A value past the sampled rows may not fit the guessed dtype
    match read_with_quote(path, Some(b'"'), None) {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Loading with full schema inference failed: {}", e),
    }

    match read_with_quote(path, None, None) {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Loading without quotes failed: {}", e),
    }

    let content = std::fs::read_to_string(path).map_err(|e| ReportError::parse(path, e))?;
    let cleaned = clean_csv_content(&content);

    CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(cleaned))
        .finish()
        .map_err(|e| ReportError::parse(path, e))
}

fn read_with_quote(
    path: &Path,
    quote: Option<u8>,
    infer_rows: Option<usize>,
) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(infer_rows)
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(quote))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
}

/// Collapse doubled/tripled quotes and drop blank lines.
pub fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
