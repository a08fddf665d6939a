//! Excel workbook parsing.
//!
//! Reads the first worksheet. The first row holds the headers and every
//! later row is a record. Each column gets the narrowest type that fits all
//! of its non-empty cells: Int64, Float64, Boolean, Datetime(ms), else String.

use std::collections::HashSet;
use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::debug;

use crate::error::{ReportError, Result};

pub(crate) fn read_workbook(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ReportError::parse(path, e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReportError::parse(path, "workbook contains no worksheets"))?
        .map_err(|e| ReportError::parse(path, e))?;

    range_to_frame(&range).map_err(|e| ReportError::parse(path, e))
}

/// Convert a worksheet range into a frame, header row first.
pub(crate) fn range_to_frame(range: &Range<Data>) -> PolarsResult<DataFrame> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };

    let names = header_names(header);
    let records: Vec<&[Data]> = rows.collect();
    debug!(
        "Worksheet has {} columns and {} data rows",
        names.len(),
        records.len()
    );

    let columns = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = records
                .iter()
                .map(|row| row.get(idx).unwrap_or(&Data::Empty))
                .collect();
            build_column(name, &cells)
        })
        .collect::<PolarsResult<Vec<Column>>>()?;

    DataFrame::new(columns)
}

/// Header labels with blanks named `Unnamed: {i}` and duplicates suffixed.
fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = match cell_text(cell) {
                Some(text) if !text.trim().is_empty() => text,
                _ => format!("Unnamed: {idx}"),
            };

            let mut name = base.clone();
            let mut suffix = 1;
            while !seen.insert(name.clone()) {
                name = format!("{base}.{suffix}");
                suffix += 1;
            }
            name
        })
        .collect()
}

/// Narrowest column type covering every non-empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellType {
    Int,
    Float,
    Bool,
    DateTime,
    Text,
}

fn infer_type(cells: &[&Data]) -> CellType {
    let mut inferred: Option<CellType> = None;

    for cell in cells {
        let current = match cell {
            Data::Empty | Data::Error(_) => continue,
            Data::Int(_) => CellType::Int,
            Data::Float(f) if is_integral(*f) => CellType::Int,
            Data::Float(_) => CellType::Float,
            Data::Bool(_) => CellType::Bool,
            Data::DateTime(_) | Data::DateTimeIso(_) if cell_datetime(cell).is_some() => {
                CellType::DateTime
            }
            _ => CellType::Text,
        };

        inferred = Some(match (inferred, current) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(CellType::Int), CellType::Float) | (Some(CellType::Float), CellType::Int) => {
                CellType::Float
            }
            _ => return CellType::Text,
        });
    }

    inferred.unwrap_or(CellType::Text)
}

fn build_column(name: &str, cells: &[&Data]) -> PolarsResult<Column> {
    let series = match infer_type(cells) {
        CellType::Int => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(i) => Some(*i),
                    Data::Float(f) => Some(*f as i64),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
        }
        CellType::Float => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(i) => Some(*i as f64),
                    Data::Float(f) => Some(*f),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
        }
        CellType::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
        }
        CellType::DateTime => {
            let millis: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| cell_datetime(cell).map(|dt| dt.and_utc().timestamp_millis()))
                .collect();
            Series::new(name.into(), millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        }
        CellType::Text => {
            let values: Vec<Option<String>> = cells.iter().map(|cell| cell_text(cell)).collect();
            Series::new(name.into(), values)
        }
    };

    Ok(series.into_column())
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64
}

fn cell_datetime(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime(),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            }),
        _ => None,
    }
}

/// Text form of a cell; `None` for empty and error cells.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) if is_integral(*f) => Some(format!("{}", *f as i64)),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell_datetime(cell)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .or_else(|| Some(cell.to_string())),
        Data::DurationIso(s) => Some(s.clone()),
    }
}
