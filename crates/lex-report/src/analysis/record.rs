//! The immutable analysis record shared by the chart producer and the renderer.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::ComputationWarning;
use crate::utils::ColumnKind;

/// Ordered mapping from column name to a per-column value.
///
/// Iterates in column order and serializes as a JSON object with keys in
/// that order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for ColumnMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> ColumnMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `name`. New names go to the end.
    pub fn insert(&mut self, name: impl Into<String>, value: T) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<T> FromIterator<(String, T)> for ColumnMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut map = ColumnMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

impl<T: Serialize> Serialize for ColumnMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Shape and per-column metadata of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicInfo {
    pub total_rows: usize,
    pub total_columns: usize,
    pub column_names: Vec<String>,
    /// Column -> polars dtype name
    pub data_types: ColumnMap<String>,
    pub column_kinds: ColumnMap<ColumnKind>,
    /// Column -> number of missing cells
    pub missing_values: ColumnMap<usize>,
}

/// Summary of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericSummary {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1)
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub q25: f64,
    pub q75: f64,
}

/// Summary of one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    pub unique_values: usize,
    /// `"N/A"` when the column has no non-missing values
    pub most_frequent: String,
    pub frequency: usize,
    /// Most frequent values first, at most the configured number of entries
    pub value_counts: Vec<(String, usize)>,
}

impl CategoricalSummary {
    pub(crate) fn empty() -> Self {
        Self {
            unique_values: 0,
            most_frequent: "N/A".to_string(),
            frequency: 0,
            value_counts: Vec::new(),
        }
    }
}

/// Table-wide quality figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataQuality {
    /// Percent of non-missing cells, 0 when the table has no cells
    pub completeness_rate: f64,
    /// Rows identical to an earlier row across all columns
    pub duplicate_rows: usize,
    pub unique_rows: usize,
}

/// Everything the analyzer computed for one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub basic_info: BasicInfo,
    pub numeric_stats: ColumnMap<NumericSummary>,
    pub categorical_stats: ColumnMap<CategoricalSummary>,
    pub data_quality: DataQuality,
    /// Per-column failures; the affected columns are absent from the stats
    pub warnings: Vec<ComputationWarning>,
    /// Local time of analysis, `%Y-%m-%d %H:%M:%S`
    pub generated_at: String,
}

impl AnalysisRecord {
    /// Write the record as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<std::path::Path>) -> crate::error::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
