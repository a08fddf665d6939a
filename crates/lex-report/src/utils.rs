//! Shared column helpers used by the analyzer and the chart producer.
//!
//! Both stages classify columns the same way and read values out of polars
//! series the same way, so those rules live here.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

// =============================================================================
// Column Classification
// =============================================================================

/// Kind of a column for analysis purposes.
///
/// Only [`ColumnKind::Numeric`] and [`ColumnKind::Categorical`] columns are
/// summarized and charted. The rest are listed in the basic info and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Integer or floating point numbers
    Numeric,
    /// String or categorical text
    Categorical,
    /// Boolean type
    Boolean,
    /// Date, datetime or time
    Datetime,
    /// Anything else (lists, structs, nulls)
    Other,
}

impl ColumnKind {
    /// Classify a polars data type.
    pub fn of(dtype: &DataType) -> Self {
        if is_numeric_dtype(dtype) {
            Self::Numeric
        } else if is_datetime_dtype(dtype) {
            Self::Datetime
        } else if matches!(dtype, DataType::Boolean) {
            Self::Boolean
        } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
            Self::Categorical
        } else {
            Self::Other
        }
    }
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Names of the columns of `df` with the given kind, in column order.
pub fn columns_of_kind(df: &DataFrame, kind: ColumnKind) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| ColumnKind::of(col.dtype()) == kind)
        .map(|col| col.name().to_string())
        .collect()
}

// =============================================================================
// Value Extraction
// =============================================================================

/// Non-missing values of a numeric column as f64, in row order.
///
/// NaN and infinities are kept; callers decide how to treat them.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<f64>> {
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().flatten().collect())
}

/// Values of a numeric column as f64 with missing entries kept as `None`.
///
/// Used for pairwise-complete correlation where row alignment matters.
pub fn numeric_values_aligned(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}

/// Non-missing values of a column rendered as text, in row order.
pub fn string_values(series: &Series) -> PolarsResult<Vec<String>> {
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .flatten()
        .map(|s| s.to_string())
        .collect())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::UInt8));
        assert!(is_numeric_dtype(&DataType::Float32));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_column_kind_of() {
        assert_eq!(ColumnKind::of(&DataType::Int32), ColumnKind::Numeric);
        assert_eq!(ColumnKind::of(&DataType::Float64), ColumnKind::Numeric);
        assert_eq!(ColumnKind::of(&DataType::String), ColumnKind::Categorical);
        assert_eq!(ColumnKind::of(&DataType::Boolean), ColumnKind::Boolean);
        assert_eq!(ColumnKind::of(&DataType::Date), ColumnKind::Datetime);
        assert_eq!(
            ColumnKind::of(&DataType::Datetime(TimeUnit::Milliseconds, None)),
            ColumnKind::Datetime
        );
        assert_eq!(ColumnKind::of(&DataType::Null), ColumnKind::Other);
    }

    #[test]
    fn test_columns_of_kind_keeps_order() {
        let df = df![
            "b" => [1.0, 2.0],
            "name" => ["x", "y"],
            "a" => [3i64, 4],
        ]
        .unwrap();

        assert_eq!(columns_of_kind(&df, ColumnKind::Numeric), vec!["b", "a"]);
        assert_eq!(columns_of_kind(&df, ColumnKind::Categorical), vec!["name"]);
        assert!(columns_of_kind(&df, ColumnKind::Boolean).is_empty());
    }

    #[test]
    fn test_numeric_values_skips_nulls() {
        let series = Series::new("x".into(), &[Some(1i64), None, Some(3)]);
        assert_eq!(numeric_values(&series).unwrap(), vec![1.0, 3.0]);
        assert_eq!(
            numeric_values_aligned(&series).unwrap(),
            vec![Some(1.0), None, Some(3.0)]
        );
    }

    #[test]
    fn test_string_values_skips_nulls() {
        let series = Series::new("s".into(), &[Some("a"), None, Some("b")]);
        assert_eq!(string_values(&series).unwrap(), vec!["a", "b"]);
    }
}
