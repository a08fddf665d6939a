//! Analysis module.
//!
//! Projects a loaded [`Table`] into an [`AnalysisRecord`] in one pass:
//!
//! - **Basic info**: shape, column names, dtypes, kinds, missing counts
//! - **Numeric stats**: mean, median, std, min, max, quartiles per numeric column
//! - **Categorical stats**: unique count, most frequent value, top value counts
//! - **Data quality**: completeness, duplicate and unique rows
//!
//! A column whose statistics cannot be computed is skipped and recorded as a
//! [`ComputationWarning`]; it never fails the whole analysis.

mod record;
pub mod statistics;

pub use record::{
    AnalysisRecord, BasicInfo, CategoricalSummary, ColumnMap, DataQuality, NumericSummary,
};

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::config::ReportConfig;
use crate::error::{ComputationWarning, ReportError, Result, ResultExt};
use crate::loader::Table;
use crate::utils::{self, ColumnKind};

/// Computes [`AnalysisRecord`]s.
#[derive(Debug, Clone)]
pub struct Analyzer {
    top_values: usize,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}

impl Analyzer {
    /// Create an analyzer keeping `top_values` entries per categorical column.
    pub fn new(top_values: usize) -> Self {
        Self { top_values }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(config.top_values)
    }

    /// Analyze a table.
    ///
    /// # Errors
    ///
    /// [`ReportError::EmptyInput`] when the table has no rows or no columns.
    pub fn analyze(&self, table: &Table) -> Result<AnalysisRecord> {
        if table.is_empty() {
            return Err(ReportError::EmptyInput);
        }

        let df = table.data();
        info!("Analyzing {} rows x {} columns", df.height(), df.width());

        let basic_info = basic_info(df);
        let mut warnings = Vec::new();

        let mut numeric_stats = ColumnMap::new();
        let mut categorical_stats = ColumnMap::new();

        for column in df.get_columns() {
            let name = column.name().to_string();
            let series = column.as_materialized_series();

            match ColumnKind::of(column.dtype()) {
                ColumnKind::Numeric => match numeric_summary(series) {
                    Ok(summary) => numeric_stats.insert(name, summary),
                    Err(warning) => {
                        warn!("{}", warning);
                        warnings.push(warning);
                    }
                },
                ColumnKind::Categorical => match categorical_summary(series, self.top_values) {
                    Ok(summary) => categorical_stats.insert(name, summary),
                    Err(warning) => {
                        warn!("{}", warning);
                        warnings.push(warning);
                    }
                },
                other => debug!("Skipping column '{}' of kind {:?}", name, other),
            }
        }
        debug!(
            "Computed stats for {} numeric and {} categorical columns",
            numeric_stats.len(),
            categorical_stats.len()
        );

        let data_quality = match data_quality(df) {
            Ok(quality) => quality,
            Err(e) => {
                let warning = ComputationWarning::new("data quality", e);
                warn!("{}", warning);
                warnings.push(warning);
                DataQuality {
                    completeness_rate: 0.0,
                    duplicate_rows: 0,
                    unique_rows: df.height(),
                }
            }
        };

        info!(
            "Analysis complete: {:.1}% complete, {} duplicate rows, {} warnings",
            data_quality.completeness_rate,
            data_quality.duplicate_rows,
            warnings.len()
        );

        Ok(AnalysisRecord {
            basic_info,
            numeric_stats,
            categorical_stats,
            data_quality,
            warnings,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
    }
}

/// Analyze a table with default settings.
pub fn analyze(table: &Table) -> Result<AnalysisRecord> {
    Analyzer::default().analyze(table)
}

fn basic_info(df: &DataFrame) -> BasicInfo {
    let mut data_types = ColumnMap::new();
    let mut column_kinds = ColumnMap::new();
    let mut missing_values = ColumnMap::new();

    for column in df.get_columns() {
        let name = column.name().to_string();
        data_types.insert(name.clone(), column.dtype().to_string());
        column_kinds.insert(name.clone(), ColumnKind::of(column.dtype()));
        missing_values.insert(name, column.null_count());
    }

    BasicInfo {
        total_rows: df.height(),
        total_columns: df.width(),
        column_names: df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect(),
        data_types,
        column_kinds,
        missing_values,
    }
}

/// Summarize one numeric column.
///
/// Fails when the column has no values or contains NaN/infinity.
pub fn numeric_summary(series: &Series) -> std::result::Result<NumericSummary, ComputationWarning> {
    let name = series.name().as_str();
    let mut values =
        utils::numeric_values(series).map_err(|e| ComputationWarning::new(name, e))?;

    if values.is_empty() {
        return Err(ComputationWarning::new(
            name,
            ReportError::NoValidValues(name.to_string()),
        ));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(ComputationWarning::new(
            name,
            format!("contains non-finite value {bad}"),
        ));
    }

    values.sort_by(f64::total_cmp);

    Ok(NumericSummary {
        mean: statistics::mean(&values),
        median: statistics::quantile(&values, 0.5),
        std: statistics::sample_std(&values),
        min: values[0],
        max: values[values.len() - 1],
        q25: statistics::quantile(&values, 0.25),
        q75: statistics::quantile(&values, 0.75),
    })
}

/// Summarize one categorical column, keeping `top_values` value counts.
pub fn categorical_summary(
    series: &Series,
    top_values: usize,
) -> std::result::Result<CategoricalSummary, ComputationWarning> {
    let values = utils::string_values(series)
        .map_err(|e| ComputationWarning::new(series.name().as_str(), e))?;

    let mut counts = statistics::value_counts(&values);
    let Some((most_frequent, frequency)) = counts.first().cloned() else {
        return Ok(CategoricalSummary::empty());
    };

    let unique_values = counts.len();
    counts.truncate(top_values);

    Ok(CategoricalSummary {
        unique_values,
        most_frequent,
        frequency,
        value_counts: counts,
    })
}

/// Completeness, duplicates and unique rows for a frame.
pub fn data_quality(df: &DataFrame) -> Result<DataQuality> {
    let total_cells = df.height() * df.width();
    if total_cells == 0 {
        return Ok(DataQuality {
            completeness_rate: 0.0,
            duplicate_rows: 0,
            unique_rows: df.height(),
        });
    }

    let missing: usize = df.get_columns().iter().map(|col| col.null_count()).sum();
    let completeness_rate = (total_cells - missing) as f64 / total_cells as f64 * 100.0;

    let duplicate_rows = df.height()
        - df
            .unique::<&str, &str>(None, UniqueKeepStrategy::First, None)
            .context("Counting duplicate rows")?
            .height();

    Ok(DataQuality {
        completeness_rate,
        duplicate_rows,
        unique_rows: df.height() - duplicate_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(df: DataFrame) -> Table {
        Table::new(df, "test.csv")
    }

    // ==================== analyze tests ====================

    #[test]
    fn test_analyze_empty_table_fails() {
        let err = analyze(&table(DataFrame::empty())).unwrap_err();
        assert!(matches!(err, ReportError::EmptyInput));

        let no_rows = df!["a" => Vec::<f64>::new()].unwrap();
        assert!(matches!(
            analyze(&table(no_rows)).unwrap_err(),
            ReportError::EmptyInput
        ));
    }

    #[test]
    fn test_analyze_basic_info() {
        let df = df![
            "age" => [Some(30i64), None, Some(41)],
            "city" => [Some("Oslo"), Some("Rome"), None],
            "member" => [true, false, true],
        ]
        .unwrap();

        let record = analyze(&table(df)).unwrap();
        let info = &record.basic_info;

        assert_eq!(info.total_rows, 3);
        assert_eq!(info.total_columns, 3);
        assert_eq!(info.column_names, vec!["age", "city", "member"]);
        assert_eq!(info.missing_values.get("age"), Some(&1));
        assert_eq!(info.missing_values.get("member"), Some(&0));
        assert_eq!(info.column_kinds.get("member"), Some(&ColumnKind::Boolean));
        assert!(info.data_types.contains("city"));

        // Boolean columns are listed but not summarized
        assert!(record.numeric_stats.contains("age"));
        assert!(record.categorical_stats.contains("city"));
        assert!(!record.numeric_stats.contains("member"));
        assert!(!record.categorical_stats.contains("member"));
    }

    #[test]
    fn test_analyze_does_not_mutate_table() {
        let df = df![
            "x" => [3.0, 1.0, 2.0],
            "s" => ["b", "a", "b"],
        ]
        .unwrap();
        let t = table(df.clone());

        analyze(&t).unwrap();
        assert!(t.data().equals_missing(&df));
    }

    #[test]
    fn test_analyze_without_numeric_columns() {
        let df = df!["s" => ["a", "b"]].unwrap();
        let record = analyze(&table(df)).unwrap();
        assert!(record.numeric_stats.is_empty());
        assert_eq!(record.categorical_stats.len(), 1);
    }

    #[test]
    fn test_analyze_non_finite_column_is_skipped() {
        let df = df![
            "good" => [1.0, 2.0, 3.0],
            "bad" => [1.0, f64::NAN, 3.0],
        ]
        .unwrap();

        let record = analyze(&table(df)).unwrap();
        assert!(record.numeric_stats.contains("good"));
        assert!(!record.numeric_stats.contains("bad"));
        assert_eq!(record.warnings.len(), 1);
        assert_eq!(record.warnings[0].subject, "bad");
    }

    #[test]
    fn test_analyze_all_null_numeric_column() {
        let df = df![
            "empty" => [None::<f64>, None],
            "ok" => [1.0, 2.0],
        ]
        .unwrap();

        let record = analyze(&table(df)).unwrap();
        assert!(!record.numeric_stats.contains("empty"));
        assert!(record.warnings[0].reason.contains("No valid values"));
    }

    // ==================== numeric_summary tests ====================

    #[test]
    fn test_numeric_summary_values() {
        let series = Series::new("v".into(), &[4.0, 1.0, 3.0, 2.0]);
        let summary = numeric_summary(&series).unwrap();

        assert_eq!(summary.mean, 2.5);
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
        assert_eq!(summary.q25, 1.75);
        assert_eq!(summary.q75, 3.25);
        assert!((summary.std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_numeric_summary_single_value() {
        let series = Series::new("v".into(), &[Some(7i64), None]);
        let summary = numeric_summary(&series).unwrap();
        assert_eq!(summary.std, 0.0);
        assert_eq!(summary.median, 7.0);
    }

    #[test]
    fn test_numeric_summary_rejects_infinity() {
        let series = Series::new("v".into(), &[1.0, f64::INFINITY]);
        let warning = numeric_summary(&series).unwrap_err();
        assert_eq!(warning.subject, "v");
        assert!(warning.reason.contains("non-finite"));
    }

    // ==================== categorical_summary tests ====================

    #[test]
    fn test_categorical_summary() {
        let series = Series::new(
            "region".into(),
            &[Some("north"), Some("south"), None, Some("south"), Some("east")],
        );
        let summary = categorical_summary(&series, 10).unwrap();

        assert_eq!(summary.unique_values, 3);
        assert_eq!(summary.most_frequent, "south");
        assert_eq!(summary.frequency, 2);
        assert_eq!(
            summary.value_counts,
            vec![
                ("south".to_string(), 2),
                ("north".to_string(), 1),
                ("east".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_categorical_summary_truncates_counts() {
        let values: Vec<String> = (0..15).map(|i| format!("v{i}")).collect();
        let series = Series::new("many".into(), values);
        let summary = categorical_summary(&series, 10).unwrap();

        assert_eq!(summary.unique_values, 15);
        assert_eq!(summary.value_counts.len(), 10);
        assert_eq!(summary.most_frequent, "v0");
    }

    #[test]
    fn test_categorical_summary_all_missing() {
        let series = Series::new("none".into(), &[None::<&str>, None]);
        let summary = categorical_summary(&series, 10).unwrap();
        assert_eq!(summary, CategoricalSummary::empty());
    }

    // ==================== data_quality tests ====================

    #[test]
    fn test_data_quality_duplicates() {
        let df = df![
            "a" => [1, 2, 1, 3],
            "b" => ["x", "y", "x", "z"],
        ]
        .unwrap();

        let quality = data_quality(&df).unwrap();
        assert_eq!(quality.duplicate_rows, 1);
        assert_eq!(quality.unique_rows, 3);
        assert_eq!(quality.completeness_rate, 100.0);
    }

    #[test]
    fn test_data_quality_completeness() {
        let df = df![
            "a" => [Some(1), None],
            "b" => [Some("x"), Some("y")],
        ]
        .unwrap();

        let quality = data_quality(&df).unwrap();
        assert_eq!(quality.completeness_rate, 75.0);
    }

    #[test]
    fn test_data_quality_empty_frame() {
        let quality = data_quality(&DataFrame::empty()).unwrap();
        assert_eq!(quality.completeness_rate, 0.0);
        assert_eq!(quality.duplicate_rows, 0);

        let no_rows = df!["a" => Vec::<i64>::new()].unwrap();
        assert_eq!(data_quality(&no_rows).unwrap().completeness_rate, 0.0);
    }
}
