//! Integration tests for the report pipeline.
//!
//! These tests run the stages end to end on generated datasets written to
//! temporary directories.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use lex_report::analysis;
use lex_report::{
    Analyzer, Block, ChartKind, ChartProducer, Pipeline, PipelineStage, ProgressUpdate,
    ReportConfig, Table, loader, reporting,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

/// 100 rows, `region` cycling through three values, random `amount`.
fn write_sales_csv(dir: &Path) -> PathBuf {
    let mut rng = StdRng::seed_from_u64(42);
    let regions = ["North", "South", "West"];

    let mut content = String::from("region,amount\n");
    for i in 0..100 {
        let amount: f64 = rng.gen_range(10.0..500.0);
        content.push_str(&format!("{},{:.2}\n", regions[i % 3], amount));
    }

    let path = dir.join("sales.csv");
    std::fs::write(&path, content).unwrap();
    path
}

fn config_in(dir: &Path) -> ReportConfig {
    ReportConfig::builder()
        .output_path(dir.join("out/report.pdf"))
        .scratch_dir(dir.join("temp_charts"))
        .chart_dpi(48)
        .build()
        .unwrap()
}

fn recording_pipeline(config: ReportConfig) -> (Pipeline, Arc<Mutex<Vec<ProgressUpdate>>>) {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = updates.clone();
    let pipeline = Pipeline::builder()
        .config(config)
        .on_progress(move |update| sink.lock().unwrap().push(update))
        .build()
        .unwrap();
    (pipeline, updates)
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .filter(|window| *window == needle)
        .count()
}

/// Sales sheet whose header row starts at B3 instead of A1.
fn write_sales_workbook(dir: &Path) -> PathBuf {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in ["region", "units", "amount", "active"].iter().enumerate() {
        sheet.write_string(2, 1 + col as u16, *name).unwrap();
    }
    let regions = ["North", "South", "West"];
    for i in 0..12u32 {
        let row = 3 + i;
        sheet.write_string(row, 1, regions[i as usize % 3]).unwrap();
        sheet.write_number(row, 2, f64::from(i * 7 % 5 + 1)).unwrap();
        sheet.write_number(row, 3, 10.25 * f64::from(i) + 0.5).unwrap();
        sheet.write_boolean(row, 4, i % 2 == 0).unwrap();
    }

    let path = dir.join("sales.xlsx");
    workbook.save(&path).unwrap();
    path
}

fn sales_table(dir: &TempDir) -> Table {
    loader::load(write_sales_csv(dir.path())).unwrap()
}

// ============================================================================
// Sales Scenario
// ============================================================================

#[test]
fn test_sales_pipeline_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_sales_csv(dir.path());

    let (pipeline, updates) = recording_pipeline(config_in(dir.path()));
    let summary = pipeline.run(&input, "Sales Report", "Analyst").unwrap();

    assert_eq!(summary.records, 100);
    assert_eq!(summary.columns, 2);
    assert_eq!(summary.charts, 2);
    assert!(summary.warnings.is_empty());

    let record = &summary.analysis;
    assert_eq!(record.basic_info.total_rows, 100);
    assert_eq!(record.data_quality.completeness_rate, 100.0);
    assert!(record.numeric_stats.contains("amount"));
    assert_eq!(
        record.categorical_stats.get("region").unwrap().unique_values,
        3
    );

    let pdf = std::fs::read(&summary.report_path).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    assert_eq!(count_occurrences(&pdf, b"/Subtype /Image"), 2);

    // Chart images and the scratch directory are gone after success
    assert!(!dir.path().join("temp_charts").exists());

    let last = updates.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.stage, PipelineStage::Complete);
    assert_eq!(last.progress, 1.0);
}

#[test]
fn test_sales_document_layout() {
    let dir = tempfile::tempdir().unwrap();
    let table = sales_table(&dir);
    let config = config_in(dir.path());

    let record = analysis::analyze(&table).unwrap();
    let artifacts = ChartProducer::new(&config).produce(&table);
    let kinds: Vec<ChartKind> = artifacts.iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![ChartKind::NumericDistributions, ChartKind::CategoricalAnalysis]
    );

    let doc = reporting::build_document(&record, &artifacts, "Sales", "Analyst");
    assert_eq!(
        doc.headings(),
        vec![
            "Data Summary",
            "Categorical Summary",
            "Data Quality",
            "Data Visualizations"
        ]
    );
    assert_eq!(doc.image_count(), 2);

    let numeric_table = doc.blocks().iter().find_map(|block| match block {
        Block::Table { header, rows, .. } if header.len() == 6 => Some((header, rows)),
        _ => None,
    });
    let (header, rows) = numeric_table.unwrap();
    assert_eq!(header, &["Column", "Mean", "Median", "Std Dev", "Min", "Max"]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "amount");

    reporting::discard_artifacts(&artifacts);
}

// ============================================================================
// Failure Handling
// ============================================================================

#[test]
fn test_unsupported_format_runs_no_later_stage() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("data.txt");
    std::fs::write(&input, "region,amount\nNorth,1\n").unwrap();

    let (pipeline, updates) = recording_pipeline(config_in(dir.path()));
    let err = pipeline.run(&input, "T", "A").unwrap_err();

    assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    assert!(err.to_string().contains(".txt"));

    let stages: Vec<PipelineStage> = updates.lock().unwrap().iter().map(|u| u.stage).collect();
    for later in [
        PipelineStage::Analyzing,
        PipelineStage::Visualizing,
        PipelineStage::Rendering,
    ] {
        assert!(!stages.contains(&later), "{:?} should not run", later);
    }
    assert_eq!(stages.last(), Some(&PipelineStage::Failed));
    assert!(!dir.path().join("temp_charts").exists());
    assert!(!dir.path().join("out/report.pdf").exists());
}

#[test]
fn test_missing_file_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = loader::load(dir.path().join("nowhere.csv")).unwrap_err();
    assert_eq!(err.error_code(), "PARSE_ERROR");
    assert!(err.is_load_failure());
}

#[test]
fn test_corrupt_workbook_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.XLSX");
    std::fs::write(&input, b"definitely not a zip archive").unwrap();

    let err = Pipeline::builder()
        .config(config_in(dir.path()))
        .build()
        .unwrap()
        .run(&input, "T", "A")
        .unwrap_err();
    assert_eq!(err.error_code(), "PARSE_ERROR");
}

#[test]
fn test_late_type_change_in_csv_loads_as_text() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("codes.csv");
    let mut content = String::from("code,amount\n");
    for i in 0..150 {
        let code = if i < 120 { i.to_string() } else { format!("A{i}") };
        content.push_str(&format!("{code},{i}\n"));
    }
    std::fs::write(&input, content).unwrap();

    let table = loader::load(&input).unwrap();
    assert_eq!((table.height(), table.width()), (150, 2));
    assert_eq!(table.data().column("code").unwrap().dtype(), &DataType::String);

    let record = analysis::analyze(&table).unwrap();
    assert_eq!(
        record.categorical_stats.get("code").unwrap().unique_values,
        150
    );
    assert!(record.numeric_stats.contains("amount"));
}

#[test]
fn test_render_without_artifacts_has_no_visualization_section() {
    let dir = tempfile::tempdir().unwrap();
    let table = sales_table(&dir);
    let record = analysis::analyze(&table).unwrap();

    let doc = reporting::build_document(&record, &[], "Sales", "Analyst");
    assert!(!doc.headings().contains(&"Data Visualizations"));
    assert_eq!(doc.image_count(), 0);

    let output = dir.path().join("plain.pdf");
    let path = reporting::render(Some(&record), Vec::new(), "Sales", "Analyst", &output).unwrap();
    let pdf = std::fs::read(path).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    assert_eq!(count_occurrences(&pdf, b"/Subtype /Image"), 0);
}

// ============================================================================
// Workbook Input
// ============================================================================

#[test]
fn test_workbook_loads_with_inferred_types() {
    let dir = tempfile::tempdir().unwrap();
    let table = loader::load(write_sales_workbook(dir.path())).unwrap();

    assert_eq!((table.height(), table.width()), (12, 4));
    assert_eq!(table.column_names(), vec!["region", "units", "amount", "active"]);

    let df = table.data();
    assert_eq!(df.column("region").unwrap().dtype(), &DataType::String);
    assert_eq!(df.column("units").unwrap().dtype(), &DataType::Int64);
    assert_eq!(df.column("amount").unwrap().dtype(), &DataType::Float64);
    assert_eq!(df.column("active").unwrap().dtype(), &DataType::Boolean);
    assert_eq!(
        df.column("region").unwrap().str().unwrap().get(0),
        Some("North")
    );
}

#[test]
fn test_workbook_pipeline_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_sales_workbook(dir.path());

    let (pipeline, updates) = recording_pipeline(config_in(dir.path()));
    let summary = pipeline.run(&input, "Workbook Sales", "Analyst").unwrap();

    assert_eq!(summary.records, 12);
    assert_eq!(summary.columns, 4);
    // distributions, categorical bars and the units/amount heatmap
    assert_eq!(summary.charts, 3);

    let record = &summary.analysis;
    assert!(record.numeric_stats.contains("units"));
    assert!(record.numeric_stats.contains("amount"));
    assert!(!record.numeric_stats.contains("active"));
    assert_eq!(
        record.categorical_stats.get("region").unwrap().unique_values,
        3
    );

    let pdf = std::fs::read(&summary.report_path).unwrap();
    assert_eq!(count_occurrences(&pdf, b"/Subtype /Image"), 3);
    assert_eq!(
        updates.lock().unwrap().last().map(|u| u.stage),
        Some(PipelineStage::Complete)
    );
}

// ============================================================================
// Non-ASCII Text
// ============================================================================

#[test]
fn test_accented_values_reach_the_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cities.csv");
    std::fs::write(
        &input,
        "city,population\nS\u{e3}o Paulo,12\nM\u{fc}nchen,1\nS\u{e3}o Paulo,12\n",
    )
    .unwrap();

    let summary = Pipeline::builder()
        .config(config_in(dir.path()))
        .build()
        .unwrap()
        .run(&input, "Caf\u{e9} Report", "Jos\u{e9}")
        .unwrap();

    let city = summary.analysis.categorical_stats.get("city").unwrap();
    assert_eq!(city.most_frequent, "S\u{e3}o Paulo");

    let pdf = std::fs::read(&summary.report_path).unwrap();
    assert!(count_occurrences(&pdf, b"/WinAnsiEncoding") > 0);
    assert!(pdf_shows(&pdf, "S\u{e3}o Paulo"));
    assert!(pdf_shows(&pdf, "Caf\u{e9} Report"));
    assert_eq!(count_occurrences(&pdf, b"S?o Paulo"), 0);
}

/// Content strings with bytes above 0x7F may be written in hex form.
fn pdf_shows(pdf: &[u8], text: &str) -> bool {
    let encoded = reporting::document::encode_win_ansi(text);
    let hex: String = encoded.iter().map(|b| format!("{b:02x}")).collect();
    count_occurrences(pdf, &encoded) > 0
        || count_occurrences(&pdf.to_ascii_lowercase(), hex.as_bytes()) > 0
}

// ============================================================================
// Analysis Properties
// ============================================================================

#[test]
fn test_non_finite_column_is_skipped_and_run_completes() {
    let dir = tempfile::tempdir().unwrap();
    let df = df![
        "good" => [1.0, 2.0, 3.0, 4.0],
        "bad" => [1.0, f64::INFINITY, 2.0, 3.0],
        "label" => ["a", "b", "a", "c"],
    ]
    .unwrap();
    let table = Table::new(df, "mixed.csv");

    let record = Analyzer::default().analyze(&table).unwrap();
    assert!(record.numeric_stats.contains("good"));
    assert!(!record.numeric_stats.contains("bad"));
    assert_eq!(record.warnings.len(), 1);
    assert_eq!(record.warnings[0].subject, "bad");

    let artifacts = ChartProducer::new(&config_in(dir.path())).produce(&table);
    let output = dir.path().join("mixed.pdf");
    assert!(reporting::render(Some(&record), artifacts, "Mixed", "QA", &output).is_ok());
    assert!(output.exists());
}

#[test]
fn test_duplicate_rows_counted_once() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dupes.csv");
    std::fs::write(&input, "id,name\n1,a\n2,b\n2,b\n3,c\n4,d\n").unwrap();

    let summary = Pipeline::builder()
        .config(config_in(dir.path()))
        .build()
        .unwrap()
        .run(&input, "T", "A")
        .unwrap();

    let quality = summary.analysis.data_quality;
    assert_eq!(quality.duplicate_rows, 1);
    assert_eq!(quality.unique_rows, 4);
}

#[test]
fn test_analysis_leaves_table_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let table = sales_table(&dir);
    let before = table.data().clone();

    analysis::analyze(&table).unwrap();
    assert!(table.data().equals_missing(&before));
}

#[test]
fn test_completeness_of_empty_frame_is_zero() {
    let quality = analysis::data_quality(&DataFrame::empty()).unwrap();
    assert_eq!(quality.completeness_rate, 0.0);
}

#[test]
fn test_emitted_analysis_json() {
    let dir = tempfile::tempdir().unwrap();
    let table = sales_table(&dir);
    let record = analysis::analyze(&table).unwrap();

    let path = dir.path().join("sales_analysis.json");
    record.write_json(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["basic_info"]["total_rows"], 100);
    assert_eq!(json["categorical_stats"]["region"]["unique_values"], 3);
    assert!(json["numeric_stats"]["amount"]["mean"].is_number());
}
