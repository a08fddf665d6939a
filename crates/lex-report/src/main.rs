//! CLI entry point for the report pipeline.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use lex_report::{DEFAULT_AUTHOR, DEFAULT_TITLE, Pipeline, ReportConfig, RunSummary};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Automated data analysis report generator",
    long_about = "Loads a CSV or Excel file, computes descriptive statistics, draws charts \
                  and writes everything to a PDF report.\n\n\
                  Omitted input, title or author are prompted for interactively.\n\n\
                  EXAMPLES:\n  \
                  # Interactive\n  \
                  lex-report\n\n  \
                  # Fully scripted\n  \
                  lex-report -i sales.csv -t \"Q3 Sales\" -a Finance -o out/q3.pdf\n\n  \
                  # Machine-readable summary\n  \
                  lex-report -i sales.xlsx --json | jq .charts"
)]
struct Args {
    /// Path to the CSV or Excel file to analyze
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Report title
    #[arg(short, long)]
    title: Option<String>,

    /// Report author
    #[arg(short, long)]
    author: Option<String>,

    /// Output PDF path [default: analysis_report.pdf]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for transient chart images [default: temp_charts]
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Chart resolution in dots per inch (36 - 600)
    #[arg(long)]
    dpi: Option<u32>,

    /// JSON file with a full report configuration
    ///
    /// Command line flags override values from the file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the run summary.
    #[arg(long)]
    json: bool,

    /// Write the analysis record next to the report
    ///
    /// The record is saved as <report_name>_analysis.json
    #[arg(long)]
    emit_analysis: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let interactive = args.input.is_none();
    let input = match &args.input {
        Some(path) => path.clone(),
        None => PathBuf::from(prompt("Enter path to your CSV/Excel file:")?),
    };

    if !input.is_file() {
        return Err(anyhow!("File not found: {}", input.display()));
    }

    let title = resolve_text(args.title.clone(), interactive, "Enter report title", DEFAULT_TITLE)?;
    let author = resolve_text(args.author.clone(), interactive, "Enter author name", DEFAULT_AUTHOR)?;

    let config = build_config(&args)?;
    let pipeline = Pipeline::builder().config(config).build()?;

    info!("{}", "=".repeat(80));
    info!("Generating report for {}", input.display());
    info!("{}", "=".repeat(80));

    let summary = match pipeline.run(&input, &title, &author) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Report generation failed: {}", e);
            return Err(anyhow!("[{}] {}", e.error_code(), e));
        }
    };

    if args.emit_analysis {
        let path = analysis_path(&summary.report_path);
        summary
            .analysis
            .write_json(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Analysis written to: {}", path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_human_readable_summary(&summary, &input);
    Ok(())
}

/// Start from the `--config` file (or defaults) and apply flag overrides.
fn build_config(args: &Args) -> Result<ReportConfig> {
    let mut config = match &args.config {
        Some(path) => ReportConfig::from_json_file(path)?,
        None => ReportConfig::default(),
    };

    if let Some(output) = &args.output {
        config.output_path = output.clone();
    }
    if let Some(scratch) = &args.scratch_dir {
        config.scratch_dir = scratch.clone();
    }
    if let Some(dpi) = args.dpi {
        config.chart_dpi = dpi;
    }

    config.validate()?;
    Ok(config)
}

/// Use the flag value, else prompt in interactive mode, else the default.
fn resolve_text(
    value: Option<String>,
    interactive: bool,
    question: &str,
    default: &str,
) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    if !interactive {
        return Ok(default.to_string());
    }

    let answer = prompt(&format!("{question} (default: {default}):"))?;
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer)
    }
}

/// Print `question` and read one trimmed line from stdin.
fn prompt(question: &str) -> Result<String> {
    print!("{question} ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().trim_matches('"').to_string())
}

/// `<report_stem>_analysis.json` in the report's directory.
fn analysis_path(report: &Path) -> PathBuf {
    let stem = report
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    report.with_file_name(format!("{stem}_analysis.json"))
}

/// Print a human-readable summary of the run.
fn print_human_readable_summary(summary: &RunSummary, input: &Path) {
    println!();
    println!("{}", "=".repeat(80));
    println!("REPORT COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input:   {}", input.display());
    println!("Report:  {}", summary.report_path.display());
    println!();

    println!("Summary:");
    println!("  Duration: {}ms", summary.elapsed_ms);
    println!("  Records:  {}", summary.records);
    println!("  Columns:  {}", summary.columns);
    println!("  Charts:   {}", summary.charts);
    println!();

    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-analysis to save the analysis as JSON");
    println!("{}", "=".repeat(80));
}
