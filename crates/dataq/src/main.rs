//! Data-quality analysis and cleaning CLI.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use dataq::ingest::read_csv_file;
use dataq::reporting::{ReportWriter, file_stem};
use dataq::{
    CleaningConfig, DataQualityReport, DuplicateStrategy, IngestConfig, MissingStrategy,
    OutlierMethod, Pipeline,
};
use dotenv::dotenv;
use std::env;
use std::path::Path;
use tracing::{info, warn};

/// Environment variable overriding the input byte ceiling, in megabytes.
const MAX_UPLOAD_ENV: &str = "DATAQ_MAX_UPLOAD_MB";

/// CLI-compatible duplicate strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliDuplicateStrategy {
    /// Leave duplicate rows untouched
    Keep,
    /// Add an `_is_duplicate` marker column
    Flag,
    /// Drop duplicate rows, keeping the first occurrence
    Remove,
    /// Remove when duplication is Medium/High severity, otherwise flag
    Auto,
}

impl From<CliDuplicateStrategy> for DuplicateStrategy {
    fn from(cli: CliDuplicateStrategy) -> Self {
        match cli {
            CliDuplicateStrategy::Keep => DuplicateStrategy::Keep,
            CliDuplicateStrategy::Flag => DuplicateStrategy::Flag,
            CliDuplicateStrategy::Remove => DuplicateStrategy::Remove,
            CliDuplicateStrategy::Auto => DuplicateStrategy::Auto,
        }
    }
}

/// CLI-compatible imputation strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMissingStrategy {
    /// Median of non-null values
    Median,
    /// Mean of non-null values
    Mean,
    /// Zero
    Zero,
    /// Most frequent value
    Mode,
}

impl From<CliMissingStrategy> for MissingStrategy {
    fn from(cli: CliMissingStrategy) -> Self {
        match cli {
            CliMissingStrategy::Median => MissingStrategy::Median,
            CliMissingStrategy::Mean => MissingStrategy::Mean,
            CliMissingStrategy::Zero => MissingStrategy::Zero,
            CliMissingStrategy::Mode => MissingStrategy::Mode,
        }
    }
}

/// CLI-compatible outlier treatment enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutlierMethod {
    /// Clamp values into the 1.5×IQR bounds
    Clip,
    /// Add a `<column>_is_outlier` marker column
    Flag,
    /// Drop rows outside the bounds
    Remove,
    /// Leave outliers as-is
    Keep,
}

impl From<CliOutlierMethod> for OutlierMethod {
    fn from(cli: CliOutlierMethod) -> Self {
        match cli {
            CliOutlierMethod::Clip => OutlierMethod::Clip,
            CliOutlierMethod::Flag => OutlierMethod::Flag,
            CliOutlierMethod::Remove => OutlierMethod::Remove,
            CliOutlierMethod::Keep => OutlierMethod::Keep,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Data-quality analysis and cleaning for CSV datasets",
    long_about = "Profiles a CSV dataset, reports quality issues (missing values, duplicates, \
                  type problems, inconsistencies, outliers, correlations, drift), scores it \
                  and writes a cleaned copy.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  DATAQ_MAX_UPLOAD_MB   Maximum input size in megabytes (default 100)\n\n\
                  EXAMPLES:\n  \
                  # Analyze and clean with defaults\n  \
                  dataq -i sales.csv\n\n  \
                  # Compare against last month's data for drift\n  \
                  dataq -i sales.csv --reference sales_prev.csv\n\n  \
                  # Remove duplicates and pipe the report to jq\n  \
                  dataq -i sales.csv --duplicate-strategy remove --json | jq .quality_score"
)]
struct Args {
    /// Path to the CSV file to analyze
    #[arg(short, long)]
    input: String,

    /// Reference CSV used for drift detection
    #[arg(long)]
    reference: Option<String>,

    /// Output directory for the report and cleaned dataset
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// How duplicate rows are handled
    #[arg(long, value_enum, default_value = "flag")]
    duplicate_strategy: CliDuplicateStrategy,

    /// How missing values are imputed
    #[arg(long, value_enum, default_value = "median")]
    missing_strategy: CliMissingStrategy,

    /// How outliers are treated
    #[arg(long, value_enum, default_value = "clip")]
    outlier_method: CliOutlierMethod,

    /// Lower-case text and strip non-alphanumeric characters
    #[arg(long)]
    aggressive_text: bool,

    /// Skip text normalization entirely
    #[arg(long)]
    no_normalize_text: bool,

    /// Drop columns holding a single distinct value
    #[arg(long)]
    remove_constants: bool,

    /// Run the analyzers one after another instead of concurrently
    #[arg(long)]
    sequential: bool,

    /// Output the JSON report to stdout instead of a human-readable summary
    ///
    /// Disables all logging; only the report is written to stdout.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the summary)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber.
///
/// With `json_output` no subscriber is installed so stdout carries only the
/// report.
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

    dotenv().ok();

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let ingest = ingest_config()?;
    let config = build_config(&args)?;

    info!("Loading dataset from: {}", args.input);
    let data = read_csv_file(&args.input, &ingest)?;

    let mut builder = Pipeline::builder().config(config);
    if let Some(ref reference) = args.reference {
        info!("Loading reference dataset from: {}", reference);
        builder = builder.reference(read_csv_file(reference, &ingest)?);
    }
    if !args.json && !args.quiet {
        builder = builder.on_progress(|update| {
            info!("[{:>3.0}%] {}", update.progress * 100.0, update.message);
        });
    }

    let output = builder.build()?.run(data)?;
    let mut cleaned = output.cleaned;

    let writer = ReportWriter::new(&args.output);
    let stem = file_stem(&args.input);
    let (report_path, csv_path) = writer.write_all(&output.report, &mut cleaned, &stem)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output.report)?);
    } else {
        print_human_readable_summary(&output.report, &args, &report_path, &csv_path);
    }

    Ok(())
}

fn ingest_config() -> Result<IngestConfig> {
    let config = match env::var(MAX_UPLOAD_ENV) {
        Ok(raw) => {
            let megabytes: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{MAX_UPLOAD_ENV} must be a whole number, got '{raw}'"))?;
            IngestConfig::default().with_max_megabytes(megabytes)
        }
        Err(_) => IngestConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn build_config(args: &Args) -> Result<CleaningConfig> {
    if args.aggressive_text && args.no_normalize_text {
        warn!("--aggressive-text has no effect together with --no-normalize-text");
    }
    let config = CleaningConfig::builder()
        .duplicate_strategy(args.duplicate_strategy.into())
        .missing_strategy(args.missing_strategy.into())
        .outlier_method(args.outlier_method.into())
        .normalize_text(!args.no_normalize_text)
        .aggressive_text(args.aggressive_text && !args.no_normalize_text)
        .remove_constants(args.remove_constants)
        .parallel_analysis(!args.sequential)
        .build()?;
    Ok(config)
}

/// Print a human-readable summary of the run.
///
/// Uses `println!` on purpose: this is the command's primary output and must
/// be visible regardless of log level.
fn print_human_readable_summary(
    report: &DataQualityReport,
    args: &Args,
    report_path: &Path,
    csv_path: &Path,
) {
    let summary = &report.summary;
    let score = &report.quality_score;

    println!();
    println!("{}", "=".repeat(80));
    println!("DATA QUALITY REPORT");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        args.input, summary.rows_original, summary.columns
    );
    println!(
        "Output: {} ({} rows x {} columns)",
        csv_path.display(),
        summary.rows_cleaned,
        summary.columns_cleaned
    );
    println!("Report: {}", report_path.display());
    println!();

    println!("Quality Score: {}/100 (grade {})", score.score, score.grade.as_str());
    println!("  Missing data impact:  -{}", score.breakdown.missing_data_impact);
    println!("  Duplicate impact:     -{}", score.breakdown.duplicate_impact);
    println!("  Outlier impact:       -{}", score.breakdown.outlier_impact);
    println!("  Inconsistency impact: -{}", score.breakdown.inconsistency_impact);
    println!();

    println!("Findings:");
    let missing = &report.missing_values.summary;
    println!(
        "  Missing values: {} cells ({:.2}%) across {} columns",
        missing.total_missing_values,
        missing.overall_missing_percentage,
        missing.columns_with_missing
    );
    println!(
        "  Duplicates:     {} rows ({:.2}%, severity {})",
        report.duplicates.duplicate_count,
        report.duplicates.duplicate_percent,
        report.duplicates.severity
    );
    println!(
        "  Outliers:       {} rows ({:.2}%, severity {})",
        report.outliers.total_outliers,
        report.outliers.outlier_percentage,
        report.outliers.severity
    );
    if let Some(ref inconsistencies) = report.inconsistencies.summary {
        println!(
            "  Inconsistent:   {} of {} text columns (severity {})",
            inconsistencies.columns_with_issues,
            inconsistencies.total_categorical_columns,
            inconsistencies.severity
        );
    }
    println!(
        "  Correlations:   {} strong pairs",
        report.correlations.high_correlations.len()
    );
    if let Some(ref drift) = report.drift {
        match drift.error {
            Some(ref error) => println!("  Drift:          not computed ({error})"),
            None => println!(
                "  Drift:          severity {} ({} high-drift columns)",
                drift.overall_severity,
                drift.high_drift_columns.len()
            ),
        }
    }
    println!();

    if !summary.cleaning_steps.is_empty() {
        println!("Cleaning Steps:");
        for step in summary.cleaning_steps.iter().take(10) {
            println!("  - {}", step);
        }
        if summary.cleaning_steps.len() > 10 {
            println!("  ... and {} more steps", summary.cleaning_steps.len() - 10);
        }
        println!();
    }

    println!("Duration: {}ms", summary.duration_ms);
    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}
