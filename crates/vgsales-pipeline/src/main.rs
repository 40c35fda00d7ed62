//! CLI entry point for the video game sales pipeline.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::json;
use std::path::Path;
use tracing::{error, info};
use vgsales_pipeline::{
    AggregateTable, AggregationKind, AggregationSpec, AnalysisReport, Dimension,
    GroupedAggregator, Measure, Pipeline, PipelineConfig, PipelineError, PipelineResult,
    SortOrder,
};

/// CLI-compatible grouping dimension enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliDimension {
    Console,
    Genre,
    Publisher,
    Developer,
    ReleaseYear,
    /// Critic-score bucket
    ScoreRange,
}

impl From<CliDimension> for Dimension {
    fn from(cli: CliDimension) -> Self {
        match cli {
            CliDimension::Console => Dimension::Console,
            CliDimension::Genre => Dimension::Genre,
            CliDimension::Publisher => Dimension::Publisher,
            CliDimension::Developer => Dimension::Developer,
            CliDimension::ReleaseYear => Dimension::ReleaseYear,
            CliDimension::ScoreRange => Dimension::ScoreRange,
        }
    }
}

/// CLI-compatible measure enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMeasure {
    NaSales,
    JpSales,
    PalSales,
    OtherSales,
    TotalSales,
    CriticScore,
}

impl From<CliMeasure> for Measure {
    fn from(cli: CliMeasure) -> Self {
        match cli {
            CliMeasure::NaSales => Measure::NaSales,
            CliMeasure::JpSales => Measure::JpSales,
            CliMeasure::PalSales => Measure::PalSales,
            CliMeasure::OtherSales => Measure::OtherSales,
            CliMeasure::TotalSales => Measure::TotalSales,
            CliMeasure::CriticScore => Measure::CriticScore,
        }
    }
}

/// CLI-compatible aggregation kind enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliKind {
    /// Sum of the measure within each group
    Sum,
    /// Mean of the non-missing values within each group
    Mean,
}

impl From<CliKind> for AggregationKind {
    fn from(cli: CliKind) -> Self {
        match cli {
            CliKind::Sum => AggregationKind::Sum,
            CliKind::Mean => AggregationKind::Mean,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Video game sales cleaning and aggregation pipeline",
    long_about = "Loads a video game sales table, cleans it, flags z-score outliers and \
                  answers grouped sales questions.\n\n\
                  EXAMPLES:\n  \
                  # Full analysis report\n  \
                  vgsales-pipeline -i vgchartz-2024.csv\n\n  \
                  # Only the first 1000 rows, as JSON\n  \
                  vgsales-pipeline -i vgchartz-2024.csv --preview-rows 1000 --json\n\n  \
                  # Ad-hoc aggregation: regional sales per console, best sellers first\n  \
                  vgsales-pipeline -i vgchartz-2024.csv --group-by console \\\n    \
                  --measure na-sales --measure jp-sales --total --sort total --descending"
)]
struct Args {
    /// Path to the CSV, TSV or Parquet file to process
    #[arg(short, long)]
    input: String,

    /// JSON file holding a pipeline configuration
    ///
    /// Individual flags below override the values it contains
    #[arg(long)]
    config: Option<String>,

    /// Only use the first N rows of the raw table
    #[arg(long)]
    preview_rows: Option<usize>,

    /// Absolute z-score above which a row is flagged as an outlier
    #[arg(long)]
    outlier_threshold: Option<f64>,

    /// Skip outlier detection
    #[arg(long)]
    no_outliers: bool,

    /// Length of the publisher and developer rankings
    #[arg(long)]
    top_n: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON.
    #[arg(long)]
    json: bool,

    /// Run a single aggregation grouped by this dimension instead of the full report
    #[arg(long, value_enum)]
    group_by: Option<CliDimension>,

    /// Measure to aggregate (repeatable; defaults to total-sales)
    #[arg(long = "measure", value_enum)]
    measures: Vec<CliMeasure>,

    /// How measures are combined within a group
    #[arg(long, value_enum, default_value = "sum")]
    kind: CliKind,

    /// Add a `total` column with the sum of the measures
    #[arg(long)]
    total: bool,

    /// Sort groups by `key` or by an aggregated column name
    #[arg(long)]
    sort: Option<String>,

    /// Sort in descending order
    #[arg(long)]
    descending: bool,

    /// Keep only these dimension values (comma separated or repeated)
    #[arg(long = "allow", value_delimiter = ',')]
    allow: Vec<String>,

    /// Keep only the first N groups after sorting
    #[arg(long)]
    limit: Option<usize>,
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

    match execute(&args) {
        Ok(()) => Ok(()),
        Err(e) if args.json => {
            let payload = match e.downcast_ref::<PipelineError>() {
                Some(pipeline_error) => serde_json::to_value(pipeline_error)?,
                None => json!({ "code": "ERROR", "message": format!("{:#}", e) }),
            };
            println!("{}", serde_json::to_string_pretty(&json!({ "error": payload }))?);
            std::process::exit(1);
        }
        Err(e) => {
            error!("{:#}", e);
            Err(e)
        }
    }
}

fn execute(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    let pipeline = Pipeline::builder()
        .config(config)
        .build()
        .map_err(PipelineError::from)?;

    info!("{}", "=".repeat(80));
    info!("Starting video game sales pipeline...");
    info!("{}", "=".repeat(80));

    let result = pipeline.run(&args.input)?;

    match args.group_by {
        Some(dimension) => run_adhoc(args, dimension.into(), &result),
        None => run_report(args, pipeline.config(), &result),
    }
}

/// Merge the optional JSON config file with command-line overrides.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            serde_json::from_str::<PipelineConfig>(&text)
                .with_context(|| format!("Invalid config file {}", path))?
        }
        None => PipelineConfig::default(),
    };

    if let Some(rows) = args.preview_rows {
        config.preview_rows = Some(rows);
    }
    if let Some(threshold) = args.outlier_threshold {
        config.outlier_threshold = threshold;
    }
    if args.no_outliers {
        config.detect_outliers = false;
    }
    if let Some(n) = args.top_n {
        config.top_n = n;
    }

    Ok(config)
}

fn adhoc_spec(args: &Args, dimension: Dimension) -> Result<AggregationSpec> {
    let measures: Vec<Measure> = if args.measures.is_empty() {
        vec![Measure::TotalSales]
    } else {
        args.measures.iter().map(|m| (*m).into()).collect()
    };

    let sort = match args.sort.as_deref() {
        None => SortOrder::Natural,
        Some("key") => SortOrder::Key {
            descending: args.descending,
        },
        Some(column) => SortOrder::Column {
            column: column.to_string(),
            descending: args.descending,
        },
    };

    let mut builder = AggregationSpec::builder(dimension)
        .measures(measures)
        .kind(args.kind.into())
        .include_total(args.total)
        .sort(sort);
    if !args.allow.is_empty() {
        builder = builder.allow_list(args.allow.iter().cloned());
    }
    if let Some(limit) = args.limit {
        builder = builder.limit(limit);
    }

    Ok(builder.build().map_err(PipelineError::from)?)
}

fn run_adhoc(args: &Args, dimension: Dimension, result: &PipelineResult) -> Result<()> {
    let spec = adhoc_spec(args, dimension)?;
    let table = GroupedAggregator::aggregate(&result.cleaned, &spec)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    println!();
    let title = format!("{:?} BY {}", spec.kind, dimension).to_uppercase();
    print_aggregate(&title, &table);
    Ok(())
}

fn run_report(args: &Args, config: &PipelineConfig, result: &PipelineResult) -> Result<()> {
    let report = AnalysisReport::from_result(result, config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_report(args, result, &report);
    Ok(())
}

/// Print a human-readable analysis report.
///
/// This is the default output when `--json` is not specified.
fn print_human_readable_report(args: &Args, result: &PipelineResult, report: &AnalysisReport) {
    println!();
    println!("{}", "=".repeat(80));
    println!("ANALYSIS COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:   {} ({} rows used)",
        file_name(&args.input),
        result.raw_rows
    );
    println!(
        "Cleaned: {} rows x {} columns ({} duplicate rows)",
        report.summary.shape.0, report.summary.shape.1, report.summary.duplicate_count
    );
    println!("Duration: {}ms", result.duration_ms);
    println!();

    let missing: Vec<_> = result
        .raw_summary
        .columns
        .iter()
        .filter(|c| c.null_count > 0)
        .collect();
    if !missing.is_empty() {
        println!("Missing Values (raw):");
        for column in missing {
            println!("  {:<16} {:>8}", truncate_str(&column.name, 15), column.null_count);
        }
        println!();
    }

    if !result.cleaning_actions.is_empty() {
        println!("Cleaning Actions:");
        for action in &result.cleaning_actions {
            println!("  - {}", action);
        }
        println!();
    }

    println!("NUMERIC SUMMARY");
    println!("{}", "-".repeat(40));
    println!(
        "{:<16} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Column", "Count", "Mean", "Std", "Min", "Median", "Max"
    );
    for summary in &report.summary.numeric {
        println!(
            "{:<16} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10}",
            truncate_str(&summary.column, 15),
            summary.count,
            fmt_opt(summary.mean),
            fmt_opt(summary.std),
            fmt_opt(summary.min),
            fmt_opt(summary.median),
            fmt_opt(summary.max)
        );
    }
    println!();

    match &report.outliers {
        Some(outliers) => {
            println!("OUTLIERS (|z| > {})", outliers.threshold);
            println!("{}", "-".repeat(40));
            println!(
                "  {} of {} scored rows flagged",
                outliers.outlier_count, outliers.evaluated_rows
            );
            for stats in &outliers.column_stats {
                let note = if stats.degenerate { " (constant, skipped)" } else { "" };
                println!(
                    "  {:<14} mean={:>8} std={:>8} flagged={}{}",
                    stats.column,
                    fmt_opt(stats.mean),
                    fmt_opt(stats.std),
                    stats.outlier_count,
                    note
                );
            }
        }
        None => println!("OUTLIERS: skipped"),
    }
    println!();

    println!("CRITIC SCORE CORRELATION");
    println!("{}", "-".repeat(40));
    for correlation in &report.correlations {
        println!(
            "  {:<14} r={:>8} ({} rows)",
            correlation.measure.column(),
            fmt_opt(correlation.coefficient),
            correlation.pairs
        );
    }
    println!();

    let aggregates = &report.aggregates;
    print_aggregate("SALES BY POPULAR CONSOLE", &aggregates.platform_regional_sales);
    print_aggregate("SALES BY POPULAR GENRE", &aggregates.genre_regional_sales);
    print_aggregate("TOP PUBLISHERS", &aggregates.top_publishers);
    print_aggregate("TOP DEVELOPERS", &aggregates.top_developers);
    print_aggregate("SALES BY RELEASE YEAR", &aggregates.yearly_sales_trend);
    print_aggregate("MEAN SALES BY SCORE RANGE", &aggregates.sales_by_score_range);

    println!("{}", "=".repeat(80));
}

fn print_aggregate(title: &str, table: &AggregateTable) {
    println!("{}", title);
    println!("{}", "-".repeat(40));

    if table.is_empty() {
        println!("  (no groups)");
        println!();
        return;
    }

    print!("{:<24}", table.dimension.column());
    for column in &table.columns {
        print!(" {:>12}", truncate_str(column, 12));
    }
    println!();

    for row in &table.rows {
        print!("{:<24}", truncate_str(&row.key, 23));
        for value in &row.values {
            print!(" {:>12.2}", value);
        }
        println!();
    }
    println!();
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v))
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
}
