//! CLI entry point for the demand data cleansing pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use kamp_processing::{
    Pipeline, PipelineConfig, PipelineConfigBuilder, PipelineReport, PipelineStage,
    ReportGenerator,
};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Environment variable naming a JSON configuration file, used when
/// `--config` is not given.
const CONFIG_ENV_VAR: &str = "KAMP_CONFIG";

#[derive(Parser, Debug)]
#[command(
    author = "KAMP Data Team",
    version,
    about = "Demand data cleansing pipeline for injection-molding supply chains",
    long_about = "Cleanses per-product daily order and sensor data for demand forecasting.\n\n\
                  STAGES:\n  \
                  missing    Normalize null tokens, drop sparse columns and incomplete rows\n  \
                  cleanse    Split timestamps, keep one row per product and day, enforce continuity\n  \
                  outliers   Drop rows outside sensor bounds, with negative orders, or outside the date window\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  KAMP_CONFIG    JSON configuration file (same as --config)\n  \
                  RUST_LOG       Log filter, overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Run all three stages with defaults\n  \
                  kamp-processing run -i data/raw/supply_chain.csv\n\n  \
                  # Run one stage against a custom configuration\n  \
                  kamp-processing cleanse --config pipeline.json\n\n  \
                  # Produce the imputed variants of the raw data\n  \
                  kamp-processing impute -i data/raw/supply_chain.csv\n\n  \
                  # Print the forecast results as JSON\n  \
                  kamp-processing results --dir data/forecast"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON configuration file; CLI flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Raw dataset read by the missing-value stage
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Directory receiving stage outputs
    #[arg(long, global = true)]
    result_dir: Option<PathBuf>,

    /// Missing column threshold (0 - 100)
    ///
    /// Columns with a missing percentage strictly above this value are dropped
    #[arg(long, global = true)]
    missing_col_threshold: Option<f64>,

    /// Number of distinct dates each product must cover
    #[arg(long, global = true)]
    expected_observations: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    /// Useful for piping to other tools: `... --json | jq .rows_after`
    #[arg(long, global = true)]
    json: bool,

    /// Write a detailed JSON report to the result directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long, global = true)]
    emit_report: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run missing-value resolution, cleansing and outlier filtering in order
    Run,
    /// Run the missing-value stage only
    Missing,
    /// Run the structural cleansing stage only
    Cleanse,
    /// Run the outlier filter only
    Outliers,
    /// Write mean, median and interpolated variants of the raw dataset
    Impute,
    /// Print the per-product forecast results as a JSON array
    Results {
        /// Directory holding the `<product>_pred.csv` files
        #[arg(long)]
        dir: Option<PathBuf>,
    },
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

    // Load .env first so RUST_LOG and KAMP_CONFIG from it are honored
    dotenv().ok();

    init_logging(&args.log_level, args.quiet, args.json);

    let config = build_config(&args)?;

    let stage = match &args.command {
        Command::Results { dir } => return print_forecast_results(config, dir.clone()),
        Command::Run => None,
        Command::Missing => Some(PipelineStage::MissingValues),
        Command::Cleanse => Some(PipelineStage::Cleansing),
        Command::Outliers => Some(PipelineStage::OutlierFiltering),
        Command::Impute => Some(PipelineStage::Imputation),
    };

    let pipeline = Pipeline::builder().config(config).build()?;
    let result = match stage {
        None => pipeline.run(),
        Some(stage) => single_stage(&pipeline, stage),
    };

    match result {
        Ok(report) => handle_pipeline_output(&report, pipeline.config(), &args),
        Err(e) => {
            error!("Pipeline failed: {}", e);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            }
            Err(anyhow!("Pipeline failed: {}", e))
        }
    }
}

/// Load the configuration file (if any) and apply CLI overrides.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let config_path = args
        .config
        .clone()
        .or_else(|| env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));

    let base = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            PipelineConfig::from_json_file(&path)?
        }
        None => PipelineConfig::default(),
    };

    let mut builder = PipelineConfigBuilder::from_config(&base);
    if let Some(ref input) = args.input {
        builder = builder.input_path(input);
    }
    if let Some(ref dir) = args.result_dir {
        builder = builder.result_dir(dir);
    }
    if let Some(threshold) = args.missing_col_threshold {
        builder = builder.missing_column_threshold(threshold);
    }
    if let Some(count) = args.expected_observations {
        builder = builder.expected_observations(count);
    }

    Ok(builder.build()?)
}

fn single_stage(
    pipeline: &Pipeline,
    stage: PipelineStage,
) -> kamp_processing::PreprocessingResult<PipelineReport> {
    let report = pipeline.run_stage(stage)?;
    Ok(ReportGenerator::build_report(vec![report]))
}

/// Print the forecast records as a JSON array.
fn print_forecast_results(config: PipelineConfig, dir: Option<PathBuf>) -> Result<()> {
    let config = match dir {
        Some(dir) => PipelineConfigBuilder::from_config(&config).forecast_dir(dir).build()?,
        None => config,
    };

    let records = Pipeline::builder().config(config).build()?.forecast_results()?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

/// Handle pipeline output based on CLI flags.
///
/// Output behavior:
/// - Default: Print human-readable summary to stdout
/// - `--json`: Print JSON to stdout only (no logs)
/// - `--emit-report`: Write JSON report to file
fn handle_pipeline_output(report: &PipelineReport, config: &PipelineConfig, args: &Args) -> Result<()> {
    if args.emit_report {
        let input_stem = extract_file_stem(&config.input_path);
        let generator = ReportGenerator::new(config.result_dir.clone());
        let report_path = generator.write_report_to_file(report, &input_stem)?;
        info!("Report written to: {}", report_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    print_human_readable_summary(report);
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("pipeline")
        .to_string()
}

/// Print a human-readable summary of the run.
///
/// This is the default output when `--json` is not specified.
fn print_human_readable_summary(report: &PipelineReport) {
    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANSING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    if let Some(ref input) = report.input_file {
        println!("Input:  {} ({} rows)", input, report.rows_before);
    }
    if let Some(ref output) = report.final_output {
        println!("Output: {} ({} rows)", output, report.rows_after);
    }
    println!("Duration: {}ms", report.duration_ms);
    println!();

    for stage in &report.stages {
        println!("{}:", stage.stage);
        println!(
            "  Rows: {} -> {} ({} removed, {:.1}%)",
            stage.rows_before,
            stage.rows_after,
            stage.rows_removed(),
            stage.rows_removed_percentage()
        );
        println!(
            "  Columns: {} -> {} ({} removed)",
            stage.columns_before,
            stage.columns_after,
            stage.columns_removed()
        );
        if let Some(completeness) = stage.completeness {
            println!("  Completeness: {:.2}%", completeness);
        }
        if stage.timestamp_parse_failures > 0 {
            println!("  Unparseable timestamps: {}", stage.timestamp_parse_failures);
        }
        if !stage.dropped_entities.is_empty() {
            println!("  Dropped products: {}", stage.dropped_entities.join(", "));
        }
        for outcome in &stage.filter_outcomes {
            if outcome.skipped {
                println!("  - {}: skipped", outcome.filter);
            } else {
                println!("  - {}: {} rows removed", outcome.filter, outcome.rows_removed);
            }
        }
        for path in stage.output_files.iter().filter(|p| Some(*p) != report.final_output.as_ref()) {
            println!("  Wrote {}", path);
        }
        println!();
    }

    let warnings = report.warnings();
    if !warnings.is_empty() {
        println!("Warnings:");
        for warning in &warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}
