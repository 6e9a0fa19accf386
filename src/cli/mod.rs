//! Command-line interface for the drillhole pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use crate::config::{DesurveyConfig, MatchConfig};
use crate::core::loaders::load_table_csv;
use crate::core::table::Table;
use crate::core::writers::{write_report_json, write_table_csv};
use crate::processors::desurvey::{DesurveyEngine, DesurveyMapping};
use crate::processors::matching::{IntervalMatcher, MergeStrategy};
use crate::processors::overlap::detect_internal_overlaps;
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "drillhole-pipeline")]
#[command(about = "Drillhole desurvey and interval-matching pipeline", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Desurvey assay intervals to 3D coordinates
    Desurvey {
        /// Collar CSV (hole id, easting, northing, elevation)
        collar: PathBuf,
        /// Survey CSV (hole id, depth, dip, azimuth)
        survey: PathBuf,
        /// Assay CSV (hole id, from, to)
        assay: PathBuf,
        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
        /// JSON file mapping role names to column names per table
        #[arg(long)]
        mapping: Option<PathBuf>,
        /// Write a JSON processing report
        #[arg(long)]
        report: Option<PathBuf>,
        /// Force sequential processing
        #[arg(long)]
        sequential: bool,
        /// Worker thread count (0 = auto)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Merge logging categories onto assay intervals by depth overlap
    MatchIntervals {
        /// Assay CSV (hole id, from, to)
        assay: PathBuf,
        /// Logging CSV (hole id, from, to, category)
        logging: PathBuf,
        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
        /// Logging column carrying the category (resolved heuristically if omitted)
        #[arg(long)]
        category: Option<String>,
        /// Merge strategy: max_overlap, split_columns, or combine_codes
        #[arg(long)]
        strategy: Option<String>,
        /// Minimum overlap percentage (exclusive) for a match to count
        #[arg(long)]
        min_overlap: Option<f64>,
        /// Prefix for generated column names
        #[arg(long)]
        prefix: Option<String>,
        /// Write the QAQC report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Scan a logging table for internally overlapping intervals
    CheckOverlaps {
        /// Logging CSV (hole id, from, to, category)
        logging: PathBuf,
        /// Logging column carrying the category (resolved heuristically if omitted)
        #[arg(long)]
        category: Option<String>,
        /// Write the overlap report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.len() > 39 {
            format!("{}...", &value[..36])
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Desurvey {
            collar,
            survey,
            assay,
            output,
            mapping,
            report,
            sequential,
            workers,
        } => {
            cmd_desurvey(
                &collar, &survey, &assay, &output, mapping, report, sequential, workers, &config,
            );
        }
        Commands::MatchIntervals {
            assay,
            logging,
            output,
            category,
            strategy,
            min_overlap,
            prefix,
            report,
        } => {
            cmd_match_intervals(
                &assay,
                &logging,
                &output,
                category.as_deref(),
                strategy.as_deref(),
                min_overlap,
                prefix,
                report,
                &config,
            );
        }
        Commands::CheckOverlaps {
            logging,
            category,
            report,
        } => {
            cmd_check_overlaps(&logging, category.as_deref(), report);
        }
    }
}

fn load_or_exit(path: &PathBuf, what: &str) -> Table {
    match load_table_csv(path) {
        Ok(table) => {
            info!(
                "{}: {} rows, {} columns",
                what,
                table.num_rows(),
                table.num_columns()
            );
            table
        }
        Err(e) => {
            error!("Failed to load {} from {}: {}", what, path.display(), e);
            std::process::exit(1);
        }
    }
}

fn load_mapping(path: &PathBuf) -> DesurveyMapping {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to read mapping file {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };
    match serde_json::from_str(&content) {
        Ok(m) => m,
        Err(e) => {
            error!("Invalid mapping file {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

#[derive(Serialize)]
struct DesurveyReport {
    rows_written: usize,
    holes_processed: usize,
    holes_skipped: usize,
    warnings: Vec<String>,
}

#[allow(clippy::too_many_arguments)]
fn cmd_desurvey(
    collar: &PathBuf,
    survey: &PathBuf,
    assay: &PathBuf,
    output: &PathBuf,
    mapping: Option<PathBuf>,
    report: Option<PathBuf>,
    sequential: bool,
    workers: Option<usize>,
    config: &PipelineConfig,
) {
    let start = Instant::now();

    let collars = load_or_exit(collar, "collar table");
    let surveys = load_or_exit(survey, "survey table");
    let assays = load_or_exit(assay, "assay table");
    let mapping = mapping.map(|p| load_mapping(&p));

    let desurvey_config = DesurveyConfig {
        use_parallel: !sequential && config.desurvey.use_parallel,
        worker_count: workers.unwrap_or(config.desurvey.worker_count),
        parallel_threshold: config.desurvey.parallel_threshold,
    };

    let spinner = create_spinner("Desurveying holes...");

    let engine = DesurveyEngine::new(desurvey_config);
    let out = match engine.desurvey(&collars, &surveys, &assays, mapping.as_ref()) {
        Ok(out) => {
            spinner.finish_and_clear();
            out
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Desurvey failed: {}", e);
            std::process::exit(1);
        }
    };

    for warning in &out.warnings {
        warn!("{}", warning);
    }

    if let Err(e) = write_table_csv(output, &out.table) {
        error!("Failed to write output: {}", e);
        std::process::exit(1);
    }

    if let Some(report_path) = report {
        let report_data = DesurveyReport {
            rows_written: out.table.num_rows(),
            holes_processed: out.holes_processed,
            holes_skipped: out.holes_skipped,
            warnings: out.warnings.clone(),
        };
        if let Err(e) = write_report_json(&report_path, &report_data) {
            error!("Failed to write report: {}", e);
            std::process::exit(1);
        }
    }

    print_summary(
        "Desurvey Complete",
        &[
            ("Output file", output.display().to_string()),
            ("Rows written", out.table.num_rows().to_string()),
            ("Holes processed", out.holes_processed.to_string()),
            ("Holes skipped", out.holes_skipped.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

#[allow(clippy::too_many_arguments)]
fn cmd_match_intervals(
    assay: &PathBuf,
    logging: &PathBuf,
    output: &PathBuf,
    category: Option<&str>,
    strategy: Option<&str>,
    min_overlap: Option<f64>,
    prefix: Option<String>,
    report: Option<PathBuf>,
    config: &PipelineConfig,
) {
    let start = Instant::now();

    let strategy = match strategy {
        Some(s) => match MergeStrategy::from_str(s) {
            Ok(st) => st,
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        },
        None => config.matching.strategy,
    };

    let assays = load_or_exit(assay, "assay table");
    let logging_table = load_or_exit(logging, "logging table");

    let match_config = MatchConfig {
        strategy,
        min_overlap_pct: min_overlap.unwrap_or(config.matching.min_overlap_pct),
        column_prefix: prefix.unwrap_or_else(|| config.matching.column_prefix.clone()),
        matrix_cell_budget: config.matching.matrix_cell_budget,
    };

    let spinner = create_spinner("Matching intervals...");

    let matcher = IntervalMatcher::new(match_config);
    let out = match matcher.match_intervals(&assays, &logging_table, category) {
        Ok(out) => {
            spinner.finish_and_clear();
            out
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Interval matching failed: {}", e);
            std::process::exit(1);
        }
    };

    for warning in &out.warnings {
        warn!("{}", warning);
    }

    let enriched = match out.apply_to(&assays) {
        Ok(table) => table,
        Err(e) => {
            error!("Failed to assemble output table: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = write_table_csv(output, &enriched) {
        error!("Failed to write output: {}", e);
        std::process::exit(1);
    }

    if let Some(report_path) = report {
        if let Err(e) = write_report_json(&report_path, &out.qaqc) {
            error!("Failed to write QAQC report: {}", e);
            std::process::exit(1);
        }
    }

    print_summary(
        "Interval Matching Complete",
        &[
            ("Output file", output.display().to_string()),
            ("Columns added", out.columns_added.join(", ")),
            ("Assay rows", out.qaqc.total_assay_rows.to_string()),
            ("Matched rows", out.qaqc.matched_rows.to_string()),
            ("Avg overlap %", format!("{:.1}", out.qaqc.avg_overlap_pct)),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_check_overlaps(logging: &PathBuf, category: Option<&str>, report: Option<PathBuf>) {
    let start = Instant::now();

    let logging_table = load_or_exit(logging, "logging table");

    let spinner = create_spinner("Scanning for overlapping intervals...");

    let out = match detect_internal_overlaps(&logging_table, category) {
        Ok(out) => {
            spinner.finish_and_clear();
            out
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Overlap scan failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(report_path) = report {
        if let Err(e) = write_report_json(&report_path, &out) {
            error!("Failed to write report: {}", e);
            std::process::exit(1);
        }
    }

    print_summary(
        "Overlap Scan Complete",
        &[
            ("Logging file", logging.display().to_string()),
            ("Overlaps found", out.overlap_count.to_string()),
            ("Holes affected", out.holes_with_overlaps.len().to_string()),
            (
                "Values involved",
                out.overlapping_values.join(", "),
            ),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}
