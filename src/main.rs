//! imaging-eval CLI - score model outputs against an annotated dataset.
//!
//! # Usage
//!
//! ```bash
//! # Print the report to stdout
//! imaging-eval --dataset-file-path dataset.json --output-file-path output.json
//!
//! # Write the report, reusing bounding-box metrics from the previous one
//! imaging-eval --dataset-file-path dataset.json --output-file-path output.json \
//!     --evaluation-file-path evaluation.json --threshold 0.3
//!
//! # Collapse density labels into present/absent for ROC
//! imaging-eval ... --binary-maps \
//!     '{"density": {"presentLabels": ["3", "4"], "absentLabels": ["1", "2"]}}'
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use imaging_eval::config::{parse_binary_maps, EvaluationConfig};
use imaging_eval::evaluator::evaluate;
use imaging_eval::loader::{
    load_dataset_from_file, load_output_from_file, load_previous_evaluation, write_report,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Medical-imaging model evaluation.
///
/// Compares classification, continuous, bounding-box and segmentation outputs
/// with the dataset's annotations and emits a metrics report.
#[derive(Parser)]
#[command(name = "imaging-eval", version, about)]
struct Cli {
    /// Ground-truth dataset (JSON list of studies)
    #[arg(long)]
    dataset_file_path: PathBuf,

    /// Model output document
    #[arg(long)]
    output_file_path: PathBuf,

    /// Where to write the report (printed to stdout when omitted)
    #[arg(long)]
    evaluation_file_path: Option<PathBuf>,

    /// Classification threshold for single-label outputs
    #[arg(long, default_value_t = 0.5)]
    threshold: f64,

    /// Binary label maps as JSON: {"<key>": {"presentLabels": [...], "absentLabels": [...]}}
    #[arg(long)]
    binary_maps: Option<String>,

    /// Reuse bounding-box overlap metrics from the report at the evaluation path (default)
    #[arg(long, overrides_with = "no_cache")]
    cache: bool,

    /// Recompute every metric
    #[arg(long, overrides_with = "cache")]
    no_cache: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = EvaluationConfig::new()
        .with_threshold(cli.threshold)
        .context("invalid --threshold")?;

    if let Some(json) = &cli.binary_maps {
        let maps = parse_binary_maps(json).context("invalid --binary-maps")?;
        config = config.with_binary_maps(maps);
    }

    let use_cache = cli.cache || !cli.no_cache;
    if let (Some(path), true) = (&cli.evaluation_file_path, use_cache) {
        let previous = load_previous_evaluation(path)
            .with_context(|| format!("failed to read previous evaluation {}", path.display()))?;
        if previous.is_some() {
            info!(path = %path.display(), "using previous evaluation as cache");
        }
        config = config.with_previous(previous);
    }

    let dataset = load_dataset_from_file(&cli.dataset_file_path)
        .with_context(|| format!("failed to load dataset {}", cli.dataset_file_path.display()))?;
    let output = load_output_from_file(&cli.output_file_path)
        .with_context(|| format!("failed to load output {}", cli.output_file_path.display()))?;

    let evaluation = evaluate(Some(&dataset), Some(&output), &config).context("evaluation failed")?;

    match &cli.evaluation_file_path {
        Some(path) => {
            write_report(path, &evaluation.report)
                .with_context(|| format!("failed to write report {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => {
            let json = serde_json::to_string_pretty(&evaluation.report)?;
            println!("{json}");
        }
    }

    Ok(())
}
