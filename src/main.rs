//! Command-line entry point: runs the full pipeline on one input file.

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use marketprep::{Pipeline, PipelineConfig, config::DEFAULT_CUTOFF};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "marketprep")]
#[command(about = "Build a model-ready feature dataset from raw marketplace records", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON array of raw records
    #[arg(long)]
    input: PathBuf,

    /// Directory receiving train_data.csv, test_data.csv and scaler_params.json
    #[arg(long)]
    output: PathBuf,

    /// Rows dated before this day are train, the rest test
    #[arg(long, env = "CUTOFF_DATE", default_value = DEFAULT_CUTOFF)]
    cutoff: NaiveDate,

    /// Minimum number of aggregated records per product
    #[arg(long, env = "MIN_HISTORY", default_value_t = 14)]
    min_history: usize,

    /// Skip standardization and the scaler artifact
    #[arg(long)]
    no_normalize: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Pipeline failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = PipelineConfig::default()
        .with_cutoff(cli.cutoff)
        .with_min_history(cli.min_history)
        .with_normalize(!cli.no_normalize);

    let output = Pipeline::new(config)
        .run(&cli.input)
        .with_context(|| format!("processing {}", cli.input.display()))?;

    let written = output
        .write_to(&cli.output)
        .with_context(|| format!("writing results to {}", cli.output.display()))?;

    for path in &written {
        info!(path = %path.display(), "Wrote artifact");
    }
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}
