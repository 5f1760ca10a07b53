//! Trip-cost trainer CLI
//!
//! One-shot batch run: fetch, preprocess, train, export, report.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use tripcost_trainer::{run, DistillConfig, RunConfig, SupabaseClient};

#[derive(Parser, Debug)]
#[command(name = "tripcost-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train the trip-cost Random Forest and export its portable approximation", long_about = None)]
struct Args {
    /// Minimum recommended training samples; fewer only warns
    #[arg(long, default_value = "100")]
    min_samples: usize,

    /// Output directory for the exported model and metadata
    #[arg(short, long, default_value = "models/tripcost")]
    output_dir: PathBuf,

    /// Number of trees in the Random Forest
    #[arg(long, default_value = "100")]
    trees: usize,

    /// Maximum depth of each tree
    #[arg(long, default_value = "10")]
    max_depth: usize,

    /// Random seed for the split, the resamples, and the distillation
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("tripcost trainer v{}", env!("CARGO_PKG_VERSION"));

    // Credentials are checked before any other work.
    let client = SupabaseClient::from_env().context("Supabase configuration missing")?;

    let config = RunConfig {
        min_samples: args.min_samples,
        output_dir: args.output_dir,
        trees: args.trees,
        max_depth: args.max_depth,
        seed: args.seed,
        distill: DistillConfig::default(),
    };

    run(&client, &config).context("training run failed")?;
    Ok(())
}
