//! Civic311 Pipeline
//!
//! Reads the raw service request export and writes `insights.json` and
//! `model.json` to the processed data directory.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use civic311::{Config, Pipeline};

#[derive(Parser)]
#[command(name = "civic311")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Process the 311 export into dashboard data and a completion model")]
struct Args {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Raw CSV export (overrides [data] raw_csv)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Processed data directory (overrides [data] processed_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Gradient descent epochs (overrides [training] epochs)
    #[arg(long)]
    epochs: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::resolve(args.config.as_deref()).context("Failed to load config")?;

    if let Some(input) = args.input {
        config.data.raw_csv = input;
    }
    if let Some(output) = args.output {
        config.data.processed_dir = output;
    }
    if let Some(epochs) = args.epochs {
        config.training.epochs = epochs;
    }

    config
        .logging
        .init()
        .context("Failed to initialize logging")?;

    tracing::info!("Civic311 pipeline v{}", env!("CARGO_PKG_VERSION"));

    let report = Pipeline::new(&config.data.raw_csv, &config.data.processed_dir)
        .with_training(config.training)
        .run()
        .with_context(|| format!("Pipeline failed for {:?}", config.data.raw_csv))?;

    println!("Processed {} of {} rows", report.records, report.rows_read);
    println!("  Dropped:   {}", report.rows_dropped);
    if let Some(metrics) = &report.metrics {
        println!("  Accuracy:  {:.4}", metrics.accuracy);
        println!("  Precision: {:.4}", metrics.precision);
        println!("  Recall:    {:.4}", metrics.recall);
        println!("  F1 score:  {:.4}", metrics.f1_score);
    }
    println!();
    println!("Dashboard data: {}", report.insights_path.display());
    match &report.model_path {
        Some(path) => println!("Model:          {}", path.display()),
        None => println!("Model:          not trained (export has a single outcome)"),
    }

    Ok(())
}
