//! Civic311 API Server
//!
//! Run with: cargo run --bin civic311-api
//!
//! # Configuration
//!
//! Settings come from the config file (see `civic311-cli config`) with
//! environment overrides:
//! - `CIVIC311_API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `CIVIC311_API_PORT`: Port to listen on (default: 5000)
//! - `CIVIC311_DATA_DIR`: Directory holding insights.json and model.json
//! - `CIVIC311_LOG_LEVEL`, `CIVIC311_LOG_FORMAT`: Logging
//! - `RUST_LOG`: Filter directives, takes precedence over the level

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use civic311::{serve, AppState, Config};

#[derive(Parser)]
#[command(name = "civic311-api")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve dashboard data and completion predictions")]
struct Args {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides [api] port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::resolve(args.config.as_deref()).context("Failed to load config")?;
    if let Some(port) = args.port {
        config.api.port = port;
    }

    config
        .logging
        .init()
        .context("Failed to initialize logging")?;

    tracing::info!("Starting Civic311 API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Data directory: {:?}", config.data.processed_dir);

    let state = AppState::load(&config.data, config.api.clone());
    tracing::info!("Chart data available: {}", state.has_dashboard());
    tracing::info!("ML model available: {}", state.has_model());
    if !state.has_dashboard() || !state.has_model() {
        tracing::warn!("Run the civic311 pipeline to produce the missing artifacts");
    }

    tracing::info!("Starting server on {}", config.api.addr());
    serve(state).await.context("API server failed")?;

    tracing::info!("Civic311 API server stopped");
    Ok(())
}
