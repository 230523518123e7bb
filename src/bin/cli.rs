//! Civic311 CLI
//!
//! Command-line interface to a running Civic311 API:
//! - Render the dashboard in the terminal or as Plotly figures
//! - Request a completion prediction
//! - Check backend health
//! - Generate or show configuration

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

use civic311::dashboard::{
    ChartRenderer, Dashboard, HttpDashboardClient, PlotlyRenderer,
    PredictionOutcome, TerminalRenderer, TerminalView,
};
use civic311::{Config, PredictionForm};

#[derive(Parser)]
#[command(name = "civic311-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Toronto 311 service request dashboard")]
#[command(long_about = "Civic311 shows 311 service request trends and predicts whether a new\nrequest is likely to be completed.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API base URL, including the /api prefix (overrides [client] base_url)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the dashboard and draw every chart
    Dashboard {
        /// Print Plotly figure JSON instead of text charts
        #[arg(long)]
        plotly: bool,
    },

    /// Predict whether a request will be completed
    Predict {
        /// Service request type
        #[arg(short, long, default_value = "")]
        service_type: String,
        /// Ward name
        #[arg(short, long, default_value = "")]
        ward: String,
        /// Division name
        #[arg(short, long, default_value = "")]
        division: String,
        /// First three characters of the postal code
        #[arg(long, default_value = "")]
        postal_code: String,
        /// morning, afternoon, evening, or night
        #[arg(short, long, default_value = "")]
        time_of_day: String,
        /// Day name, e.g. monday
        #[arg(long, default_value = "")]
        day_of_week: String,
    },

    /// Show backend health
    Health,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the effective configuration instead of the template
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::resolve(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(url) = cli.api_url {
        config.client.base_url = url;
    }

    // Warnings only, so they do not interleave with command output
    config.logging.level = "warn".to_string();
    let _ = config.logging.init();

    let client_config = config.client.client_config();

    match cli.command {
        Commands::Dashboard { plotly } => {
            let client = HttpDashboardClient::new(client_config)?;

            if plotly {
                let (_, renderer) = run_dashboard(
                    client,
                    TerminalView::new(io::sink()),
                    PlotlyRenderer::new(),
                )
                .await;
                println!("{}", serde_json::to_string_pretty(&renderer.to_json())?);
            } else {
                let (mut view, mut renderer) = run_dashboard(
                    client,
                    TerminalView::new(io::stdout()),
                    TerminalRenderer::new(io::stdout()),
                )
                .await;
                renderer.take_error().context("Failed to write charts")?;
                println!();
                view.print_summary().context("Failed to write dashboard")?;
            }
        }

        Commands::Predict {
            service_type,
            ward,
            division,
            postal_code,
            time_of_day,
            day_of_week,
        } => {
            let form = PredictionForm::new(service_type, ward, division)
                .postal_code(postal_code)
                .time_of_day(time_of_day)
                .day_of_week(day_of_week);

            let client = HttpDashboardClient::new(client_config)?;
            let mut dashboard = Dashboard::new(
                client,
                TerminalView::new(io::stdout()),
                TerminalRenderer::new(io::sink()),
            );

            let outcome = dashboard.submit_prediction(&form).await;
            let (_, mut view, _) = dashboard.into_parts();
            view.take_error().context("Failed to write prediction")?;

            match outcome {
                PredictionOutcome::Displayed(_) => {}
                PredictionOutcome::Invalid(_) | PredictionOutcome::Failed(_) => {
                    std::process::exit(1);
                }
            }
        }

        Commands::Health => {
            let client = HttpDashboardClient::new(client_config)?;

            match client.health().await {
                Ok(health) => {
                    println!("Civic311 CLI v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!(
                        "API Status:    {}",
                        health["status"].as_str().unwrap_or("unknown")
                    );
                    println!("API Version:   {}", health["version"].as_str().unwrap_or("-"));
                    println!(
                        "Chart data:    {}",
                        availability(health["chart_data_available"].as_bool())
                    );
                    println!(
                        "ML model:      {}",
                        availability(health["ml_model_available"].as_bool())
                    );

                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Err(e) => {
                    eprintln!("Cannot connect to Civic311 API at {}", client.base_url());
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the API server is running:");
                    eprintln!("  cargo run --bin civic311-api");
                    std::process::exit(1);
                }
            }
        }

        Commands::Config { output, show } => {
            let content = if show {
                toml::to_string_pretty(&config).context("Failed to serialize config")?
            } else {
                civic311::generate_default_config()
            };

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &content)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", content);
                    io::stdout().flush()?;
                }
            }
        }
    }

    Ok(())
}

/// Run the page startup against the backend and hand back the surfaces
async fn run_dashboard<W: Write, R: ChartRenderer>(
    client: HttpDashboardClient,
    view: TerminalView<W>,
    renderer: R,
) -> (TerminalView<W>, R) {
    let mut dashboard = Dashboard::new(client, view, renderer);

    if let Err(e) = dashboard.init(chrono::Local::now()).await {
        eprintln!("Dashboard data unavailable: {}", e);
    }

    let (_, view, renderer) = dashboard.into_parts();
    (view, renderer)
}

fn availability(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => "available",
        Some(false) => "missing (run civic311)",
        None => "unknown",
    }
}

fn format_duration(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
