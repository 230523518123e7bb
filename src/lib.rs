//! # Civic311
//!
//! Service-request analytics for a municipal 311 export: a data pipeline
//! that aggregates requests and trains a completion classifier, an HTTP API
//! that serves both, and the dashboard logic that consumes them.
//!
//! ## Modules
//!
//! - [`pipeline`]: CSV cleaning, chart aggregation, model training
//! - [`prediction`]: Form inputs → completion likelihood
//! - [`api`]: REST API server with Axum
//! - [`dashboard`]: Dashboard page logic, HTTP client, and views
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use civic311::dashboard::{
//!     ClientConfig, Dashboard, HttpDashboardClient, PlotlyRenderer, TerminalView,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpDashboardClient::new(ClientConfig::new("http://localhost:5000/api"))?;
//!     let mut dashboard = Dashboard::new(
//!         client,
//!         TerminalView::new(std::io::stdout()),
//!         PlotlyRenderer::new(),
//!     );
//!
//!     // KPI cards, one data load, then charts or placeholders
//!     dashboard.init(chrono::Local::now()).await?;
//!     println!("{} charts rendered", dashboard.renderer().figures.len());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod dashboard;
pub mod pipeline;
pub mod prediction;

// Re-export top-level types for convenience
pub use api::{build_router, serve, ApiError, AppState};

pub use config::{generate_default_config, Config, ConfigError, LoggingConfig};

pub use dashboard::{
    ClientConfig, ClientError, Dashboard, DashboardApi, DashboardData, DashboardView,
    HttpDashboardClient, PredictionForm, PredictionResult,
};

pub use pipeline::{
    CompletionModel, ModelError, Pipeline, PipelineError, PipelineReport, ServiceRequest,
    TrainingConfig,
};

pub use prediction::{make_prediction, PredictionError};
