//! Application State
//!
//! Shared state accessible by all API handlers. Artifacts are loaded once
//! at startup and never change afterwards.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{ApiConfig, DataConfig};
use crate::dashboard::payload::DashboardData;
use crate::pipeline::CompletionModel;

/// Shared application state for all handlers
pub struct AppState {
    /// Dashboard payload from `insights.json`
    pub dashboard: Option<DashboardData>,
    /// Classifier from `model.json`
    pub model: Option<CompletionModel>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        dashboard: Option<DashboardData>,
        model: Option<CompletionModel>,
        config: ApiConfig,
    ) -> Self {
        Self {
            dashboard,
            model,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Load both artifacts from the processed directory. A missing or
    /// unreadable artifact leaves its slot empty.
    pub fn load(data: &DataConfig, config: ApiConfig) -> Self {
        let insights_path = data.insights_path();
        let dashboard = match std::fs::read_to_string(&insights_path)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                serde_json::from_str::<DashboardData>(&json).map_err(|e| e.to_string())
            }) {
            Ok(data) => {
                tracing::info!("Dashboard data loaded from {:?}", insights_path);
                Some(data)
            }
            Err(e) => {
                tracing::warn!("Dashboard data not available at {:?}: {}", insights_path, e);
                None
            }
        };

        let model_path = data.model_path();
        let model = match CompletionModel::load(&model_path) {
            Ok(model) => {
                tracing::info!(
                    features = model.feature_count(),
                    "ML model loaded from {:?}",
                    model_path
                );
                Some(model)
            }
            Err(e) => {
                tracing::warn!("ML model not available: {}", e);
                None
            }
        };

        Self::new(dashboard, model, config)
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn has_dashboard(&self) -> bool {
        self.dashboard.is_some()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }
}
