//! Health Routes
//!
//! - GET /api/health - Artifact availability and uptime
//! - GET / - Service description

use axum::{extract::State, Json};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::dto::{HealthResponse, RootResponse};
use crate::api::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Local::now().to_rfc3339(),
        chart_data_available: state.has_dashboard(),
        ml_model_available: state.has_model(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Backend ready for dynamic charts and ML predictions".to_string(),
    })
}

/// GET /
pub async fn root() -> Json<RootResponse> {
    let endpoints = BTreeMap::from([
        ("charts", "/api/dashboard-data"),
        ("prediction", "/api/predict-completion (POST)"),
        ("dropdowns", "/api/categorical-values"),
        ("health", "/api/health"),
    ]);

    Json(RootResponse {
        message: "Toronto 311 Dashboard API - Dynamic Charts & ML Predictions".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints,
    })
}
