//! Dashboard Routes
//!
//! - GET /api/dashboard-data - Chart payload produced by the pipeline
//! - GET /api/categorical-values - Values for the prediction form lists

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::CategoricalResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::dashboard::payload::DashboardResponse;

/// GET /api/dashboard-data
///
/// `last_updated` is the pipeline's generation time when recorded,
/// otherwise the current time.
pub async fn dashboard_data(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<DashboardResponse>> {
    let data = state
        .dashboard
        .as_ref()
        .ok_or(ApiError::DashboardUnavailable)?;

    let last_updated = data
        .generated_at
        .clone()
        .unwrap_or_else(|| chrono::Local::now().to_rfc3339());

    Ok(Json(DashboardResponse {
        status: "success".to_string(),
        data: Some(data.clone()),
        last_updated: Some(last_updated),
        message: None,
    }))
}

/// GET /api/categorical-values
pub async fn categorical_values(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CategoricalResponse>> {
    let data = state.dashboard.as_ref().ok_or(ApiError::DataUnavailable)?;

    Ok(Json(CategoricalResponse {
        status: "success".to_string(),
        data: data.categorical_values.clone().unwrap_or_default(),
    }))
}
