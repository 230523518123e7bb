//! Prediction Routes
//!
//! - POST /api/predict-completion - Completion likelihood for a request

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Datelike;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::dashboard::payload::{PredictionForm, PredictionResponse};
use crate::prediction::make_prediction;

/// POST /api/predict-completion
///
/// The request month is taken from the server clock.
pub async fn predict_completion(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PredictionForm>, JsonRejection>,
) -> ApiResult<Json<PredictionResponse>> {
    let model = state.model.as_ref().ok_or(ApiError::ModelUnavailable)?;

    let Json(form) = body.map_err(|e| {
        tracing::debug!(error = %e, "Rejected prediction body");
        ApiError::NoData
    })?;

    let month = chrono::Local::now().month();
    let prediction = make_prediction(model, &form, month)?;

    tracing::info!(
        service_type = %form.service_type,
        ward = %form.ward,
        probability = %prediction.completion_probability,
        "Prediction served"
    );

    Ok(Json(PredictionResponse {
        status: "success".to_string(),
        prediction: Some(prediction),
        message: None,
    }))
}
