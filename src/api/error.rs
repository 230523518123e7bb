//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::prediction::PredictionError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body absent or not JSON
    #[error("No data provided")]
    NoData,

    /// Request validation failed
    #[error("{0}")]
    Validation(String),

    /// `insights.json` was not loaded at startup
    #[error("Dashboard data not available. Run the civic311 pipeline first.")]
    DashboardUnavailable,

    /// Categorical values requested without a payload
    #[error("Data not available")]
    DataUnavailable,

    /// `model.json` was not loaded at startup
    #[error("ML model not available. Run the civic311 pipeline first.")]
    ModelUnavailable,

    /// Prediction raised an error
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PredictionError> for ApiError {
    fn from(e: PredictionError) -> Self {
        match e {
            PredictionError::MissingFields(_) => ApiError::Validation(e.to_string()),
            PredictionError::Model(inner) => ApiError::Prediction(inner.to_string()),
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    pub request_id: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoData | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::DashboardUnavailable
            | ApiError::DataUnavailable
            | ApiError::ModelUnavailable
            | ApiError::Prediction(_)
            | ApiError::Internal(_)
            | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        // Log the error
        tracing::error!(
            request_id = %request_id,
            status = %status,
            error_message = %self,
            "API error occurred"
        );

        let body = ErrorResponse {
            status: "error",
            message: self.to_string(),
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
