//! Data Transfer Objects
//!
//! Response types for the API endpoints that are not shared with the
//! dashboard client. The dashboard payload and prediction envelopes live in
//! [`crate::dashboard::payload`].

use serde::Serialize;
use std::collections::BTreeMap;

use crate::dashboard::payload::CategoricalValues;

// ============================================
// CATEGORICAL VALUES
// ============================================

/// `GET /api/categorical-values`
#[derive(Debug, Serialize)]
pub struct CategoricalResponse {
    pub status: String,
    pub data: CategoricalValues,
}

// ============================================
// HEALTH
// ============================================

/// `GET /api/health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests
    pub status: String,
    /// Local time, ISO 8601
    pub timestamp: String,
    pub chart_data_available: bool,
    pub ml_model_available: bool,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
    pub message: String,
}

/// `GET /`
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}
