//! Dashboard API Client
//!
//! HTTP client for the two calls the dashboard makes: one data fetch and
//! one prediction post. No retries; a failed call is reported once.

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use thiserror::Error;

use super::payload::{
    DashboardData, DashboardResponse, ErrorEnvelope, PredictionForm, PredictionResponse,
    PredictionResult,
};

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";

/// A successfully loaded dashboard payload
#[derive(Debug, Clone)]
pub struct LoadedDashboard {
    pub data: DashboardData,
    pub last_updated: Option<String>,
}

/// The backend as seen by the dashboard
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// `GET {base}/dashboard-data`
    async fn dashboard_data(&self) -> Result<LoadedDashboard, ClientError>;

    /// `POST {base}/predict-completion`
    async fn predict_completion(&self, form: &PredictionForm)
        -> Result<PredictionResult, ClientError>;
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL including the `/api` prefix
    pub base_url: String,
    /// Per-request timeout. `None` waits for the server indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`DashboardApi`]
pub struct HttpDashboardClient {
    client: Client,
    base_url: String,
}

impl HttpDashboardClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            // Normalize: remove trailing slash
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Fetch the raw health document
    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(ClientError::from_send)?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardClient {
    async fn dashboard_data(&self) -> Result<LoadedDashboard, ClientError> {
        let url = self.endpoint("dashboard-data");
        tracing::debug!(%url, "Fetching dashboard data");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ClientError::from_send)?;

        let response = check_status(response).await?;
        let body: DashboardResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        match (body.status.as_str(), body.data) {
            ("success", Some(data)) => Ok(LoadedDashboard {
                data,
                last_updated: body.last_updated,
            }),
            ("success", None) => Err(ClientError::Decode(
                "success response without data".to_string(),
            )),
            _ => Err(ClientError::Backend(
                body.message
                    .unwrap_or_else(|| "Failed to load data".to_string()),
            )),
        }
    }

    async fn predict_completion(
        &self,
        form: &PredictionForm,
    ) -> Result<PredictionResult, ClientError> {
        let url = self.endpoint("predict-completion");
        tracing::debug!(%url, service_type = %form.service_type, "Requesting prediction");

        let response = self
            .client
            .post(&url)
            .json(form)
            .send()
            .await
            .map_err(ClientError::from_send)?;

        let response = check_status(response).await?;
        let body: PredictionResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        match (body.status.as_str(), body.prediction) {
            ("success", Some(prediction)) => Ok(prediction),
            ("success", None) => Err(ClientError::Decode(
                "success response without prediction".to_string(),
            )),
            _ => Err(ClientError::Backend(
                body.message
                    .unwrap_or_else(|| "Prediction failed".to_string()),
            )),
        }
    }
}

/// Turn a non-2xx response into an error, keeping the server's message
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorEnvelope>()
        .await
        .ok()
        .map(|body| body.message);

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Errors surfaced by the dashboard client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Backend not available")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error! status: {status}{}", .message.as_deref().map(|m| format!(" ({})", m)).unwrap_or_default())]
    Status { status: u16, message: Option<String> },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("{0}")]
    Backend(String),
}

impl ClientError {
    fn from_send(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_connect() {
            ClientError::Unavailable
        } else {
            ClientError::Request(e)
        }
    }
}
