//! Data Pipeline
//!
//! Turns the raw 311 export into the two artifacts the API serves:
//! `insights.json` (the dashboard payload) and `model.json` (the
//! completion classifier).
//!
//! ## Stages
//!
//! 1. **Records**: load and clean the CSV
//! 2. **Aggregate**: compute chart groups and summary tables
//! 3. **Model**: train and evaluate the classifier
//! 4. **Write**: persist both artifacts to the processed directory

pub mod aggregate;
pub mod model;
pub mod records;

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dashboard::payload::{DashboardData, DateRange};
pub use model::{CompletionModel, ModelError, ModelInput, ModelMetrics, TrainingConfig};
pub use records::{LoadReport, ServiceRequest};

pub const INSIGHTS_FILE: &str = "insights.json";
pub const MODEL_FILE: &str = "model.json";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to access {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("No usable records in the export")]
    NoData,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

/// What a pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub records: usize,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub insights_path: PathBuf,
    /// `None` when the export could not train a model
    pub model_path: Option<PathBuf>,
    pub metrics: Option<ModelMetrics>,
}

/// Pipeline runner
pub struct Pipeline {
    raw_csv: PathBuf,
    processed_dir: PathBuf,
    training: TrainingConfig,
}

impl Pipeline {
    pub fn new(raw_csv: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_csv: raw_csv.into(),
            processed_dir: processed_dir.into(),
            training: TrainingConfig::default(),
        }
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    /// Run every stage and write the artifacts.
    ///
    /// The chart payload is always written. When the export cannot train a
    /// classifier (a single outcome, for instance) the payload goes out
    /// without feature importance and `model.json` is not written.
    pub fn run(&self) -> Result<PipelineReport, PipelineError> {
        tracing::info!(path = %self.raw_csv.display(), "Loading raw export");
        let report = records::load_path(&self.raw_csv)?;
        if report.records.is_empty() {
            return Err(PipelineError::NoData);
        }

        let model = match CompletionModel::train(&report.records, &self.training) {
            Ok(model) => Some(model),
            Err(ModelError::InsufficientData(reason)) => {
                tracing::warn!("Skipping model training: {}", reason);
                None
            }
            Err(e) => return Err(e.into()),
        };
        let payload = build_payload(&report.records, model.as_ref());

        std::fs::create_dir_all(&self.processed_dir).map_err(|error| PipelineError::Io {
            path: self.processed_dir.clone(),
            error,
        })?;

        let insights_path = self.processed_dir.join(INSIGHTS_FILE);
        let json = serde_json::to_string_pretty(&payload)?;
        std::fs::write(&insights_path, json).map_err(|error| PipelineError::Io {
            path: insights_path.clone(),
            error,
        })?;

        let model_path = match &model {
            Some(model) => {
                let path = self.processed_dir.join(MODEL_FILE);
                model.save(&path)?;
                Some(path)
            }
            None => None,
        };

        tracing::info!(
            insights = %insights_path.display(),
            model = ?model_path,
            "Pipeline complete"
        );

        Ok(PipelineReport {
            records: report.records.len(),
            rows_read: report.rows_read,
            rows_dropped: report.rows_read - report.records.len(),
            insights_path,
            model_path,
            metrics: model.map(|m| m.metrics),
        })
    }
}

/// Assemble the dashboard payload from cleaned records
pub fn build_payload(
    records: &[ServiceRequest],
    model: Option<&CompletionModel>,
) -> DashboardData {
    let charts = aggregate::chart_data(records);

    let date_range = records
        .iter()
        .map(|r| r.date())
        .min()
        .zip(records.iter().map(|r| r.date()).max())
        .map(|(start, end)| DateRange {
            start: start.format("%Y-%m-%d").to_string(),
            end: end.format("%Y-%m-%d").to_string(),
        });

    DashboardData {
        generated_at: Some(chrono::Utc::now().to_rfc3339()),
        total_records: Some(records.len() as u64),
        date_range,
        time_series: Some(charts.time_series),
        ward_distribution: Some(charts.ward_distribution),
        status_distribution: Some(charts.status_distribution),
        service_types: Some(charts.service_types),
        division_distribution: Some(charts.division_distribution),
        hourly_pattern: Some(charts.hourly_pattern),
        feature_importance: model.map(CompletionModel::feature_importance),
        categorical_values: Some(aggregate::categorical_values(records)),
        success_factors: Some(aggregate::success_factors(records)),
        weekday_distribution: Some(aggregate::weekday_distribution(records)),
        summary: Some(aggregate::summary(records)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_export(dir: &Path) -> PathBuf {
        let mut csv = String::from(
            "Creation Date,Status,First 3 Chars of Postal Code,Ward,Service Request Type,Division\n",
        );
        for i in 0..60 {
            let (service_type, status) = if i % 2 == 0 {
                ("Pothole", "Completed")
            } else {
                ("Noise", "Cancelled")
            };
            csv.push_str(&format!(
                "2025-01-{:02} {:02}:00:00,{},M5V,Ward {},{},Transportation Services\n",
                1 + i % 28,
                i % 24,
                status,
                i % 3,
                service_type
            ));
        }
        let path = dir.join("SR2025.csv");
        std::fs::write(&path, csv).unwrap();
        path
    }

    #[test]
    fn test_run_writes_artifacts() {
        let dir = tempdir().unwrap();
        let raw = write_export(dir.path());
        let out = dir.path().join("processed");

        let report = Pipeline::new(&raw, &out).run().unwrap();
        assert_eq!(report.records, 60);
        assert_eq!(report.rows_dropped, 0);
        assert!(report.insights_path.exists());
        let model_path = report.model_path.clone().unwrap();
        assert!(model_path.exists());

        let json = std::fs::read_to_string(&report.insights_path).unwrap();
        let payload: DashboardData = serde_json::from_str(&json).unwrap();
        assert_eq!(payload.total_records, Some(60));
        assert!(payload.feature_importance.is_some());
        assert_eq!(payload.hourly_pattern.unwrap().counts.len(), 24);

        let model = CompletionModel::load(&model_path).unwrap();
        assert_eq!(Some(model.metrics), report.metrics);
    }

    #[test]
    fn test_single_outcome_export_still_writes_chart_data() {
        let dir = tempdir().unwrap();
        let mut csv = String::from(
            "Creation Date,Status,First 3 Chars of Postal Code,Ward,Service Request Type,Division\n",
        );
        for i in 0..40 {
            csv.push_str(&format!(
                "2025-01-{:02} 09:00:00,Completed,M5V,Ward {},Pothole,Transportation Services\n",
                1 + i % 28,
                i % 3
            ));
        }
        let raw = dir.path().join("SR2025.csv");
        std::fs::write(&raw, csv).unwrap();
        let out = dir.path().join("processed");

        let report = Pipeline::new(&raw, &out).run().unwrap();
        assert_eq!(report.records, 40);
        assert!(report.model_path.is_none());
        assert!(report.metrics.is_none());
        assert!(!out.join(MODEL_FILE).exists());

        let json = std::fs::read_to_string(&report.insights_path).unwrap();
        let payload: DashboardData = serde_json::from_str(&json).unwrap();
        assert!(payload.feature_importance.is_none());
        assert!(payload.time_series.is_some());
        assert!(payload.status_distribution.is_some());
        assert_eq!(payload.total_records, Some(40));
    }

    #[test]
    fn test_empty_export_is_an_error() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("empty.csv");
        std::fs::write(&raw, "Creation Date,Status,Ward,Service Request Type,Division\n").unwrap();

        let err = Pipeline::new(&raw, dir.path().join("out")).run().unwrap_err();
        assert!(matches!(err, PipelineError::NoData));
    }

    #[test]
    fn test_missing_export() {
        let dir = tempdir().unwrap();
        let err = Pipeline::new(dir.path().join("absent.csv"), dir.path())
            .run()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn test_payload_without_model() {
        let payload = build_payload(&[], None);
        assert!(payload.feature_importance.is_none());
        assert!(payload.date_range.is_none());
        assert_eq!(payload.total_records, Some(0));
    }
}
