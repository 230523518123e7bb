//! Completion Model
//!
//! Logistic regression over one-hot encoded request categories plus scaled
//! temporal features. Trained with full-batch gradient descent using
//! balanced class weights, persisted as JSON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::aggregate::round_to;
use super::records::ServiceRequest;
use crate::dashboard::payload::FeatureImportance;

pub const SERVICE_TYPE_PREFIX: &str = "Service Request Type_";
pub const DIVISION_PREFIX: &str = "Division_";
pub const WARD_PREFIX: &str = "Ward_";
pub const NUMERIC_FEATURES: [&str; 3] = ["Month", "Weekday", "Hour"];

/// Features reported in the importance chart
pub const TOP_FEATURES: usize = 10;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Not enough data to train: {0}")]
    InsufficientData(String),

    #[error("Failed to access model file {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Invalid model file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Expected {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },
}

/// Gradient descent settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// L2 penalty applied to weights, not the bias
    pub l2: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 300,
            learning_rate: 0.5,
            l2: 1e-4,
        }
    }
}

/// Held-out evaluation of the positive (completed) class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub train_size: usize,
    pub test_size: usize,
}

/// Category levels for one input. The first (sorted) level is the
/// reference level and has no column of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    pub values: Vec<String>,
}

impl Levels {
    fn from_values<'a>(values: impl Iterator<Item = &'a str>) -> Self {
        let mut values: Vec<String> = values.map(str::to_string).collect();
        values.sort();
        values.dedup();
        Self { values }
    }

    /// Columns this input contributes
    fn width(&self) -> usize {
        self.values.len().saturating_sub(1)
    }

    /// Column offset within this input's block, `None` for the reference
    /// level or an unknown value
    fn column(&self, value: &str) -> Option<usize> {
        let value = value.trim();
        self.values
            .iter()
            .position(|v| v == value)
            .or_else(|| self.values.iter().position(|v| v.eq_ignore_ascii_case(value)))
            .and_then(|idx| idx.checked_sub(1))
    }

    fn names<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = String> + 'a {
        self.values.iter().skip(1).map(move |v| format!("{prefix}{v}"))
    }
}

/// Raw model inputs for a single request
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput<'a> {
    pub service_type: &'a str,
    pub division: &'a str,
    pub ward: &'a str,
    /// 1-12
    pub month: u32,
    /// Monday = 0
    pub weekday: u32,
    /// 0-23
    pub hour: u32,
}

impl<'a> From<&'a ServiceRequest> for ModelInput<'a> {
    fn from(record: &'a ServiceRequest) -> Self {
        Self {
            service_type: &record.service_type,
            division: &record.division,
            ward: &record.ward,
            month: record.month(),
            weekday: record.weekday(),
            hour: record.hour(),
        }
    }
}

/// Sparse encoding: active one-hot columns plus the numeric tail
#[derive(Debug, Clone)]
struct Encoded {
    active: Vec<usize>,
    numeric: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionModel {
    pub service_types: Levels,
    pub divisions: Levels,
    pub wards: Levels,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub metrics: ModelMetrics,
    pub trained_at: String,
}

impl CompletionModel {
    /// Train on cleaned records
    pub fn train(records: &[ServiceRequest], config: &TrainingConfig) -> Result<Self, ModelError> {
        if records.is_empty() {
            return Err(ModelError::InsufficientData("no records".into()));
        }

        let completed = records.iter().filter(|r| r.is_completed()).count();
        if completed == 0 || completed == records.len() {
            return Err(ModelError::InsufficientData(
                "records contain a single outcome".into(),
            ));
        }

        let mut model = Self {
            service_types: Levels::from_values(records.iter().map(|r| r.service_type.as_str())),
            divisions: Levels::from_values(records.iter().map(|r| r.division.as_str())),
            wards: Levels::from_values(records.iter().map(|r| r.ward.as_str())),
            weights: Vec::new(),
            bias: 0.0,
            metrics: ModelMetrics::default(),
            trained_at: chrono::Utc::now().to_rfc3339(),
        };
        model.weights = vec![0.0; model.feature_count()];

        let (train, test) = stratified_split(records);
        tracing::info!(
            train = train.len(),
            test = test.len(),
            features = model.feature_count(),
            "Training completion model"
        );

        let train_rows: Vec<(Encoded, f64)> = train
            .iter()
            .map(|r| (model.encode_sparse(&ModelInput::from(*r)), label(r)))
            .collect();
        model.fit(&train_rows, config);

        let eval = if test.is_empty() {
            tracing::warn!("Test split is empty, evaluating on training rows");
            &train
        } else {
            &test
        };
        model.metrics = model.evaluate(eval);
        model.metrics.train_size = train.len();
        model.metrics.test_size = test.len();

        tracing::info!(
            accuracy = model.metrics.accuracy,
            precision = model.metrics.precision,
            recall = model.metrics.recall,
            f1 = model.metrics.f1_score,
            "Model trained"
        );

        Ok(model)
    }

    fn fit(&mut self, rows: &[(Encoded, f64)], config: &TrainingConfig) {
        let n = rows.len() as f64;
        let positives = rows.iter().filter(|(_, y)| *y > 0.5).count() as f64;
        let negatives = n - positives;
        // Balanced weights: n / (classes * class_count)
        let class_weight = |y: f64| {
            if y > 0.5 {
                n / (2.0 * positives)
            } else {
                n / (2.0 * negatives)
            }
        };

        let width = self.weights.len();
        let mut grad = vec![0.0; width];

        for epoch in 0..config.epochs {
            grad.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_bias = 0.0;
            let mut loss = 0.0;

            for (row, y) in rows {
                let p = sigmoid(self.logit(row));
                let w = class_weight(*y);
                let err = w * (p - y);

                for &col in &row.active {
                    grad[col] += err;
                }
                let tail = width - NUMERIC_FEATURES.len();
                for (i, x) in row.numeric.iter().enumerate() {
                    grad[tail + i] += err * x;
                }
                grad_bias += err;

                let p = p.clamp(1e-12, 1.0 - 1e-12);
                loss -= w * (y * p.ln() + (1.0 - y) * (1.0 - p).ln());
            }

            for (weight, g) in self.weights.iter_mut().zip(&grad) {
                *weight -= config.learning_rate * (g / n + config.l2 * *weight);
            }
            self.bias -= config.learning_rate * grad_bias / n;

            if epoch % 50 == 0 {
                tracing::debug!(epoch, loss = loss / n, "Training progress");
            }
        }
    }

    fn evaluate(&self, records: &[&ServiceRequest]) -> ModelMetrics {
        let (mut tp, mut fp, mut tn, mut fn_) = (0usize, 0usize, 0usize, 0usize);
        for record in records {
            let [_, p] = self.predict_input(&ModelInput::from(*record));
            match (p >= 0.5, record.is_completed()) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, false) => tn += 1,
                (false, true) => fn_ += 1,
            }
        }

        let ratio = |num: usize, den: usize| {
            if den == 0 {
                0.0
            } else {
                num as f64 / den as f64
            }
        };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1_score = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        ModelMetrics {
            accuracy: ratio(tp + tn, records.len()),
            precision,
            recall,
            f1_score,
            ..Default::default()
        }
    }

    /// Total number of input columns
    pub fn feature_count(&self) -> usize {
        self.service_types.width()
            + self.divisions.width()
            + self.wards.width()
            + NUMERIC_FEATURES.len()
    }

    /// Column names in encoding order
    pub fn feature_names(&self) -> Vec<String> {
        self.service_types
            .names(SERVICE_TYPE_PREFIX)
            .chain(self.divisions.names(DIVISION_PREFIX))
            .chain(self.wards.names(WARD_PREFIX))
            .chain(NUMERIC_FEATURES.iter().map(|s| s.to_string()))
            .collect()
    }

    fn encode_sparse(&self, input: &ModelInput<'_>) -> Encoded {
        let division_offset = self.service_types.width();
        let ward_offset = division_offset + self.divisions.width();

        let active = [
            self.service_types.column(input.service_type),
            self.divisions
                .column(input.division)
                .map(|c| c + division_offset),
            self.wards.column(input.ward).map(|c| c + ward_offset),
        ]
        .into_iter()
        .flatten()
        .collect();

        Encoded {
            active,
            numeric: [
                input.month as f64 / 12.0,
                input.weekday as f64 / 6.0,
                input.hour as f64 / 23.0,
            ],
        }
    }

    /// Dense feature vector. Unknown category values leave their block at
    /// zero.
    pub fn encode(&self, input: &ModelInput<'_>) -> Vec<f64> {
        let sparse = self.encode_sparse(input);
        let mut dense = vec![0.0; self.feature_count()];
        for col in sparse.active {
            dense[col] = 1.0;
        }
        let tail = dense.len() - NUMERIC_FEATURES.len();
        dense[tail..].copy_from_slice(&sparse.numeric);
        dense
    }

    fn logit(&self, row: &Encoded) -> f64 {
        let tail = self.weights.len() - NUMERIC_FEATURES.len();
        let categorical: f64 = row.active.iter().map(|&c| self.weights[c]).sum();
        let numeric: f64 = row
            .numeric
            .iter()
            .zip(&self.weights[tail..])
            .map(|(x, w)| x * w)
            .sum();
        self.bias + categorical + numeric
    }

    /// `[P(not completed), P(completed)]` for a dense feature vector
    pub fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], ModelError> {
        if features.len() != self.weights.len() {
            return Err(ModelError::FeatureMismatch {
                expected: self.weights.len(),
                actual: features.len(),
            });
        }

        let z = self.bias
            + features
                .iter()
                .zip(&self.weights)
                .map(|(x, w)| x * w)
                .sum::<f64>();
        let p = sigmoid(z);
        Ok([1.0 - p, p])
    }

    /// `[P(not completed), P(completed)]` for raw inputs
    pub fn predict_input(&self, input: &ModelInput<'_>) -> [f64; 2] {
        let p = sigmoid(self.logit(&self.encode_sparse(input)));
        [1.0 - p, p]
    }

    /// Normalized absolute weights, largest first
    pub fn feature_importance(&self) -> FeatureImportance {
        let total: f64 = self.weights.iter().map(|w| w.abs()).sum();
        let mut ranked: Vec<(String, f64)> = self
            .feature_names()
            .into_iter()
            .zip(&self.weights)
            .map(|(name, w)| {
                let share = if total > 0.0 { w.abs() / total } else { 0.0 };
                (name, share)
            })
            .collect();

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(TOP_FEATURES);

        let (features, importance) = ranked
            .into_iter()
            .map(|(name, share)| (name, round_to(share, 4)))
            .unzip();

        FeatureImportance {
            features,
            importance,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|error| ModelError::Io {
            path: path.to_path_buf(),
            error,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(path).map_err(|error| ModelError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let model: Self = serde_json::from_str(&json)?;

        if model.weights.len() != model.feature_count() {
            return Err(ModelError::FeatureMismatch {
                expected: model.feature_count(),
                actual: model.weights.len(),
            });
        }
        Ok(model)
    }
}

fn label(record: &ServiceRequest) -> f64 {
    if record.is_completed() {
        1.0
    } else {
        0.0
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Deterministic 70/30 split that keeps class proportions: within each
/// class, every 8th, 9th and 10th record goes to the test set.
fn stratified_split(records: &[ServiceRequest]) -> (Vec<&ServiceRequest>, Vec<&ServiceRequest>) {
    let mut train = Vec::with_capacity(records.len());
    let mut test = Vec::with_capacity(records.len() / 3);
    let mut seen = [0usize; 2];

    for record in records {
        let class = usize::from(record.is_completed());
        if seen[class] % 10 >= 7 {
            test.push(record);
        } else {
            train.push(record);
        }
        seen[class] += 1;
    }

    (train, test)
}
