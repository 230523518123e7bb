//! Dashboard View
//!
//! The page surface the dashboard writes into: text elements, autocomplete
//! lists, the loading overlay, the error modal, the predict button and the
//! prediction result panel.

use thiserror::Error;

use super::payload::{PredictionForm, PredictionResult};

/// Element ids the dashboard writes into
pub mod elements {
    pub const TOTAL_REQUESTS: &str = "totalRequests";
    pub const COMPLETION_RATE: &str = "completionRate";
    pub const TOP_WARD: &str = "topWard";
    pub const TOP_SERVICE_TYPE: &str = "topServiceType";

    pub const ML_ACCURACY: &str = "mlAccuracy";
    pub const ML_PRECISION: &str = "mlPrecision";
    pub const ML_RECALL: &str = "mlRecall";
    pub const ML_F1_SCORE: &str = "mlF1Score";

    pub const BEST_SERVICE_TYPE: &str = "bestServiceType";
    pub const BEST_WARD: &str = "bestWard";
    pub const BEST_DIVISION: &str = "bestDivision";
    pub const BEST_TIME: &str = "bestTime";

    pub const DATA_STATUS: &str = "dataStatus";
    pub const LAST_UPDATED: &str = "lastUpdated";

    pub const SERVICE_TYPE_LIST: &str = "serviceTypeList";
    pub const WARD_LIST: &str = "wardList";
    pub const DIVISION_LIST: &str = "divisionList";
}

/// Status line texts
pub const STATUS_LOADED: &str = "Dashboard Loaded";
pub const STATUS_CONNECTED: &str = "Connected to Backend";
pub const STATUS_UNAVAILABLE: &str = "Backend Not Available";

/// State of the predict button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    /// Enabled, waiting for a click
    Idle,
    /// Disabled while a prediction is in flight
    Busy,
}

impl ButtonState {
    pub fn label(&self) -> &'static str {
        match self {
            ButtonState::Idle => "Predict Completion",
            ButtonState::Busy => "Predicting...",
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, ButtonState::Idle)
    }
}

/// Page surface driven by [`Dashboard`](super::Dashboard)
pub trait DashboardView {
    /// Replace the text of an element. Unknown elements are ignored.
    fn set_text(&mut self, element: &str, text: &str);

    /// Replace the options of an autocomplete list
    fn set_datalist(&mut self, list: &str, options: &[String]);

    /// Show or hide the loading overlay
    fn set_loading(&mut self, active: bool);

    /// Show the error modal with a message
    fn show_error(&mut self, message: &str);

    /// Hide the error modal
    fn hide_error(&mut self);

    fn set_predict_button(&mut self, state: ButtonState);

    /// Hide the result placeholder and show the prediction panel
    fn show_prediction(&mut self, display: &PredictionDisplay);
}

/// Prediction fields formatted for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionDisplay {
    pub probability: String,
    pub outcome: String,
    pub confidence: String,
    pub factors: Vec<String>,
}

impl From<&PredictionResult> for PredictionDisplay {
    fn from(result: &PredictionResult) -> Self {
        Self {
            probability: format!("{}%", result.completion_probability),
            outcome: result.prediction.clone(),
            confidence: format!("{}%", result.confidence),
            factors: result.factors.clone(),
        }
    }
}

/// Prediction form validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Please fill in Service Type, Ward, and Division")]
    MissingRequired(Vec<&'static str>),
}

impl PredictionForm {
    /// Check that service type, ward and division are filled in
    pub fn validate(&self) -> Result<(), FormError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FormError::MissingRequired(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::payload::DisplayValue;

    #[test]
    fn test_prediction_display_formatting() {
        let result = PredictionResult {
            completion_probability: DisplayValue::new("73"),
            prediction: "Completed".to_string(),
            confidence: DisplayValue::new("88"),
            factors: vec!["Weekday".to_string(), "Morning".to_string()],
        };

        let display = PredictionDisplay::from(&result);
        assert_eq!(display.probability, "73%");
        assert_eq!(display.outcome, "Completed");
        assert_eq!(display.confidence, "88%");
        assert_eq!(display.factors, vec!["Weekday", "Morning"]);
    }

    #[test]
    fn test_validate_requires_three_fields() {
        assert!(PredictionForm::new("Noise", "Ward 1", "Bylaw").validate().is_ok());

        let err = PredictionForm::new("Noise", "", "Bylaw").validate().unwrap_err();
        assert_eq!(err, FormError::MissingRequired(vec!["ward"]));
        assert_eq!(err.to_string(), "Please fill in Service Type, Ward, and Division");
    }

    #[test]
    fn test_button_labels() {
        assert!(ButtonState::Idle.is_enabled());
        assert!(!ButtonState::Busy.is_enabled());
        assert_eq!(ButtonState::Busy.label(), "Predicting...");
    }
}
