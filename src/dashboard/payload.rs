//! Payload Types
//!
//! Wire types shared by the API server and the dashboard consumer.
//! Every chart group is optional: an absent group means "skip that chart",
//! never an error.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;
use std::fmt;

// ============================================
// DASHBOARD PAYLOAD
// ============================================
//
// Chart values are kept as JSON numbers so that a producer writing `1.0`
// where we write `1` still decodes, and the value reaches the chart as sent.

/// The dashboard payload written by the pipeline and served by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    /// When the pipeline produced this payload (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    /// Number of cleaned records the payload was computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_series: Option<TimeSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward_distribution: Option<WardDistribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_distribution: Option<StatusDistribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_types: Option<ServiceTypes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division_distribution: Option<DivisionDistribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_pattern: Option<HourlyPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importance: Option<FeatureImportance>,

    /// Dropdown values for the prediction form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categorical_values: Option<CategoricalValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_factors: Option<SuccessFactors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekday_distribution: Option<WeekdayDistribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
}

/// First and last creation timestamp in the source data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// Requests per calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub dates: Vec<String>,
    pub counts: Vec<Number>,
}

/// Requests per ward (top wards only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardDistribution {
    pub wards: Vec<String>,
    pub counts: Vec<Number>,
}

/// Requests per status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDistribution {
    pub statuses: Vec<String>,
    pub counts: Vec<Number>,
}

/// Requests per service request type (top types only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTypes {
    pub types: Vec<String>,
    pub counts: Vec<Number>,
}

/// Requests per city division (top divisions only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionDistribution {
    pub divisions: Vec<String>,
    pub counts: Vec<Number>,
}

/// Requests per hour of day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPattern {
    pub hours: Vec<Number>,
    pub counts: Vec<Number>,
}

/// Most influential model features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub features: Vec<String>,
    pub importance: Vec<f64>,
}

/// Distinct values seen for each categorical input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoricalValues {
    #[serde(default)]
    pub service_types: Vec<String>,
    #[serde(default)]
    pub divisions: Vec<String>,
    #[serde(default)]
    pub wards: Vec<String>,
}

/// Best completion rate per dimension
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuccessFactors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<RankedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward: Option<RankedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<RankedValue>,
}

/// A categorical value with its completion rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedValue {
    pub name: String,
    /// Completion rate in percent
    pub completion_rate: f64,
    pub cases: u64,
}

/// Requests per day of week, Monday first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayDistribution {
    pub days: Vec<String>,
    pub counts: Vec<u64>,
}

/// Headline numbers computed by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_requests: u64,
    /// Completion rate in percent
    pub completion_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_ward: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_service_type: Option<String>,
}

/// Envelope returned by `GET /dashboard-data`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DashboardData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================
// PREDICTION
// ============================================

/// The six-field prediction request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionForm {
    pub service_type: String,
    pub ward: String,
    pub division: String,
    pub postal_code: String,
    pub time_of_day: String,
    pub day_of_week: String,
}

impl PredictionForm {
    /// Create a form with the three required fields set
    pub fn new(
        service_type: impl Into<String>,
        ward: impl Into<String>,
        division: impl Into<String>,
    ) -> Self {
        Self {
            service_type: service_type.into(),
            ward: ward.into(),
            division: division.into(),
            ..Default::default()
        }
    }

    pub fn postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = postal_code.into();
        self
    }

    pub fn time_of_day(mut self, time_of_day: impl Into<String>) -> Self {
        self.time_of_day = time_of_day.into();
        self
    }

    pub fn day_of_week(mut self, day_of_week: impl Into<String>) -> Self {
        self.day_of_week = day_of_week.into();
        self
    }

    /// Names of the required fields that are blank, in form order
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("service_type", &self.service_type),
            ("ward", &self.ward),
            ("division", &self.division),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Prediction returned by `POST /predict-completion`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub completion_probability: DisplayValue,
    pub prediction: String,
    pub confidence: DisplayValue,
    #[serde(default)]
    pub factors: Vec<String>,
}

/// Envelope returned by `POST /predict-completion`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error body shared by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: String,
    pub message: String,
}

// ============================================
// DISPLAY VALUE
// ============================================

/// A value shown verbatim in the UI.
///
/// The server sends percentages as preformatted strings (`"73.4"`), other
/// backends send plain numbers (`73`). Both are accepted and displayed
/// exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayValue(String);

impl DisplayValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Format a number with a fixed count of decimals
    pub fn fixed(value: f64, decimals: usize) -> Self {
        Self(format!("{:.*}", decimals, value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric reading of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DisplayValue {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl Serialize for DisplayValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DisplayValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => DisplayValue(text),
            Raw::Number(number) => DisplayValue(number.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_value_accepts_numbers_and_strings() {
        let result: PredictionResult = serde_json::from_str(
            r#"{"completion_probability": 73, "prediction": "Completed",
                "confidence": "88.5", "factors": []}"#,
        )
        .unwrap();

        assert_eq!(result.completion_probability.as_str(), "73");
        assert_eq!(result.confidence.as_str(), "88.5");
        assert_eq!(result.confidence.as_f64(), Some(88.5));
    }

    #[test]
    fn test_display_value_serializes_as_string() {
        let value = DisplayValue::fixed(73.44, 1);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#""73.4""#);
    }

    #[test]
    fn test_missing_groups_deserialize_as_none() {
        let data: DashboardData = serde_json::from_str(
            r#"{"time_series": {"dates": ["2025-01-01"], "counts": [4]}}"#,
        )
        .unwrap();

        assert!(data.time_series.is_some());
        assert!(data.ward_distribution.is_none());
        assert!(data.feature_importance.is_none());
    }

    #[test]
    fn test_float_counts_decode_and_pass_through() {
        let data: DashboardData = serde_json::from_str(
            r#"{"ward_distribution": {"wards": ["A", "B"], "counts": [1.0, 2]},
                "hourly_pattern": {"hours": [0.0, 1.5], "counts": [3, 4.25]}}"#,
        )
        .unwrap();

        let wards = data.ward_distribution.unwrap();
        assert_eq!(wards.counts[0].as_f64(), Some(1.0));
        assert_eq!(wards.counts[1].as_u64(), Some(2));
        assert_eq!(
            serde_json::to_string(&wards.counts).unwrap(),
            "[1.0,2]"
        );

        let hourly = data.hourly_pattern.unwrap();
        assert_eq!(hourly.hours[1].as_f64(), Some(1.5));
        assert_eq!(hourly.counts[1].as_f64(), Some(4.25));
    }

    #[test]
    fn test_form_missing_fields_default_to_empty() {
        let form: PredictionForm = serde_json::from_str(r#"{"ward": "Ward 10"}"#).unwrap();
        assert_eq!(form.ward, "Ward 10");
        assert_eq!(form.missing_required(), vec!["service_type", "division"]);
    }

    #[test]
    fn test_blank_fields_count_as_missing() {
        let form = PredictionForm::new("Noise", "   ", "Bylaw");
        assert_eq!(form.missing_required(), vec!["ward"]);
    }
}
