//! Completion Prediction
//!
//! Maps a submitted form onto model inputs and formats the result the way
//! the dashboard displays it.

use thiserror::Error;

use crate::dashboard::payload::{DisplayValue, PredictionForm, PredictionResult};
use crate::pipeline::{CompletionModel, ModelError, ModelInput};

/// Factors returned with a prediction
pub const MAX_FACTORS: usize = 5;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Representative hour for a time-of-day choice
pub fn hour_for(time_of_day: &str) -> u32 {
    match time_of_day.trim().to_lowercase().as_str() {
        "morning" => 9,
        "afternoon" => 14,
        "evening" => 19,
        "night" => 2,
        _ => 12,
    }
}

/// Weekday index (Monday = 0) for a day name
pub fn weekday_for(day_of_week: &str) -> u32 {
    match day_of_week.trim().to_lowercase().as_str() {
        "monday" => 0,
        "tuesday" => 1,
        "wednesday" => 2,
        "thursday" => 3,
        "friday" => 4,
        "saturday" => 5,
        "sunday" => 6,
        _ => 1,
    }
}

pub fn outcome_label(probability: f64) -> &'static str {
    if probability >= 70.0 {
        "Highly Likely to be Completed"
    } else if probability >= 50.0 {
        "Likely to be Completed"
    } else if probability >= 30.0 {
        "May be Completed"
    } else {
        "Unlikely to be Completed"
    }
}

/// Predict completion for `form`, using `month` (1-12) as the request month
pub fn make_prediction(
    model: &CompletionModel,
    form: &PredictionForm,
    month: u32,
) -> Result<PredictionResult, PredictionError> {
    let missing = form.missing_required();
    if !missing.is_empty() {
        return Err(PredictionError::MissingFields(missing));
    }

    let input = ModelInput {
        service_type: form.service_type.trim(),
        division: form.division.trim(),
        ward: form.ward.trim(),
        month,
        weekday: weekday_for(&form.day_of_week),
        hour: hour_for(&form.time_of_day),
    };
    let features = model.encode(&input);
    let [not_completed, completed] = model.predict_proba(&features)?;

    let probability = completed * 100.0;
    let confidence = not_completed.max(completed) * 100.0;

    tracing::debug!(
        service_type = input.service_type,
        ward = input.ward,
        probability,
        "Prediction made"
    );

    Ok(PredictionResult {
        completion_probability: DisplayValue::fixed(probability, 1),
        prediction: outcome_label(probability).to_string(),
        confidence: DisplayValue::fixed(confidence, 1),
        factors: generate_factors(form, probability),
    })
}

/// Human-readable factors behind a prediction
pub fn generate_factors(form: &PredictionForm, probability: f64) -> Vec<String> {
    let mut factors = Vec::new();

    let fields = [
        ("Service Type", form.service_type.trim().to_string()),
        ("Ward", form.ward.trim().to_string()),
        ("Division", form.division.trim().to_string()),
        ("Time of Day", title_case(&form.time_of_day)),
        ("Day of Week", title_case(&form.day_of_week)),
    ];
    for (name, value) in fields {
        if !value.is_empty() {
            factors.push(format!("{name}: {value}"));
        }
    }

    if probability > 80.0 {
        factors.push("Historical data shows high completion rate for similar requests".into());
    } else if probability > 60.0 {
        factors.push("Moderate completion likelihood based on patterns".into());
    } else if probability < 40.0 {
        factors.push("Lower completion rate - may need follow-up".into());
    }

    factors.truncate(MAX_FACTORS);
    factors
}

/// Upper-case the first letter of each word, lower-case the rest.
/// A word starts after any non-letter, so `late-night` becomes `Late-Night`.
pub fn title_case(text: &str) -> String {
    let mut titled = String::with_capacity(text.len());
    let mut word_start = true;

    for c in text.trim().chars() {
        if word_start {
            titled.extend(c.to_uppercase());
        } else {
            titled.extend(c.to_lowercase());
        }
        word_start = !c.is_alphabetic();
    }

    titled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ServiceRequest, TrainingConfig};
    use chrono::NaiveDate;

    fn model() -> CompletionModel {
        let mut records = Vec::new();
        for i in 0..80u32 {
            let created = NaiveDate::from_ymd_opt(2025, 3, 1 + i % 28)
                .unwrap()
                .and_hms_opt(i % 24, 0, 0)
                .unwrap();
            for (service_type, status) in [("Pothole", "Completed"), ("Noise", "Cancelled")] {
                records.push(ServiceRequest {
                    created,
                    status: status.into(),
                    service_type: service_type.into(),
                    division: "Transportation Services".into(),
                    ward: "Ward A".into(),
                });
            }
        }
        CompletionModel::train(&records, &TrainingConfig::default()).unwrap()
    }

    #[test]
    fn test_hour_and_weekday_mapping() {
        assert_eq!(hour_for("Morning"), 9);
        assert_eq!(hour_for("night"), 2);
        assert_eq!(hour_for(""), 12);
        assert_eq!(weekday_for("Sunday"), 6);
        assert_eq!(weekday_for("someday"), 1);
    }

    #[test]
    fn test_outcome_thresholds() {
        assert_eq!(outcome_label(70.0), "Highly Likely to be Completed");
        assert_eq!(outcome_label(69.9), "Likely to be Completed");
        assert_eq!(outcome_label(30.0), "May be Completed");
        assert_eq!(outcome_label(29.9), "Unlikely to be Completed");
    }

    #[test]
    fn test_factors_order_and_limit() {
        let form = PredictionForm::new("Pothole", "Ward A", "Transportation Services")
            .time_of_day("morning")
            .day_of_week("MONDAY");

        let factors = generate_factors(&form, 90.0);
        assert_eq!(
            factors,
            vec![
                "Service Type: Pothole",
                "Ward: Ward A",
                "Division: Transportation Services",
                "Time of Day: Morning",
                "Day of Week: Monday",
            ]
        );
    }

    #[test]
    fn test_factors_include_insight_when_room() {
        let form = PredictionForm::new("Noise", "Ward A", "MLS");
        let factors = generate_factors(&form, 20.0);

        assert_eq!(factors.len(), 4);
        assert_eq!(factors[3], "Lower completion rate - may need follow-up");
        // 40-60 adds no insight
        assert_eq!(generate_factors(&form, 50.0).len(), 3);
    }

    #[test]
    fn test_make_prediction() {
        let model = model();
        let form = PredictionForm::new("Pothole", "Ward A", "Transportation Services")
            .time_of_day("afternoon");

        let result = make_prediction(&model, &form, 3).unwrap();
        let probability = result.completion_probability.as_f64().unwrap();
        assert!(probability > 70.0);
        assert_eq!(result.prediction, "Highly Likely to be Completed");
        // One decimal place
        assert_eq!(result.completion_probability.as_str().split('.').nth(1).map(str::len), Some(1));
        assert!(result.confidence.as_f64().unwrap() >= 50.0);
    }

    #[test]
    fn test_make_prediction_requires_fields() {
        let form = PredictionForm::new("Pothole", " ", "");
        let err = make_prediction(&model(), &form, 3).unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: ward, division");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("eVENING"), "Evening");
        assert_eq!(title_case("late night"), "Late Night");
        assert_eq!(title_case(""), "");
        assert_eq!(title_case("late-night"), "Late-Night");
        assert_eq!(title_case("  monday "), "Monday");
    }
}
