//! Chart Aggregation
//!
//! Computes the chart groups and supporting tables from cleaned records.

use serde_json::Number;
use std::collections::{BTreeMap, HashMap};

use super::records::ServiceRequest;
use crate::dashboard::payload::{
    CategoricalValues, DivisionDistribution, HourlyPattern, RankedValue, ServiceTypes,
    StatusDistribution, SuccessFactors, Summary, TimeSeries, WardDistribution,
    WeekdayDistribution,
};

/// Days kept in the time series
pub const TIME_SERIES_DAYS: usize = 30;
pub const TOP_WARDS: usize = 15;
pub const TOP_SERVICE_TYPES: usize = 15;
pub const TOP_DIVISIONS: usize = 10;
/// Minimum requests before a value can be ranked by completion rate
pub const MIN_CASES_FOR_RANKING: u64 = 20;

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// All chart groups except feature importance, which comes from the model
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub time_series: TimeSeries,
    pub ward_distribution: WardDistribution,
    pub status_distribution: StatusDistribution,
    pub service_types: ServiceTypes,
    pub division_distribution: DivisionDistribution,
    pub hourly_pattern: HourlyPattern,
}

/// Compute every chart group
pub fn chart_data(records: &[ServiceRequest]) -> ChartData {
    let (wards, ward_counts) = top_counts(records.iter().map(|r| r.ward.as_str()), TOP_WARDS);
    let (statuses, status_counts) =
        top_counts(records.iter().map(|r| r.status.as_str()), usize::MAX);
    let (types, type_counts) = top_counts(
        records.iter().map(|r| r.service_type.as_str()),
        TOP_SERVICE_TYPES,
    );
    let (divisions, division_counts) = top_counts(
        records.iter().map(|r| r.division.as_str()),
        TOP_DIVISIONS,
    );

    ChartData {
        time_series: time_series(records),
        ward_distribution: WardDistribution {
            wards,
            counts: numbers(ward_counts),
        },
        status_distribution: StatusDistribution {
            statuses,
            counts: numbers(status_counts),
        },
        service_types: ServiceTypes {
            types,
            counts: numbers(type_counts),
        },
        division_distribution: DivisionDistribution {
            divisions,
            counts: numbers(division_counts),
        },
        hourly_pattern: hourly_pattern(records),
    }
}

/// Requests per date, ascending, last [`TIME_SERIES_DAYS`] dates with data
pub fn time_series(records: &[ServiceRequest]) -> TimeSeries {
    let mut per_day: BTreeMap<_, u64> = BTreeMap::new();
    for record in records {
        *per_day.entry(record.date()).or_default() += 1;
    }

    let skip = per_day.len().saturating_sub(TIME_SERIES_DAYS);
    let (dates, counts) = per_day
        .into_iter()
        .skip(skip)
        .map(|(date, count)| (date.format("%Y-%m-%d").to_string(), Number::from(count)))
        .unzip();

    TimeSeries { dates, counts }
}

/// Requests per hour for all 24 hours, zero filled
pub fn hourly_pattern(records: &[ServiceRequest]) -> HourlyPattern {
    let mut counts = vec![0u64; 24];
    for record in records {
        counts[record.hour() as usize] += 1;
    }

    HourlyPattern {
        hours: (0..24u64).map(Number::from).collect(),
        counts: numbers(counts),
    }
}

/// Requests per weekday, Monday first
pub fn weekday_distribution(records: &[ServiceRequest]) -> WeekdayDistribution {
    let mut counts = vec![0u64; 7];
    for record in records {
        counts[record.weekday() as usize] += 1;
    }

    WeekdayDistribution {
        days: WEEKDAYS.iter().map(|d| d.to_string()).collect(),
        counts,
    }
}

fn numbers(counts: Vec<u64>) -> Vec<Number> {
    counts.into_iter().map(Number::from).collect()
}

/// Count occurrences and keep the `limit` most frequent.
/// Ties are broken by name so output is stable across runs.
pub fn top_counts<'a>(
    values: impl Iterator<Item = &'a str>,
    limit: usize,
) -> (Vec<String>, Vec<u64>) {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }

    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .unzip()
}

/// Sorted distinct values of each categorical input
pub fn categorical_values(records: &[ServiceRequest]) -> CategoricalValues {
    fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
        let mut out: Vec<String> = values.map(str::to_string).collect();
        out.sort();
        out.dedup();
        out
    }

    CategoricalValues {
        service_types: distinct(records.iter().map(|r| r.service_type.as_str())),
        divisions: distinct(records.iter().map(|r| r.division.as_str())),
        wards: distinct(records.iter().map(|r| r.ward.as_str())),
    }
}

/// Highest completion rate per dimension
pub fn success_factors(records: &[ServiceRequest]) -> SuccessFactors {
    SuccessFactors {
        service_type: best_completion_rate(records, |r| &r.service_type),
        ward: best_completion_rate(records, |r| &r.ward),
        division: best_completion_rate(records, |r| &r.division),
    }
}

fn best_completion_rate<F>(records: &[ServiceRequest], key: F) -> Option<RankedValue>
where
    F: Fn(&ServiceRequest) -> &String,
{
    // (cases, completed)
    let mut tally: HashMap<&str, (u64, u64)> = HashMap::new();
    for record in records {
        let entry = tally.entry(key(record).as_str()).or_default();
        entry.0 += 1;
        if record.is_completed() {
            entry.1 += 1;
        }
    }

    tally
        .into_iter()
        .filter(|(_, (cases, _))| *cases >= MIN_CASES_FOR_RANKING)
        .map(|(name, (cases, completed))| RankedValue {
            name: name.to_string(),
            completion_rate: round_to(completed as f64 / cases as f64 * 100.0, 1),
            cases,
        })
        .max_by(|a, b| {
            a.completion_rate
                .total_cmp(&b.completion_rate)
                .then_with(|| a.cases.cmp(&b.cases))
                .then_with(|| b.name.cmp(&a.name))
        })
}

/// Headline numbers
pub fn summary(records: &[ServiceRequest]) -> Summary {
    let total = records.len() as u64;
    let completed = records.iter().filter(|r| r.is_completed()).count() as u64;
    let completion_rate = if total == 0 {
        0.0
    } else {
        round_to(completed as f64 / total as f64 * 100.0, 1)
    };

    let (top_wards, _) = top_counts(records.iter().map(|r| r.ward.as_str()), 1);
    let (top_types, _) = top_counts(records.iter().map(|r| r.service_type.as_str()), 1);

    Summary {
        total_requests: total,
        completion_rate,
        top_ward: top_wards.into_iter().next(),
        top_service_type: top_types.into_iter().next(),
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
