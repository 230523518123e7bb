//! Static KPI values
//!
//! The headline cards are fixed figures from the published analysis; they
//! are written once at startup and never refreshed from the backend.

use chrono::{DateTime, Local};

use super::view::{elements, DashboardView, STATUS_LOADED};

/// Fixed KPI card values, keyed by element id
pub const HARDCODED_KPIS: [(&str, &str); 12] = [
    (elements::TOTAL_REQUESTS, "15,420"),
    (elements::COMPLETION_RATE, "78.5%"),
    (elements::TOP_WARD, "Spadina-Fort York"),
    (elements::TOP_SERVICE_TYPE, "Noise Complaints"),
    (elements::ML_ACCURACY, "84.2%"),
    (elements::ML_PRECISION, "81.7%"),
    (elements::ML_RECALL, "79.3%"),
    (elements::ML_F1_SCORE, "0.805"),
    (elements::BEST_SERVICE_TYPE, "Animal Services (92%)"),
    (elements::BEST_WARD, "University-Rosedale (89%)"),
    (elements::BEST_DIVISION, "Solid Waste Management (91%)"),
    (elements::BEST_TIME, "Morning 9-11 AM (85%)"),
];

/// Format a timestamp for the "last updated" line
pub fn last_updated_text(at: &DateTime<Local>) -> String {
    format!("Last updated: {}", at.format("%Y-%m-%d %H:%M:%S"))
}

/// Write every KPI card plus the initial status line
pub fn apply_kpis<V: DashboardView + ?Sized>(view: &mut V, now: &DateTime<Local>) {
    tracing::debug!("Setting hardcoded KPI values");

    for (element, value) in HARDCODED_KPIS {
        view.set_text(element, value);
    }

    view.set_text(elements::DATA_STATUS, STATUS_LOADED);
    view.set_text(elements::LAST_UPDATED, &last_updated_text(now));
}
