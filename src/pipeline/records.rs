//! Service Request Records
//!
//! Loads and cleans the raw 311 export. The export is Latin-1 encoded and
//! occasionally contains malformed lines; both are tolerated.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::io::Read;
use std::path::Path;

use super::PipelineError;

pub const STATUS_COLUMN: &str = "Status";
pub const SERVICE_TYPE_COLUMN: &str = "Service Request Type";
pub const DIVISION_COLUMN: &str = "Division";
pub const WARD_COLUMN: &str = "Ward";
pub const CREATED_COLUMN: &str = "Creation Date";

/// Statuses counted as a completed request
pub const COMPLETED_STATUSES: [&str; 2] = ["Closed", "Completed"];

/// One cleaned service request
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    pub created: NaiveDateTime,
    pub status: String,
    pub service_type: String,
    pub division: String,
    pub ward: String,
}

impl ServiceRequest {
    pub fn date(&self) -> NaiveDate {
        self.created.date()
    }

    /// Month of year, 1-12
    pub fn month(&self) -> u32 {
        self.created.month()
    }

    /// Day of week, Monday = 0
    pub fn weekday(&self) -> u32 {
        self.created.weekday().num_days_from_monday()
    }

    /// Hour of day, 0-23
    pub fn hour(&self) -> u32 {
        self.created.hour()
    }

    pub fn is_completed(&self) -> bool {
        COMPLETED_STATUSES.contains(&self.status.as_str())
    }
}

/// Result of loading a raw export
#[derive(Debug, Default)]
pub struct LoadReport {
    pub records: Vec<ServiceRequest>,
    /// Lines read, excluding the header
    pub rows_read: usize,
    /// Lines the CSV reader could not parse
    pub rows_malformed: usize,
    /// Rows missing one of the essential columns
    pub rows_missing_fields: usize,
    /// Rows whose creation date did not parse
    pub rows_bad_date: usize,
}

/// Column positions of the essential fields
struct Columns {
    status: usize,
    service_type: usize,
    division: usize,
    ward: usize,
    created: usize,
}

impl Columns {
    fn locate(headers: &[String]) -> Result<Self, PipelineError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            status: find(STATUS_COLUMN)?,
            service_type: find(SERVICE_TYPE_COLUMN)?,
            division: find(DIVISION_COLUMN)?,
            ward: find(WARD_COLUMN)?,
            created: find(CREATED_COLUMN)?,
        })
    }
}

/// Load the export at `path`
pub fn load_path(path: &Path) -> Result<LoadReport, PipelineError> {
    let file = std::fs::File::open(path).map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        error: e,
    })?;
    load_reader(file)
}

/// Load an export from any reader
pub fn load_reader<R: Read>(reader: R) -> Result<LoadReport, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| decode_latin1(h).trim().to_string())
        .collect();
    tracing::debug!(?headers, "Export columns");

    let columns = Columns::locate(&headers)?;
    let mut report = LoadReport::default();

    for result in reader.byte_records() {
        report.rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::trace!(error = %e, "Skipping malformed line");
                report.rows_malformed += 1;
                continue;
            }
        };

        let field = |idx: usize| {
            record
                .get(idx)
                .map(|raw| decode_latin1(raw).trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let (Some(status), Some(service_type), Some(division), Some(ward), Some(created)) = (
            field(columns.status),
            field(columns.service_type),
            field(columns.division),
            field(columns.ward),
            field(columns.created),
        ) else {
            report.rows_missing_fields += 1;
            continue;
        };

        let Some(created) = parse_creation_date(&created) else {
            report.rows_bad_date += 1;
            continue;
        };

        report.records.push(ServiceRequest {
            created,
            status,
            service_type,
            division,
            ward,
        });
    }

    tracing::info!(
        "Loaded {} records ({} malformed, {} missing fields, {} bad dates)",
        report.records.len(),
        report.rows_malformed,
        report.rows_missing_fields,
        report.rows_bad_date
    );

    Ok(report)
}

/// Latin-1 maps every byte to the code point of the same value
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Parse a creation date in any of the formats the export has used
pub fn parse_creation_date(text: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 7] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%m/%d/%Y %I:%M:%S %p",
        "%Y/%m/%d %H:%M:%S",
    ];
    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

    let text = text.trim();

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "Creation Date ,Status,First 3 Chars of Postal Code,Intersection Street 1,Ward,Service Request Type,Division,Section
2025-01-06 08:15:00.000,Completed,M5V,,Spadina-Fort York (10),Noise,Municipal Licensing & Standards,District Ops
2025-01-06 14:02:11.000,  Cancelled ,M4C,,Beaches-East York (19),Graffiti,Transportation Services,Road Ops
2025-01-07,Closed,M6H,,Davenport (9),Noise,Municipal Licensing & Standards,District Ops
2025-01-07 10:00:00,In-progress,M6H,,,Noise,Municipal Licensing & Standards,District Ops
not a date,Completed,M6H,,Davenport (9),Noise,Municipal Licensing & Standards,District Ops
";

    #[test]
    fn test_load_cleans_rows() {
        let report = load_reader(EXPORT.as_bytes()).unwrap();

        assert_eq!(report.rows_read, 5);
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.rows_missing_fields, 1);
        assert_eq!(report.rows_bad_date, 1);

        let cancelled = &report.records[1];
        assert_eq!(cancelled.status, "Cancelled");
        assert_eq!(cancelled.ward, "Beaches-East York (19)");
        assert_eq!(cancelled.hour(), 14);
        assert!(!cancelled.is_completed());
    }

    #[test]
    fn test_header_names_are_trimmed() {
        // "Creation Date " carries a trailing space in the export
        let report = load_reader(EXPORT.as_bytes()).unwrap();
        assert_eq!(report.records[0].created.to_string(), "2025-01-06 08:15:00");
    }

    #[test]
    fn test_completion_statuses() {
        let report = load_reader(EXPORT.as_bytes()).unwrap();
        assert!(report.records[0].is_completed());
        assert!(report.records[2].is_completed());
    }

    #[test]
    fn test_temporal_fields() {
        let created = parse_creation_date("2025-01-06 08:15:00").unwrap();
        let request = ServiceRequest {
            created,
            status: "Completed".into(),
            service_type: "Noise".into(),
            division: "MLS".into(),
            ward: "Ward 1".into(),
        };
        // 2025-01-06 is a Monday
        assert_eq!(request.weekday(), 0);
        assert_eq!(request.month(), 1);
        assert_eq!(request.hour(), 8);
    }

    #[test]
    fn test_latin1_values_decode() {
        let mut bytes = b"Creation Date,Status,Ward,Service Request Type,Division\n".to_vec();
        bytes.extend_from_slice(b"2025-02-01 09:00:00,Completed,Etobicoke,Caf\xe9 Patio,MLS\n");

        let report = load_reader(bytes.as_slice()).unwrap();
        assert_eq!(report.records[0].service_type, "Café Patio");
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let err = load_reader("Status,Ward\nCompleted,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(ref c) if c == "Service Request Type"));
    }

    #[test]
    fn test_date_formats() {
        assert!(parse_creation_date("2025-03-01T12:30:00").is_some());
        assert!(parse_creation_date("03/01/2025 12:30").is_some());
        assert!(parse_creation_date("2025-03-01T12:30:00-05:00").is_some());
        assert_eq!(
            parse_creation_date("2025-03-01").unwrap().to_string(),
            "2025-03-01 00:00:00"
        );
        assert!(parse_creation_date("yesterday").is_none());
    }
}
