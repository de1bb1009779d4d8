//! Date parsing and report formatting
//!
//! The warehouse stores dates as ISO text; reports print them as `dd-mm-yyyy`.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// Output format used by report columns (`%d-%m-%Y`)
pub const DAY_MONTH_YEAR: &str = "%d-%m-%Y";

const ISO_DATE: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Error raised when text is not a recognizable date
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid date '{input}': expected YYYY-MM-DD or dd-mm-yyyy")]
pub struct DateParseError {
    pub input: String,
}

impl DateParseError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

/// Format a date the way report columns expect it
pub fn format_dd_mm_yyyy(date: NaiveDate) -> String {
    date.format(DAY_MONTH_YEAR).to_string()
}

/// Parse a calendar date.
///
/// Accepts ISO `YYYY-MM-DD`, report-style `dd-mm-yyyy`, and ISO date-times
/// (the time part is dropped).
pub fn parse_date(input: &str) -> Result<NaiveDate, DateParseError> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, ISO_DATE) {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DAY_MONTH_YEAR) {
        return Ok(date);
    }
    parse_datetime(trimmed)
        .map(|dt| dt.date())
        .map_err(|_| DateParseError::new(input))
}

/// Parse a date-time; a bare ISO date is read as midnight.
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime, DateParseError> {
    let trimmed = input.trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(trimmed, ISO_DATE)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| DateParseError::new(input))
}
