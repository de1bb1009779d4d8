//! Reporting period

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The window a report is evaluated over.
///
/// `end` is inclusive. `start` is optional because several attributes are
/// "as of end date" and ignore the lower bound entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub start: Option<NaiveDate>,
    pub end: NaiveDate,
}

/// Invalid period bounds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Start date {start} is after end date {end}")]
pub struct PeriodError {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportingPeriod {
    /// Create a period with both bounds
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PeriodError> {
        if start > end {
            return Err(PeriodError { start, end });
        }
        Ok(Self {
            start: Some(start),
            end,
        })
    }

    /// Create an open-start period ending at `end`
    pub fn ending(end: NaiveDate) -> Self {
        Self { start: None, end }
    }

    /// Check whether a date falls inside the period (both bounds inclusive)
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && date <= self.end
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(start) => write!(f, "{start}..={}", self.end),
            None => write!(f, "..={}", self.end),
        }
    }
}
