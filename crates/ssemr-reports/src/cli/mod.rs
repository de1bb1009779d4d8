//! CLI functionality for the reports tool
//!
//! - Run configuration (JSON file plus command-line overrides)
//! - Listing definitions and reports
//! - Evaluating one definition or a whole report
//! - Output formatting

pub mod config;
pub mod evaluate;
pub mod list;
pub mod output;
pub mod report;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use ssemr_reports_eval::EvaluationContext;
use ssemr_reports_types::PersonId;

/// Build the context for one run.
///
/// A non-empty `cohort` from the command line replaces the configured
/// default cohort.
pub fn evaluation_context(
    start: Option<NaiveDate>,
    end: NaiveDate,
    cohort: &[i64],
    default_cohort: Option<&[i64]>,
) -> Result<EvaluationContext> {
    let mut builder = EvaluationContext::builder().end_date(end);
    if let Some(start) = start {
        builder = builder.start_date(start);
    }
    let cohort = if cohort.is_empty() { default_cohort } else { Some(cohort) };
    if let Some(persons) = cohort {
        builder = builder.cohort(persons.iter().copied().map(PersonId));
    }
    builder.build().context("Invalid reporting period")
}
