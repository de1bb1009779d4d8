//! Core value types for SSEMR reports
//!
//! This crate defines the runtime representation shared by every layer:
//! - `Value`: the scalar a warehouse column or an evaluated attribute holds
//! - `PersonId`: the key every per-person result is indexed by
//! - `ReportingPeriod`: the start/end window a report run is evaluated over
//! - Date helpers for the `dd-mm-yyyy` report format

pub mod date;
pub mod period;
pub mod value;

pub use date::{format_dd_mm_yyyy, parse_date, parse_datetime, DateParseError};
pub use period::{PeriodError, ReportingPeriod};
pub use value::{PersonId, Value};
