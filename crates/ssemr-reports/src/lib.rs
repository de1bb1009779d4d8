//! Per-person clinical attribute evaluation for SSEMR reports
//!
//! This crate re-exports the whole pipeline:
//! - Value and period types
//! - Parameterized query building
//! - Warehouse access (SQLite)
//! - Person data definitions, evaluators and the memoizing dispatcher
//! - Report composition
//!
//! # Example
//!
//! ```ignore
//! use ssemr_reports::{EvaluationContext, ReportManager};
//!
//! let manager = ReportManager::standard(warehouse, "ssemr_etl")?;
//! let ctx = EvaluationContext::builder().end_date(end).build()?;
//! let data = manager.evaluate("AFT Initiations Register", &ctx)?;
//! ```

// Re-export all public APIs from internal crates
pub use ssemr_reports_eval as eval;
pub use ssemr_reports_query as query;
pub use ssemr_reports_report as report;
pub use ssemr_reports_types as types;
pub use ssemr_reports_warehouse as warehouse;

// Convenience re-exports
pub use ssemr_reports_eval::{EvalError, EvaluationContext, PersonDataDefinition, PersonDataService};
pub use ssemr_reports_report::{ReportData, ReportError, ReportManager};
pub use ssemr_reports_types::{PersonId, ReportingPeriod, Value};
pub use ssemr_reports_warehouse::{SqliteWarehouse, Warehouse};

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
