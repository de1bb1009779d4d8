//! Report composition
//!
//! Reports are metadata: a definition listing named datasets, and one or more
//! designs describing how a template renders them. Evaluating a report runs
//! every dataset for one `EvaluationContext` and returns plain tables:
//!
//! - **SQL datasets** run trusted literal SQL and keep its columns
//! - **Person datasets** evaluate person data definitions and join them into
//!   one row per person
//!
//! Template rendering itself happens outside this crate; `TemplateStore` only
//! resolves and loads template resources.

pub mod data;
pub mod definition;
pub mod design;
pub mod error;
pub mod library;
pub mod manager;
pub mod template;

pub use data::{DataSetTable, ReportData};
pub use definition::{DataSetDefinition, ParameterKind, PersonColumn, ReportDefinition, ReportParameter};
pub use design::{RepeatingSection, ReportDesign};
pub use error::{ReportError, ReportResult, ResourceError};
pub use manager::{RegisteredReport, ReportManager};
pub use template::TemplateStore;
