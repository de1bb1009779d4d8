//! Query building and parameter binding
//!
//! Query text is assembled from trusted literal fragments authored alongside a
//! data definition. Everything supplied at run time (report dates, cohort ids)
//! goes through typed named parameters and is rendered as positional
//! placeholders, never spliced into the text.
//!
//! # Example
//!
//! ```
//! use ssemr_reports_query::{Parameter, QueryBuilder};
//! use chrono::NaiveDate;
//!
//! let mut qb = QueryBuilder::with_standard_parameters();
//! qb.append("SELECT client_id FROM visits WHERE DATE(visit_date) <= :endDate")
//!     .bind("endDate", NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
//!
//! let rendered = qb.render().unwrap();
//! assert_eq!(rendered.sql, "SELECT client_id FROM visits WHERE DATE(visit_date) <= ?1");
//! ```

mod builder;
mod error;
mod identifier;
mod parameter;
mod scanner;

pub use builder::{QueryBuilder, RenderedQuery, COHORT, END_DATE, START_DATE};
pub use error::BindingError;
pub use identifier::{qualified, sql_identifier};
pub use parameter::{BoundValue, Parameter, ParameterType};
pub use scanner::{placeholders, Segment};
