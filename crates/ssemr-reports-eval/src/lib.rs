//! Person data evaluation
//!
//! This crate turns declarative per-person attribute definitions into
//! per-person values for one reporting period:
//!
//! - **Definitions**: `PersonDataDefinition` describes one wanted attribute;
//!   its body selects the evaluator kind that resolves it
//! - **Evaluators**: one `PersonDataEvaluator` per kind builds a
//!   parameterized query, executes it through the `EvaluationService`, and
//!   folds the rows into one value per person
//! - **Registry**: `EvaluatorRegistry` maps each kind to a priority-ordered
//!   list of evaluators, built explicitly at startup
//! - **Context**: `EvaluationContext` carries the period, optional cohort and
//!   extra parameters, and memoizes results within one report run
//!
//! # Example
//!
//! ```ignore
//! use ssemr_reports_eval::{EvaluationContext, PersonDataService, vl};
//!
//! let service = PersonDataService::standard(warehouse, "ssemr_etl")?;
//! let ctx = EvaluationContext::builder().end_date(end).build()?;
//! let result = service.evaluate(&vl::repeat_vl_result(), &ctx)?;
//! println!("{:?}", result.get(PersonId(1)));
//! ```
//!
//! # Resolution rules
//!
//! - A person with no qualifying rows is absent from the result, never
//!   present with a null value
//! - Recency ties are broken deterministically: earlier-declared source first,
//!   then the higher row key
//! - Comparisons against the end date are inclusive on the calendar date

pub mod context;
pub mod definition;
pub mod engine;
pub mod error;
pub mod evaluators;
pub mod library;
pub mod registry;
pub mod resolve;
pub mod result;
pub mod service;
pub mod status;
pub mod vl;

pub use context::{EvaluationContext, EvaluationContextBuilder};
pub use definition::{
    CurrentRowQuery, DefinitionBody, DefinitionId, DefinitionKind, EventSource, LatestValueQuery,
    PendingRule, PersonDataDefinition, SqlQuery, StatusRules, Substitution, SubstitutionAction, ValueFormat,
};
pub use engine::PersonDataService;
pub use error::{EvalError, EvalResult};
pub use evaluators::{CurrentRowEvaluator, LatestValueEvaluator, PersonDataEvaluator, SqlPersonDataEvaluator};
pub use library::DefinitionLibrary;
pub use registry::{DefinitionPredicate, EvaluatorRegistry, DEFAULT_PRIORITY};
pub use result::EvaluatedPersonData;
pub use service::{EvaluationService, QueryBuilderFactory, COHORT_CHUNK_SIZE, SCHEMA_TOKEN};
pub use status::{derive_status, StatusFields, PENDING_RESULT};
