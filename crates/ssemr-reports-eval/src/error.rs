//! Evaluation errors

use crate::{DefinitionId, DefinitionKind};
use ssemr_reports_query::BindingError;
use ssemr_reports_types::{PersonId, ReportingPeriod};
use ssemr_reports_warehouse::WarehouseError;
use thiserror::Error;

/// Result type for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors that can occur while evaluating person data.
///
/// Every variant aborts the evaluation; no partial results are returned.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A query placeholder is unbound or bound with the wrong type
    #[error("Query binding failed: {0}")]
    Binding(#[from] BindingError),

    /// No evaluator is registered for the definition's kind
    #[error("No evaluator registered for {kind} definition {definition}")]
    NoEvaluator {
        kind: DefinitionKind,
        definition: DefinitionId,
    },

    /// The warehouse call failed
    #[error("Warehouse query failed: {0}")]
    Warehouse(#[from] WarehouseError),

    /// A person-keyed query returned a second row for the same person
    #[error("Query returned more than one row for person {person}")]
    DuplicatePerson { person: PersonId },

    /// The row set did not have the columns the evaluator needs
    #[error("Unexpected query result shape: {message}")]
    UnexpectedShape { message: String },

    /// A cell could not be read as the type the evaluator needs
    #[error("Invalid value in column {column}: {message}")]
    InvalidValue { column: String, message: String },

    /// The evaluator was handed a definition body it cannot resolve
    #[error("Evaluator {evaluator} cannot resolve {kind} definition {definition}")]
    UnsupportedDefinition {
        evaluator: &'static str,
        kind: DefinitionKind,
        definition: DefinitionId,
    },

    /// A definition with this id is already registered
    #[error("Definition already registered: {id}")]
    DuplicateDefinition { id: DefinitionId },

    /// Two different definitions were evaluated under one id in a single run
    #[error("Definition {id} was already evaluated with a different body in this run")]
    ConflictingDefinition { id: DefinitionId },

    /// No definition with this id is registered
    #[error("Unknown definition: {id}")]
    UnknownDefinition { id: DefinitionId },

    /// Context construction failed
    #[error("Invalid evaluation context: {message}")]
    InvalidContext { message: String },

    /// Any of the above, tagged with the definition and period being evaluated
    #[error("Evaluation of {definition} for period {period} failed: {source}")]
    Evaluation {
        definition: DefinitionId,
        period: ReportingPeriod,
        #[source]
        source: Box<EvalError>,
    },
}

impl EvalError {
    /// Create an unexpected shape error
    pub fn unexpected_shape(message: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            message: message.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Wrap an error with the definition and period it occurred in
    pub fn in_evaluation(self, definition: &DefinitionId, period: ReportingPeriod) -> Self {
        match self {
            already @ Self::Evaluation { .. } => already,
            other => Self::Evaluation {
                definition: definition.clone(),
                period,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with any `Evaluation` wrapping removed
    pub fn root_cause(&self) -> &EvalError {
        match self {
            Self::Evaluation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
