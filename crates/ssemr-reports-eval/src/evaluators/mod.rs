//! Pluggable evaluators, one per definition kind

mod current_row;
mod latest_value;
mod sql;

pub use current_row::CurrentRowEvaluator;
pub use latest_value::LatestValueEvaluator;
pub use sql::SqlPersonDataEvaluator;

use crate::error::{EvalError, EvalResult};
use crate::{DefinitionKind, EvaluatedPersonData, EvaluationContext, PersonDataDefinition, QueryBuilderFactory};
use chrono::NaiveDateTime;
use ssemr_reports_types::{PersonId, Value};
use ssemr_reports_warehouse::RowSet;

/// Resolves definitions of one or more kinds into per-person values.
///
/// Implementations build a parameterized query from the definition, run it
/// through an `EvaluationService` and reduce the rows to at most one value per
/// person. They hold no per-run state; everything run-specific comes from the
/// context.
pub trait PersonDataEvaluator: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    /// Kinds this evaluator can be registered for
    fn supports(&self) -> &'static [DefinitionKind];

    /// Evaluate one definition for the context's period and cohort
    fn evaluate(&self, definition: &PersonDataDefinition, ctx: &EvaluationContext)
        -> EvalResult<EvaluatedPersonData>;
}

/// `AND person IN (:cohort)` when the context carries a cohort
fn cohort_clause(factory: &QueryBuilderFactory, person_column: &str, ctx: &EvaluationContext) -> EvalResult<String> {
    match ctx.cohort() {
        Some(_) => Ok(format!(" AND {} IN (:cohort)", factory.column(person_column)?)),
        None => Ok(String::new()),
    }
}

/// Column positions of a row set, looked up by alias
struct Columns<'a> {
    rows: &'a RowSet,
}

impl<'a> Columns<'a> {
    fn new(rows: &'a RowSet) -> Self {
        Self { rows }
    }

    fn index(&self, alias: &str) -> EvalResult<usize> {
        self.rows
            .column_index(alias)
            .ok_or_else(|| EvalError::unexpected_shape(format!("missing column '{alias}'")))
    }

    /// The row, provided it carries one cell per column
    fn row<'r>(&self, row: &'r [Value]) -> EvalResult<&'r [Value]> {
        let expected = self.rows.columns.len();
        if row.len() == expected {
            Ok(row)
        } else {
            Err(EvalError::unexpected_shape(format!(
                "row has {} cells but the query returned {expected} columns",
                row.len()
            )))
        }
    }
}

fn cell<'r>(row: &'r [Value], index: usize, alias: &str) -> EvalResult<&'r Value> {
    row.get(index)
        .ok_or_else(|| EvalError::unexpected_shape(format!("row has no cell for column '{alias}'")))
}

fn person_at(row: &[Value], index: usize, alias: &str) -> EvalResult<PersonId> {
    let value = cell(row, index, alias)?;
    value
        .as_integer()
        .map(PersonId)
        .ok_or_else(|| EvalError::invalid_value(alias, format!("expected a person id, found '{value}'")))
}

fn datetime_at(row: &[Value], index: usize, alias: &str) -> EvalResult<NaiveDateTime> {
    let value = cell(row, index, alias)?;
    value
        .as_datetime()
        .ok_or_else(|| EvalError::invalid_value(alias, format!("expected a date, found '{value}'")))
}
