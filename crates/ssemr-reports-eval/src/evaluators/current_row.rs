//! Status of each person's most recent encounter

use super::{cohort_clause, datetime_at, person_at, Columns, PersonDataEvaluator};
use crate::error::{EvalError, EvalResult};
use crate::resolve::{current_row_per_person, EncounterRow};
use crate::{
    derive_status, CurrentRowQuery, DefinitionBody, DefinitionKind, EvaluatedPersonData, EvaluationContext,
    EvaluationService, PersonDataDefinition, QueryBuilderFactory, StatusFields,
};
use ssemr_reports_query::QueryBuilder;
use ssemr_reports_types::Value;
use tracing::debug;

const PERSON: &str = "person_id";
const EVENT_TIME: &str = "event_time";
const ROW_KEY: &str = "row_key";
const COLLECTED: &str = "collected";
const RESULT_DATE: &str = "result_date";
const CATEGORY: &str = "category";
const NUMERIC: &str = "numeric_value";

/// Evaluates `CurrentRow` definitions.
///
/// Selects every encounter on or before the end date, keeps the most recent
/// one per person, and derives the status from its fields.
#[derive(Debug, Clone)]
pub struct CurrentRowEvaluator {
    service: EvaluationService,
    factory: QueryBuilderFactory,
}

impl CurrentRowEvaluator {
    pub fn new(service: EvaluationService, factory: QueryBuilderFactory) -> Self {
        Self { service, factory }
    }

    /// Build the encounter query for a definition
    pub fn build_query(&self, query: &CurrentRowQuery, ctx: &EvaluationContext) -> EvalResult<QueryBuilder> {
        let f = &self.factory;
        let rules = &query.status;
        let optional = |column: Option<&String>| -> EvalResult<String> {
            match column {
                Some(c) => Ok(f.column(c)?.to_string()),
                None => Ok("NULL".to_string()),
            }
        };
        let (collected, result_date) = match &rules.pending {
            Some(p) => (optional(Some(&p.collected_column))?, optional(Some(&p.result_date_column))?),
            None => (optional(None)?, optional(None)?),
        };
        let time = f.column(&query.time_column)?;

        let mut builder = f.builder(ctx);
        builder.append(format!(
            "SELECT {person} AS {PERSON}, {time} AS {EVENT_TIME}, {row_key} AS {ROW_KEY}, \
             {collected} AS {COLLECTED}, {result_date} AS {RESULT_DATE}, \
             {category} AS {CATEGORY}, {numeric} AS {NUMERIC} \
             FROM {table} WHERE DATE({time}) <= :endDate",
            person = f.column(&query.person_column)?,
            row_key = f.column(&query.row_key_column)?,
            category = f.column(&rules.category_column)?,
            numeric = optional(rules.numeric_column.as_ref())?,
            table = f.table(&query.table)?,
        ));
        builder.append(cohort_clause(f, &query.person_column, ctx)?);
        Ok(builder)
    }
}

impl PersonDataEvaluator for CurrentRowEvaluator {
    fn name(&self) -> &'static str {
        "current-row"
    }

    fn supports(&self) -> &'static [DefinitionKind] {
        &[DefinitionKind::CurrentRow]
    }

    fn evaluate(
        &self,
        definition: &PersonDataDefinition,
        ctx: &EvaluationContext,
    ) -> EvalResult<EvaluatedPersonData> {
        let DefinitionBody::CurrentRow(query) = &definition.body else {
            return Err(EvalError::UnsupportedDefinition {
                evaluator: self.name(),
                kind: definition.kind(),
                definition: definition.id.clone(),
            });
        };

        let rows = self.service.evaluate_cohort_rows(&self.build_query(query, ctx)?)?;
        if rows.is_empty() {
            return Ok(EvaluatedPersonData::new(definition.id.clone(), ctx.period()));
        }
        let columns = Columns::new(&rows);
        let person = columns.index(PERSON)?;
        let time = columns.index(EVENT_TIME)?;
        let row_key = columns.index(ROW_KEY)?;
        let collected = columns.index(COLLECTED)?;
        let result_date = columns.index(RESULT_DATE)?;
        let category = columns.index(CATEGORY)?;
        let numeric = columns.index(NUMERIC)?;

        let mut encounters = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let row = columns.row(row)?;
            let encounter_person = person_at(row, person, PERSON)?;
            if !ctx.includes(encounter_person) {
                continue;
            }
            encounters.push(EncounterRow {
                person: encounter_person,
                time: datetime_at(row, time, EVENT_TIME)?,
                row_key: row[row_key].as_integer(),
                fields: StatusFields {
                    collected: row[collected].clone(),
                    result_date: row[result_date].clone(),
                    category: row[category].clone(),
                    numeric: row[numeric].clone(),
                },
            });
        }

        let encounter_count = encounters.len();
        let entries: Vec<(_, Value)> = current_row_per_person(encounters)
            .into_values()
            .map(|row| (row.person, derive_status(&query.status, &row.fields)))
            .collect();

        debug!(
            definition = %definition.id,
            encounters = encounter_count,
            persons = entries.len(),
            "resolved current rows"
        );
        Ok(EvaluatedPersonData::from_entries(definition.id.clone(), ctx.period(), entries))
    }
}
