//! Literal SQL definitions

use super::PersonDataEvaluator;
use crate::error::{EvalError, EvalResult};
use crate::{
    DefinitionBody, DefinitionKind, EvaluatedPersonData, EvaluationContext, EvaluationService, PersonDataDefinition,
    QueryBuilderFactory,
};
use tracing::debug;

/// Evaluates `Sql` definitions: trusted text returning `(person_id, value)`.
///
/// The text may reference any context parameter by name, and `{schema}.` for
/// the warehouse schema. One row per person
/// is required; a cohort, when present, is applied to the returned rows.
#[derive(Debug, Clone)]
pub struct SqlPersonDataEvaluator {
    service: EvaluationService,
    factory: QueryBuilderFactory,
}

impl SqlPersonDataEvaluator {
    pub fn new(service: EvaluationService, factory: QueryBuilderFactory) -> Self {
        Self { service, factory }
    }
}

impl PersonDataEvaluator for SqlPersonDataEvaluator {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn supports(&self) -> &'static [DefinitionKind] {
        &[DefinitionKind::Sql]
    }

    fn evaluate(
        &self,
        definition: &PersonDataDefinition,
        ctx: &EvaluationContext,
    ) -> EvalResult<EvaluatedPersonData> {
        let DefinitionBody::Sql(query) = &definition.body else {
            return Err(EvalError::UnsupportedDefinition {
                evaluator: self.name(),
                kind: definition.kind(),
                definition: definition.id.clone(),
            });
        };

        let mut builder = self.factory.builder(ctx);
        builder.append(self.factory.expand_schema(&query.sql));
        let rows = self.service.evaluate_cohort_rows(&builder)?;
        let data = if rows.is_empty() {
            Default::default()
        } else {
            crate::service::rows_to_map(rows)?
        };

        let total = data.len();
        let entries = data.into_iter().filter(|(person, _)| ctx.includes(*person));
        let result = EvaluatedPersonData::from_entries(definition.id.clone(), ctx.period(), entries);
        debug!(definition = %definition.id, rows = total, persons = result.len(), "evaluated sql definition");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqlQuery;
    use chrono::NaiveDate;
    use ssemr_reports_types::{PersonId, Value};
    use ssemr_reports_warehouse::SqliteWarehouse;
    use std::sync::Arc;

    fn evaluator() -> SqlPersonDataEvaluator {
        let warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse
            .execute_batch(
                "CREATE TABLE enrolment (client_id INTEGER, enrolled TEXT);
                 INSERT INTO enrolment VALUES (3, '2024-02-01'), (1, '2024-01-15'), (2, '2024-05-01');",
            )
            .unwrap();
        SqlPersonDataEvaluator::new(
            EvaluationService::new(Arc::new(warehouse)),
            QueryBuilderFactory::unqualified(),
        )
    }

    fn definition() -> PersonDataDefinition {
        PersonDataDefinition::new(
            "enrolment_date",
            "Enrolment date",
            DefinitionBody::Sql(SqlQuery {
                sql: "SELECT client_id, enrolled FROM enrolment WHERE enrolled <= :endDate".into(),
            }),
        )
    }

    #[test]
    fn test_binds_context_parameters_and_sorts_persons() {
        let ctx = EvaluationContext::builder()
            .end_date(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap())
            .build()
            .unwrap();
        let result = evaluator().evaluate(&definition(), &ctx).unwrap();
        let persons: Vec<PersonId> = result.persons().collect();
        assert_eq!(persons, vec![PersonId(1), PersonId(3)]);
        assert_eq!(result.get(PersonId(3)), Some(&Value::string("2024-02-01")));
    }

    #[test]
    fn test_cohort_filters_returned_rows() {
        let ctx = EvaluationContext::builder()
            .end_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
            .cohort([PersonId(2)])
            .build()
            .unwrap();
        let result = evaluator().evaluate(&definition(), &ctx).unwrap();
        assert_eq!(result.persons().collect::<Vec<_>>(), vec![PersonId(2)]);
    }
}
