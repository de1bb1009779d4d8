//! Most recent value across several source tables

use super::{cohort_clause, datetime_at, person_at, Columns, PersonDataEvaluator};
use crate::error::{EvalError, EvalResult};
use crate::resolve::{latest_per_person, Candidate};
use crate::{
    DefinitionBody, DefinitionKind, EvaluatedPersonData, EvaluationContext, EvaluationService, LatestValueQuery,
    PersonDataDefinition, QueryBuilderFactory, ValueFormat,
};
use ssemr_reports_query::QueryBuilder;
use ssemr_reports_types::{format_dd_mm_yyyy, Value};
use tracing::debug;

const PERSON: &str = "person_id";
const RECENCY: &str = "recency";
const VALUE: &str = "value";
const ROW_KEY: &str = "row_key";
const SOURCE_RANK: &str = "source_rank";

/// Evaluates `LatestValue` definitions.
///
/// Each source contributes the rows anchored on or before the end date with a
/// non-null value. The sub-selects are combined with `UNION ALL` and the
/// candidates reduced per person in memory.
#[derive(Debug, Clone)]
pub struct LatestValueEvaluator {
    service: EvaluationService,
    factory: QueryBuilderFactory,
}

impl LatestValueEvaluator {
    pub fn new(service: EvaluationService, factory: QueryBuilderFactory) -> Self {
        Self { service, factory }
    }

    /// Build the candidate query for a definition
    pub fn build_query(&self, query: &LatestValueQuery, ctx: &EvaluationContext) -> EvalResult<QueryBuilder> {
        if query.sources.is_empty() {
            return Err(EvalError::unexpected_shape("latest-value definition has no sources"));
        }
        let f = &self.factory;
        let mut builder = f.builder(ctx);
        builder.append(format!(
            "SELECT {PERSON}, {RECENCY}, {VALUE}, {ROW_KEY}, {SOURCE_RANK} FROM ("
        ));
        for (rank, source) in query.sources.iter().enumerate() {
            if rank > 0 {
                builder.append(" UNION ALL");
            }
            let person = f.column(&source.person_column)?;
            let value = f.column(&source.value_column)?;
            let recency = f.column(&source.recency_column)?;
            builder.append(format!(
                " SELECT {person} AS {PERSON}, {recency} AS {RECENCY}, {value} AS {VALUE}, \
                 {row_key} AS {ROW_KEY}, {rank} AS {SOURCE_RANK} FROM {table} \
                 WHERE DATE({anchor}) <= :endDate AND {value} IS NOT NULL",
                row_key = f.column(&source.row_key_column)?,
                table = f.table(&source.table)?,
                anchor = f.column(&source.anchor_column)?,
            ));
            if recency != value {
                builder.append(format!(" AND {recency} IS NOT NULL"));
            }
            builder.append(cohort_clause(f, &source.person_column, ctx)?);
        }
        builder.append(") AS candidates");
        Ok(builder)
    }
}

impl PersonDataEvaluator for LatestValueEvaluator {
    fn name(&self) -> &'static str {
        "latest-value"
    }

    fn supports(&self) -> &'static [DefinitionKind] {
        &[DefinitionKind::LatestValue]
    }

    fn evaluate(
        &self,
        definition: &PersonDataDefinition,
        ctx: &EvaluationContext,
    ) -> EvalResult<EvaluatedPersonData> {
        let DefinitionBody::LatestValue(query) = &definition.body else {
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
        let (person, recency, value, row_key, rank) = (
            columns.index(PERSON)?,
            columns.index(RECENCY)?,
            columns.index(VALUE)?,
            columns.index(ROW_KEY)?,
            columns.index(SOURCE_RANK)?,
        );

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let row = columns.row(row)?;
            let candidate_person = person_at(row, person, PERSON)?;
            if !ctx.includes(candidate_person) || row[value].is_null() {
                continue;
            }
            candidates.push(Candidate {
                person: candidate_person,
                recency: datetime_at(row, recency, RECENCY)?,
                source_rank: row[rank]
                    .as_integer()
                    .and_then(|r| usize::try_from(r).ok())
                    .ok_or_else(|| EvalError::invalid_value(SOURCE_RANK, row[rank].to_string()))?,
                row_key: row[row_key].as_integer(),
                value: row[value].clone(),
            });
        }

        let candidate_count = candidates.len();
        let entries = latest_per_person(candidates)
            .into_values()
            .map(|c| {
                let person = c.person;
                format_value(query.format, c.value).map(|v| (person, v))
            })
            .collect::<EvalResult<Vec<_>>>()?;

        debug!(
            definition = %definition.id,
            candidates = candidate_count,
            persons = entries.len(),
            "resolved latest values"
        );
        Ok(EvaluatedPersonData::from_entries(definition.id.clone(), ctx.period(), entries))
    }
}

fn format_value(format: ValueFormat, value: Value) -> EvalResult<Value> {
    match format {
        ValueFormat::Raw => Ok(value),
        ValueFormat::DayMonthYear => value
            .as_date()
            .map(|d| Value::String(format_dd_mm_yyyy(d)))
            .ok_or_else(|| EvalError::invalid_value(VALUE, format!("expected a date, found '{value}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventSource;
    use chrono::NaiveDate;
    use ssemr_reports_types::ReportingPeriod;
    use ssemr_reports_warehouse::EmptyWarehouse;
    use std::sync::Arc;

    fn evaluator() -> LatestValueEvaluator {
        LatestValueEvaluator::new(
            EvaluationService::new(Arc::new(EmptyWarehouse::new())),
            QueryBuilderFactory::new("etl").unwrap(),
        )
    }

    fn query() -> LatestValueQuery {
        LatestValueQuery {
            sources: vec![EventSource::dated("a", "received"), EventSource::dated("b", "result_date")],
            format: ValueFormat::DayMonthYear,
        }
    }

    #[test]
    fn test_query_unions_sources_with_bound_end_date() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let ctx = EvaluationContext::for_period(ReportingPeriod::ending(end));
        let rendered = evaluator().build_query(&query(), &ctx).unwrap().render().unwrap();

        insta::assert_snapshot!(rendered.sql, @"SELECT person_id, recency, value, row_key, source_rank FROM ( SELECT client_id AS person_id, received AS recency, received AS value, encounter_id AS row_key, 0 AS source_rank FROM etl.a WHERE DATE(encounter_datetime) <= ?1 AND received IS NOT NULL UNION ALL SELECT client_id AS person_id, result_date AS recency, result_date AS value, encounter_id AS row_key, 1 AS source_rank FROM etl.b WHERE DATE(encounter_datetime) <= ?1 AND result_date IS NOT NULL) AS candidates");
        assert_eq!(rendered.values.len(), 1);
    }

    #[test]
    fn test_cohort_is_pushed_into_every_source() {
        let ctx = EvaluationContext::builder()
            .end_date(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap())
            .cohort([ssemr_reports_types::PersonId(1), ssemr_reports_types::PersonId(2)])
            .build()
            .unwrap();
        let rendered = evaluator().build_query(&query(), &ctx).unwrap().render().unwrap();
        assert_eq!(rendered.sql.matches("client_id IN (?2, ?3)").count(), 2);
    }

    #[test]
    fn test_distinct_recency_column_is_required_non_null() {
        let mut q = query();
        q.sources[0].recency_column = "visit_date".into();
        let ctx = EvaluationContext::for_period(ReportingPeriod::ending(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
        let builder = evaluator().build_query(&q, &ctx).unwrap();
        assert!(builder.text().contains("received IS NOT NULL AND visit_date IS NOT NULL"));
    }

    #[test]
    fn test_rejects_injected_identifiers() {
        let mut q = query();
        q.sources[1].table = "b; DROP TABLE a".into();
        let ctx = EvaluationContext::for_period(ReportingPeriod::ending(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
        assert!(matches!(evaluator().build_query(&q, &ctx), Err(EvalError::Binding(_))));
    }

    #[test]
    fn test_format_value() {
        let v = format_value(ValueFormat::DayMonthYear, Value::string("2023-02-01 00:00:00")).unwrap();
        assert_eq!(v, Value::string("01-02-2023"));
        assert_eq!(format_value(ValueFormat::Raw, Value::Integer(3)).unwrap(), Value::Integer(3));
        assert!(format_value(ValueFormat::DayMonthYear, Value::string("soon")).is_err());
    }
}
