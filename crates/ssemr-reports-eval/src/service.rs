//! Query execution against the warehouse

use crate::error::{EvalError, EvalResult};
use crate::EvaluationContext;
use indexmap::IndexMap;
use ssemr_reports_query::{qualified, sql_identifier, Parameter, QueryBuilder, COHORT};
use ssemr_reports_types::{PersonId, Value};
use ssemr_reports_warehouse::{RowSet, Warehouse};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// Most cohort ids bound into a single query. SQLite caps a statement at
/// 32766 variables.
pub const COHORT_CHUNK_SIZE: usize = 10_000;

/// Stands for the warehouse schema in literal SQL, written as `{schema}.table`
pub const SCHEMA_TOKEN: &str = "{schema}";

/// Renders builders and runs them against the warehouse
#[derive(Clone)]
pub struct EvaluationService {
    warehouse: Arc<dyn Warehouse>,
    cohort_chunk_size: usize,
}

impl EvaluationService {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self {
            warehouse,
            cohort_chunk_size: COHORT_CHUNK_SIZE,
        }
    }

    /// Override how many cohort ids go into one query (at least 1)
    pub fn with_cohort_chunk_size(mut self, size: usize) -> Self {
        self.cohort_chunk_size = size.max(1);
        self
    }

    pub fn warehouse(&self) -> &dyn Warehouse {
        self.warehouse.as_ref()
    }

    /// Render and execute, returning every row
    pub fn evaluate_rows(&self, builder: &QueryBuilder) -> EvalResult<RowSet> {
        let rendered = builder.render()?;
        trace!(sql = %rendered, "rendered query");
        let rows = self.warehouse.query(&rendered)?;
        debug!(warehouse = self.warehouse.name(), rows = rows.len(), "query returned");
        Ok(rows)
    }

    /// Like [`evaluate_rows`](Self::evaluate_rows), but a referenced `:cohort`
    /// larger than the chunk size is split over several queries and their rows
    /// concatenated.
    ///
    /// Only sound for queries whose rows each belong to the cohort member they
    /// were filtered on, which holds for every per-person candidate query.
    pub fn evaluate_cohort_rows(&self, builder: &QueryBuilder) -> EvalResult<RowSet> {
        let persons: Vec<i64> = match builder.parameter(COHORT) {
            Some(Parameter::IntegerSet(set)) if set.len() > self.cohort_chunk_size && builder.references(COHORT) => {
                set.iter().copied().collect()
            }
            _ => return self.evaluate_rows(builder),
        };

        let mut combined = RowSet::default();
        let mut chunks = 0usize;
        for chunk in persons.chunks(self.cohort_chunk_size) {
            let mut chunked = builder.clone();
            chunked.bind(COHORT, chunk.iter().copied().collect::<BTreeSet<i64>>());
            let rows = self.evaluate_rows(&chunked)?;
            if combined.columns.is_empty() {
                combined.columns = rows.columns;
            }
            combined.rows.extend(rows.rows);
            chunks += 1;
        }
        debug!(cohort = persons.len(), chunks, rows = combined.len(), "cohort split across queries");
        Ok(combined)
    }

    /// Render and execute a two-column `(person_id, value)` query.
    ///
    /// A second row for the same person is an error rather than a silent
    /// overwrite.
    pub fn evaluate_to_map(&self, builder: &QueryBuilder) -> EvalResult<IndexMap<PersonId, Value>> {
        let rows = self.evaluate_rows(builder)?;
        rows_to_map(rows)
    }
}

impl std::fmt::Debug for EvaluationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationService")
            .field("warehouse", &self.warehouse.name())
            .field("cohort_chunk_size", &self.cohort_chunk_size)
            .finish()
    }
}

pub(crate) fn rows_to_map(rows: RowSet) -> EvalResult<IndexMap<PersonId, Value>> {
    if rows.columns.len() != 2 {
        return Err(EvalError::unexpected_shape(format!(
            "expected 2 columns (person_id, value), found {}",
            rows.columns.len()
        )));
    }
    let person_column = rows.columns[0].clone();

    let mut map = IndexMap::with_capacity(rows.len());
    for row in rows.rows {
        let mut cells = row.into_iter();
        let person_cell = cells.next().unwrap_or_default();
        let value = cells.next().unwrap_or_default();
        let person = person_cell.as_integer().map(PersonId).ok_or_else(|| {
            EvalError::invalid_value(
                &person_column,
                format!("expected a person id, found {} '{}'", person_cell.type_name(), person_cell),
            )
        })?;
        if map.insert(person, value).is_some() {
            return Err(EvalError::DuplicatePerson { person });
        }
    }
    Ok(map)
}

/// Creates builders for a warehouse schema with the report parameters bound
#[derive(Debug, Clone)]
pub struct QueryBuilderFactory {
    schema: Option<String>,
}

impl QueryBuilderFactory {
    /// Factory qualifying bare table names with `schema`
    pub fn new(schema: impl Into<String>) -> EvalResult<Self> {
        let schema = schema.into();
        sql_identifier(&schema)?;
        Ok(Self { schema: Some(schema) })
    }

    /// Factory that leaves table names as given
    pub fn unqualified() -> Self {
        Self { schema: None }
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Validate a table name and qualify it with the schema unless it already
    /// names one
    pub fn table(&self, name: &str) -> EvalResult<String> {
        sql_identifier(name)?;
        match &self.schema {
            Some(schema) if !name.contains('.') => Ok(qualified(schema, name)?),
            _ => Ok(name.to_string()),
        }
    }

    /// Replace each `{schema}.` in literal SQL with the schema prefix, or
    /// remove it when table names are left unqualified
    pub fn expand_schema(&self, sql: &str) -> String {
        let token = format!("{SCHEMA_TOKEN}.");
        match &self.schema {
            Some(schema) => sql.replace(&token, &format!("{schema}.")),
            None => sql.replace(&token, ""),
        }
    }

    /// Validate a column name
    pub fn column<'a>(&self, name: &'a str) -> EvalResult<&'a str> {
        if name.contains('.') {
            return Err(ssemr_reports_query::BindingError::invalid_identifier(name).into());
        }
        Ok(sql_identifier(name)?)
    }

    /// A builder with `startDate`/`endDate`/`cohort` declared, and every
    /// parameter the context defines bound
    pub fn builder(&self, ctx: &EvaluationContext) -> QueryBuilder {
        let mut builder = QueryBuilder::with_standard_parameters();
        for (name, value) in ctx.parameters() {
            builder.bind(name, value);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ssemr_reports_query::{BindingError, Parameter, END_DATE};
    use ssemr_reports_types::ReportingPeriod;
    use ssemr_reports_warehouse::SqliteWarehouse;

    fn service() -> EvaluationService {
        let warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse
            .execute_batch(
                "CREATE TABLE obs (client_id INTEGER, value TEXT);
                 INSERT INTO obs VALUES (2, 'b'), (1, 'a'), (1, 'again');",
            )
            .unwrap();
        EvaluationService::new(Arc::new(warehouse))
    }

    #[test]
    fn test_evaluate_to_map_rejects_duplicate_person() {
        let mut qb = QueryBuilder::new();
        qb.append("SELECT client_id, value FROM obs");
        let err = service().evaluate_to_map(&qb).unwrap_err();
        assert!(matches!(err, EvalError::DuplicatePerson { person: PersonId(1) }));
    }

    #[test]
    fn test_evaluate_to_map_keeps_row_order() {
        let mut qb = QueryBuilder::new();
        qb.append("SELECT client_id, value FROM obs WHERE value <> 'again' ORDER BY client_id DESC");
        let map = service().evaluate_to_map(&qb).unwrap();
        let keys: Vec<i64> = map.keys().map(|p| p.get()).collect();
        assert_eq!(keys, vec![2, 1]);
        assert_eq!(map[&PersonId(1)], Value::string("a"));
    }

    #[test]
    fn test_evaluate_to_map_requires_two_columns() {
        let mut qb = QueryBuilder::new();
        qb.append("SELECT client_id FROM obs");
        let err = service().evaluate_to_map(&qb).unwrap_err();
        assert!(matches!(err, EvalError::UnexpectedShape { .. }));
    }

    #[test]
    fn test_evaluate_to_map_rejects_non_integer_person() {
        let mut qb = QueryBuilder::new();
        qb.append("SELECT value, client_id FROM obs");
        let err = service().evaluate_to_map(&qb).unwrap_err();
        assert!(matches!(err, EvalError::InvalidValue { ref column, .. } if column == "value"));
    }

    #[test]
    fn test_large_cohort_is_split_across_queries() {
        let warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse
            .execute_batch(
                "CREATE TABLE obs (client_id INTEGER, value TEXT);
                 INSERT INTO obs VALUES (1, 'a'), (4, 'd'), (5, 'e'), (9, 'i');",
            )
            .unwrap();
        let service = EvaluationService::new(Arc::new(warehouse)).with_cohort_chunk_size(2);

        let mut qb = QueryBuilder::new();
        qb.append("SELECT client_id, value FROM obs WHERE client_id IN (:cohort) ORDER BY client_id");
        qb.bind(COHORT, (1..=7).collect::<BTreeSet<i64>>());
        let rows = service.evaluate_cohort_rows(&qb).unwrap();
        assert_eq!(rows.columns, vec!["client_id", "value"]);
        let ids: Vec<i64> = rows.iter().filter_map(|r| r[0].as_integer()).collect();
        assert_eq!(ids, vec![1, 4, 5]);
    }

    #[test]
    fn test_small_or_unreferenced_cohort_runs_once() {
        let service = service().with_cohort_chunk_size(1);
        let mut qb = QueryBuilder::new();
        qb.append("SELECT client_id, value FROM obs ORDER BY value");
        qb.bind(COHORT, BTreeSet::from([1_i64, 2]));
        let rows = service.evaluate_cohort_rows(&qb).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_factory_qualifies_bare_tables() {
        let factory = QueryBuilderFactory::new("ssemr_etl").unwrap();
        assert_eq!(factory.table("visits").unwrap(), "ssemr_etl.visits");
        assert_eq!(factory.table("other.visits").unwrap(), "other.visits");
        assert!(factory.table("visits; DROP TABLE x").is_err());
        assert!(factory.column("a.b").is_err());
        assert!(QueryBuilderFactory::new("bad schema").is_err());
        assert_eq!(QueryBuilderFactory::unqualified().table("visits").unwrap(), "visits");
    }

    #[test]
    fn test_expand_schema() {
        let sql = "SELECT * FROM {schema}.enrolment e JOIN {schema}.person p ON e.id = p.id";
        assert_eq!(
            QueryBuilderFactory::new("reporting").unwrap().expand_schema(sql),
            "SELECT * FROM reporting.enrolment e JOIN reporting.person p ON e.id = p.id"
        );
        assert_eq!(
            QueryBuilderFactory::unqualified().expand_schema(sql),
            "SELECT * FROM enrolment e JOIN person p ON e.id = p.id"
        );
        assert_eq!(QueryBuilderFactory::unqualified().expand_schema("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_factory_binds_context_parameters() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let ctx = EvaluationContext::for_period(ReportingPeriod::ending(end));
        let builder = QueryBuilderFactory::unqualified().builder(&ctx);
        assert_eq!(builder.parameter(END_DATE), Some(&Parameter::Date(end)));

        let mut qb = builder.clone();
        qb.append("x IN (:cohort)");
        assert!(matches!(
            qb.render(),
            Err(BindingError::Unbound { ref name }) if name == "cohort"
        ));
    }
}
