//! Shared fixtures for evaluation tests
//!
//! Builds an in-memory warehouse with the `ssemr_etl` schema attached and the
//! two flat encounter tables the viral load definitions read.

#![allow(dead_code)]

use chrono::NaiveDate;
use ssemr_reports_eval::{EvaluationContext, PersonDataService};
use ssemr_reports_query::RenderedQuery;
use ssemr_reports_types::PersonId;
use ssemr_reports_warehouse::{RowSet, SqliteWarehouse, Warehouse, WarehouseError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const SCHEMA: &str = "ssemr_etl";

const TABLES: &str = "
CREATE TABLE ssemr_etl.ssemr_flat_encounter_hiv_care_follow_up (
    encounter_id INTEGER PRIMARY KEY,
    client_id INTEGER NOT NULL,
    encounter_datetime TEXT NOT NULL,
    date_vl_results_received TEXT
);
CREATE TABLE ssemr_etl.ssemr_flat_encounter_high_viral_load (
    encounter_id INTEGER PRIMARY KEY,
    client_id INTEGER NOT NULL,
    encounter_datetime TEXT NOT NULL,
    date_of_collection_of_repeat_vl TEXT,
    repeat_vl_result_date TEXT,
    repeat_vl_results TEXT,
    repeat_vl_value REAL
);
";

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Context ending on `end` with no cohort
pub fn context(end: &str) -> EvaluationContext {
    EvaluationContext::builder().end_date(date(end)).build().unwrap()
}

/// Context ending on `end` restricted to `cohort`
pub fn cohort_context(end: &str, cohort: &[i64]) -> EvaluationContext {
    EvaluationContext::builder()
        .end_date(date(end))
        .cohort(cohort.iter().copied().map(PersonId))
        .build()
        .unwrap()
}

fn text(value: Option<&str>) -> String {
    value.map_or_else(|| "NULL".to_string(), |v| format!("'{v}'"))
}

/// Builder for the fixture warehouse
pub struct EtlFixture {
    warehouse: SqliteWarehouse,
    next_encounter: i64,
}

impl EtlFixture {
    pub fn new() -> Self {
        let warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse.attach(SCHEMA, ":memory:").unwrap();
        warehouse.execute_batch(TABLES).unwrap();
        Self {
            warehouse,
            next_encounter: 1,
        }
    }

    fn encounter_id(&mut self) -> i64 {
        let id = self.next_encounter;
        self.next_encounter += 1;
        id
    }

    /// Routine follow-up encounter
    pub fn follow_up(mut self, client: i64, encounter_datetime: &str, results_received: Option<&str>) -> Self {
        let id = self.encounter_id();
        self.warehouse
            .execute_batch(&format!(
                "INSERT INTO ssemr_etl.ssemr_flat_encounter_hiv_care_follow_up VALUES ({id}, {client}, '{encounter_datetime}', {});",
                text(results_received)
            ))
            .unwrap();
        self
    }

    /// High viral load encounter
    pub fn high_viral_load(mut self, client: i64, encounter_datetime: &str, row: HvlRow) -> Self {
        let id = self.encounter_id();
        self.warehouse
            .execute_batch(&format!(
                "INSERT INTO ssemr_etl.ssemr_flat_encounter_high_viral_load VALUES ({id}, {client}, '{encounter_datetime}', {}, {}, {}, {});",
                text(row.collected),
                text(row.result_date),
                text(row.results),
                row.value.map_or_else(|| "NULL".to_string(), |v| v.to_string()),
            ))
            .unwrap();
        self
    }

    pub fn build(self) -> Arc<SqliteWarehouse> {
        Arc::new(self.warehouse)
    }

    /// Standard service over the fixture, plus a handle counting queries
    pub fn service(self) -> (PersonDataService, Arc<CountingWarehouse>) {
        let counting = Arc::new(CountingWarehouse::new(self.build()));
        let service = PersonDataService::standard(counting.clone(), SCHEMA).unwrap();
        (service, counting)
    }
}

/// Fields of one high viral load row
#[derive(Debug, Clone, Copy, Default)]
pub struct HvlRow {
    pub collected: Option<&'static str>,
    pub result_date: Option<&'static str>,
    pub results: Option<&'static str>,
    pub value: Option<f64>,
}

impl HvlRow {
    /// Completed numeric result
    pub fn numeric(collected: &'static str, result_date: &'static str, value: f64) -> Self {
        Self {
            collected: Some(collected),
            result_date: Some(result_date),
            results: Some("Viral Load Value"),
            value: Some(value),
        }
    }

    /// Sample collected, no result yet
    pub fn pending(collected: &'static str) -> Self {
        Self {
            collected: Some(collected),
            ..Self::default()
        }
    }

    /// Completed with a categorical outcome
    pub fn outcome(result_date: &'static str, results: &'static str) -> Self {
        Self {
            result_date: Some(result_date),
            results: Some(results),
            ..Self::default()
        }
    }
}

/// Warehouse wrapper counting executed queries
pub struct CountingWarehouse {
    inner: Arc<dyn Warehouse>,
    queries: AtomicUsize,
}

impl CountingWarehouse {
    pub fn new(inner: Arc<dyn Warehouse>) -> Self {
        Self {
            inner,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl Warehouse for CountingWarehouse {
    fn query(&self, query: &RenderedQuery) -> Result<RowSet, WarehouseError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(query)
    }

    fn name(&self) -> &str {
        "counting"
    }
}
