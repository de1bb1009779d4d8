//! SQLite-backed warehouse
//!
//! Flat ETL tables are read from SQLite databases. Additional databases can be
//! attached under a schema name so that qualified names such as
//! `ssemr_etl.ssemr_flat_encounter_high_viral_load` resolve as they do in the
//! production warehouse.

use crate::provider::{RowSet, Warehouse, WarehouseError};
use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use rust_decimal::Decimal;
use ssemr_reports_query::{sql_identifier, BoundValue, RenderedQuery};
use ssemr_reports_types::Value;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Warehouse over a single SQLite connection
#[derive(Debug)]
pub struct SqliteWarehouse {
    name: String,
    conn: Mutex<Connection>,
}

impl SqliteWarehouse {
    /// Open a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WarehouseError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(open_error)?;
        Ok(Self {
            name: path.display().to_string(),
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, WarehouseError> {
        let conn = Connection::open_in_memory().map_err(open_error)?;
        Ok(Self {
            name: ":memory:".to_string(),
            conn: Mutex::new(conn),
        })
    }

    /// Attach another database under `schema`. Pass `:memory:` for an empty
    /// in-memory schema.
    pub fn attach(&self, schema: &str, path: impl AsRef<Path>) -> Result<(), WarehouseError> {
        let schema = sql_identifier(schema).map_err(|e| WarehouseError::Open(e.to_string()))?;
        let location = path.as_ref().to_string_lossy().into_owned();
        self.conn
            .lock()
            .execute(&format!("ATTACH DATABASE ?1 AS {schema}"), [location])
            .map_err(open_error)?;
        debug!(schema, "attached warehouse schema");
        Ok(())
    }

    /// Run trusted DDL/DML, used to load fixtures
    pub fn execute_batch(&self, sql: &str) -> Result<(), WarehouseError> {
        self.conn
            .lock()
            .execute_batch(sql)
            .map_err(|e| WarehouseError::Execute(e.to_string()))
    }
}

impl Warehouse for SqliteWarehouse {
    fn query(&self, query: &RenderedQuery) -> Result<RowSet, WarehouseError> {
        let started = Instant::now();
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&query.sql).map_err(|e| WarehouseError::Prepare {
            message: e.to_string(),
            sql: query.sql.clone(),
        })?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut result = RowSet::new(columns);

        let params = query.values.iter().map(to_sql_value);
        let mut rows = stmt
            .query(params_from_iter(params))
            .map_err(|e| WarehouseError::Execute(e.to_string()))?;

        while let Some(row) = rows.next().map_err(|e| WarehouseError::Execute(e.to_string()))? {
            let mut values = Vec::with_capacity(result.columns.len());
            for (index, column) in result.columns.iter().enumerate() {
                let raw = row
                    .get_ref(index)
                    .map_err(|e| WarehouseError::Execute(e.to_string()))?;
                values.push(from_sql_value(raw, column)?);
            }
            result.push(values);
        }

        debug!(
            warehouse = %self.name,
            rows = result.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query executed"
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn open_error(e: rusqlite::Error) -> WarehouseError {
    WarehouseError::Open(e.to_string())
}

/// Dates are bound as ISO text, which is how the flat tables store them
fn to_sql_value(value: &BoundValue) -> SqlValue {
    match value {
        BoundValue::Date(d) => SqlValue::Text(d.format("%Y-%m-%d").to_string()),
        BoundValue::Integer(i) => SqlValue::Integer(*i),
        BoundValue::String(s) => SqlValue::Text(s.clone()),
    }
}

fn from_sql_value(raw: ValueRef<'_>, column: &str) -> Result<Value, WarehouseError> {
    let unsupported = |message: String| WarehouseError::UnsupportedValue {
        column: column.to_string(),
        message,
    };
    match raw {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Integer(i)),
        // Shortest round-trip text keeps 550.0 as 550 and 0.1 as 0.1
        ValueRef::Real(f) => f
            .to_string()
            .parse::<Decimal>()
            .map(Value::Decimal)
            .map_err(|e| unsupported(format!("{f}: {e}"))),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| Value::String(s.to_string()))
            .map_err(|e| unsupported(e.to_string())),
        ValueRef::Blob(_) => Err(unsupported("BLOB values are not supported".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ssemr_reports_query::QueryBuilder;

    fn warehouse() -> SqliteWarehouse {
        let warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse
            .execute_batch(
                "CREATE TABLE visits (client_id INTEGER, visit_date TEXT, weight REAL, note TEXT);
                 INSERT INTO visits VALUES (1, '2024-01-05', 61.5, 'ok');
                 INSERT INTO visits VALUES (2, '2024-02-10', 70.0, NULL);
                 INSERT INTO visits VALUES (3, '2024-04-01', NULL, 'late');",
            )
            .unwrap();
        warehouse
    }

    #[test]
    fn test_query_binds_dates_as_iso_text() {
        let warehouse = warehouse();
        let mut qb = QueryBuilder::with_standard_parameters();
        qb.append("SELECT client_id, weight, note FROM visits WHERE visit_date <= :endDate ORDER BY client_id")
            .bind("endDate", NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());

        let rows = warehouse.query(&qb.render().unwrap()).unwrap();
        assert_eq!(rows.columns, vec!["client_id", "weight", "note"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.rows[0][0], Value::Integer(1));
        assert_eq!(rows.rows[0][1], Value::Decimal(Decimal::new(615, 1)));
        assert_eq!(rows.rows[1][1].to_string(), "70");
        assert_eq!(rows.rows[1][2], Value::Null);
    }

    #[test]
    fn test_prepare_error_keeps_sql() {
        let warehouse = warehouse();
        let err = warehouse
            .query(&RenderedQuery::literal("SELECT nope FROM missing_table"))
            .unwrap_err();
        match err {
            WarehouseError::Prepare { sql, .. } => assert_eq!(sql, "SELECT nope FROM missing_table"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blob_is_rejected() {
        let warehouse = warehouse();
        let err = warehouse
            .query(&RenderedQuery::literal("SELECT x'00' AS payload"))
            .unwrap_err();
        assert!(matches!(err, WarehouseError::UnsupportedValue { ref column, .. } if column == "payload"));
    }

    #[test]
    fn test_attach_rejects_bad_schema_name() {
        let warehouse = warehouse();
        assert!(warehouse.attach("bad name", ":memory:").is_err());
        warehouse.attach("ssemr_etl", ":memory:").unwrap();
        warehouse
            .execute_batch("CREATE TABLE ssemr_etl.t (a INTEGER); INSERT INTO ssemr_etl.t VALUES (5);")
            .unwrap();
        let rows = warehouse.query(&RenderedQuery::literal("SELECT a FROM ssemr_etl.t")).unwrap();
        assert_eq!(rows.rows, vec![vec![Value::Integer(5)]]);
    }
}
