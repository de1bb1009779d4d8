//! Warehouse trait and row types

use ssemr_reports_query::RenderedQuery;
use ssemr_reports_types::Value;

/// A read-only analytic store that executes rendered queries.
///
/// Every call is blocking and returns the complete row set or fails; there is
/// no streaming and no retry.
pub trait Warehouse: Send + Sync {
    /// Execute a rendered query and materialize all rows
    fn query(&self, query: &RenderedQuery) -> Result<RowSet, WarehouseError>;

    /// Human-readable name used in logs
    fn name(&self) -> &str;
}

/// Materialized result of one query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row; it must have one value per column
    pub fn push(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Position of a column, matched case-insensitively
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// Warehouse errors
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    #[error("Failed to open warehouse: {0}")]
    Open(String),

    #[error("Failed to prepare query: {message}")]
    Prepare { message: String, sql: String },

    #[error("Query execution failed: {0}")]
    Execute(String),

    #[error("Unsupported value in column {column}: {message}")]
    UnsupportedValue { column: String, message: String },
}

/// Warehouse with no data, for wiring and tests
#[derive(Debug, Default)]
pub struct EmptyWarehouse;

impl EmptyWarehouse {
    pub fn new() -> Self {
        Self
    }
}

impl Warehouse for EmptyWarehouse {
    fn query(&self, _query: &RenderedQuery) -> Result<RowSet, WarehouseError> {
        Ok(RowSet::default())
    }

    fn name(&self) -> &str {
        "empty"
    }
}
