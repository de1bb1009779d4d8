//! Evaluated report data

use indexmap::IndexMap;
use serde::Serialize;
use ssemr_reports_types::{ReportingPeriod, Value};
use ssemr_reports_warehouse::RowSet;

/// Rows of one evaluated dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataSetTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl DataSetTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(name: impl Into<String>, rows: RowSet) -> Self {
        Self {
            name: name.into(),
            columns: rows.columns,
            rows: rows.rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of a column in a row, `None` when either is out of range
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index)
    }
}

/// Every dataset of one report run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportData {
    pub report: String,
    pub name: String,
    pub period: ReportingPeriod,
    pub datasets: IndexMap<String, DataSetTable>,
}

impl ReportData {
    pub fn dataset(&self, key: &str) -> Option<&DataSetTable> {
        self.datasets.get(key)
    }
}
