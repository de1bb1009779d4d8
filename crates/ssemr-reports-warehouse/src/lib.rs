//! Warehouse access
//!
//! This crate provides:
//! - The `Warehouse` trait every evaluator queries through
//! - `RowSet`, the fully materialized result of one query
//! - `SqliteWarehouse`, a rusqlite-backed warehouse (flat ETL tables in SQLite)
//! - `EmptyWarehouse`, which answers every query with no rows

pub mod provider;
pub mod sqlite;

pub use provider::{EmptyWarehouse, RowSet, Warehouse, WarehouseError};
pub use sqlite::SqliteWarehouse;
