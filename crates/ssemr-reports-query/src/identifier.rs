//! Trusted identifier validation
//!
//! Schema, table and column names cannot be bound as parameters, so they are
//! composed into query text. They only ever come from data definitions, and
//! are still checked against a strict identifier pattern first.

use crate::BindingError;
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("valid identifier pattern")
});

/// Validate a bare or `schema.table` identifier
pub fn sql_identifier(identifier: &str) -> Result<&str, BindingError> {
    if IDENTIFIER.is_match(identifier) {
        Ok(identifier)
    } else {
        Err(BindingError::invalid_identifier(identifier))
    }
}

/// Join a schema and a table into a validated qualified name
pub fn qualified(schema: &str, table: &str) -> Result<String, BindingError> {
    let schema = sql_identifier(schema)?;
    let table = sql_identifier(table)?;
    if schema.contains('.') || table.contains('.') {
        return Err(BindingError::invalid_identifier(format!("{schema}.{table}")));
    }
    Ok(format!("{schema}.{table}"))
}
