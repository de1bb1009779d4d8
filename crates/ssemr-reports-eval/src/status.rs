//! Status derivation for current-row attributes

use crate::{StatusRules, SubstitutionAction};
use ssemr_reports_types::Value;

/// Sentinel for a sample that was collected but has no result yet
pub const PENDING_RESULT: &str = "Pending Result";

/// Raw fields read from a person's current row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFields {
    pub collected: Value,
    pub result_date: Value,
    pub category: Value,
    pub numeric: Value,
}

/// Derive the status string for one row.
///
/// Rules apply in order:
/// 1. collected but no result date: `Pending Result`
/// 2. no category: null
/// 3. category matching a substitution (ASCII case-insensitive): the
///    substitution's output
/// 4. anything else: the category unchanged
pub fn derive_status(rules: &StatusRules, fields: &StatusFields) -> Value {
    if rules.pending.is_some() && !fields.collected.is_null() && fields.result_date.is_null() {
        return Value::string(PENDING_RESULT);
    }

    let Some(category) = fields.category.to_text() else {
        return Value::Null;
    };

    let substitution = rules
        .substitutions
        .iter()
        .find(|s| s.category.trim().eq_ignore_ascii_case(category.trim()));

    match substitution.map(|s| &s.action) {
        Some(SubstitutionAction::PassNumeric) => fields.numeric.to_text().map_or(Value::Null, Value::String),
        Some(SubstitutionAction::Fixed(code)) => Value::string(code.as_str()),
        None => Value::String(category),
    }
}
