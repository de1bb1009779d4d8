//! Person data definitions
//!
//! A definition is immutable, declarative data: which attribute is wanted and
//! which tables and columns it is computed from. Definitions are built at
//! composition time (or loaded from configuration) and never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable key identifying a definition across runs and in the memo
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionId(String);

impl DefinitionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DefinitionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The tag evaluator dispatch is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefinitionKind {
    /// Most recent non-null value across one or more source tables
    LatestValue,
    /// Status derived from each person's most recent row in one table
    CurrentRow,
    /// Trusted literal SQL returning `(person_id, value)`
    Sql,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LatestValue => write!(f, "LatestValue"),
            Self::CurrentRow => write!(f, "CurrentRow"),
            Self::Sql => write!(f, "Sql"),
        }
    }
}

/// Declarative description of one per-person attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDataDefinition {
    pub id: DefinitionId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub body: DefinitionBody,
}

impl PersonDataDefinition {
    pub fn new(id: impl Into<DefinitionId>, name: impl Into<String>, body: DefinitionBody) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            body,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The evaluator kind this definition dispatches to
    pub fn kind(&self) -> DefinitionKind {
        match &self.body {
            DefinitionBody::LatestValue(_) => DefinitionKind::LatestValue,
            DefinitionBody::CurrentRow(_) => DefinitionKind::CurrentRow,
            DefinitionBody::Sql(_) => DefinitionKind::Sql,
        }
    }
}

/// What a definition computes and from where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefinitionBody {
    LatestValue(LatestValueQuery),
    CurrentRow(CurrentRowQuery),
    Sql(SqlQuery),
}

/// Most recent non-null value of an attribute recorded in several tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestValueQuery {
    /// Sources in precedence order: on equal recency the earlier source wins
    pub sources: Vec<EventSource>,
    #[serde(default)]
    pub format: ValueFormat,
}

/// One table contributing candidate rows to a `LatestValueQuery`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSource {
    pub table: String,
    #[serde(default = "default_person_column")]
    pub person_column: String,
    #[serde(default = "default_row_key_column")]
    pub row_key_column: String,
    /// Filtered against the end date (`DATE(anchor) <= :endDate`)
    #[serde(default = "default_time_column")]
    pub anchor_column: String,
    /// Orders candidates; the greatest value wins
    pub recency_column: String,
    /// Must be non-null for a row to be a candidate
    pub value_column: String,
}

impl EventSource {
    /// A source whose recency is the value itself, anchored on the encounter time
    pub fn dated(table: impl Into<String>, date_column: impl Into<String>) -> Self {
        let date_column = date_column.into();
        Self {
            table: table.into(),
            person_column: default_person_column(),
            row_key_column: default_row_key_column(),
            anchor_column: default_time_column(),
            recency_column: date_column.clone(),
            value_column: date_column,
        }
    }
}

/// How the chosen value is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    /// Pass the warehouse value through unchanged
    #[default]
    Raw,
    /// Read the value as a date and print `dd-mm-yyyy`
    DayMonthYear,
}

/// Status of each person's most recent row in one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentRowQuery {
    pub table: String,
    #[serde(default = "default_person_column")]
    pub person_column: String,
    #[serde(default = "default_row_key_column")]
    pub row_key_column: String,
    #[serde(default = "default_time_column")]
    pub time_column: String,
    pub status: StatusRules,
}

/// Rules turning raw row fields into a status string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingRule>,
    pub category_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_column: Option<String>,
    #[serde(default)]
    pub substitutions: Vec<Substitution>,
}

/// A sample collected with no result recorded yet is pending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRule {
    pub collected_column: String,
    pub result_date_column: String,
}

/// Replacement for one raw category label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub category: String,
    pub action: SubstitutionAction,
}

impl Substitution {
    pub fn pass_numeric(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            action: SubstitutionAction::PassNumeric,
        }
    }

    pub fn fixed(category: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            action: SubstitutionAction::Fixed(code.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionAction {
    /// Output the numeric column as text
    PassNumeric,
    /// Output a fixed short code
    Fixed(String),
}

/// Trusted literal SQL returning exactly `(person_id, value)` per row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlQuery {
    pub sql: String,
}

fn default_person_column() -> String {
    "client_id".to_string()
}

fn default_row_key_column() -> String {
    "encounter_id".to_string()
}

fn default_time_column() -> String {
    "encounter_datetime".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_body() {
        let def = PersonDataDefinition::new(
            "x",
            "X",
            DefinitionBody::Sql(SqlQuery {
                sql: "SELECT 1, 2".into(),
            }),
        );
        assert_eq!(def.kind(), DefinitionKind::Sql);
    }

    #[test]
    fn test_dated_source_uses_value_as_recency() {
        let source = EventSource::dated("t", "received_date");
        assert_eq!(source.recency_column, "received_date");
        assert_eq!(source.value_column, "received_date");
        assert_eq!(source.anchor_column, "encounter_datetime");
        assert_eq!(source.person_column, "client_id");
        assert_eq!(source.row_key_column, "encounter_id");
    }
}
