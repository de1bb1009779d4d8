//! Typed query parameters

use chrono::NaiveDate;
use ssemr_reports_types::PersonId;
use std::collections::BTreeSet;
use std::fmt;

/// The declared type of a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    Date,
    Integer,
    String,
    IntegerSet,
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date => write!(f, "Date"),
            Self::Integer => write!(f, "Integer"),
            Self::String => write!(f, "String"),
            Self::IntegerSet => write!(f, "Set<Integer>"),
        }
    }
}

/// A value bound to a named placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    Date(NaiveDate),
    Integer(i64),
    String(String),
    /// Expands to one positional placeholder per element
    IntegerSet(BTreeSet<i64>),
}

impl Parameter {
    /// Get the type of this parameter
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            Self::Date(_) => ParameterType::Date,
            Self::Integer(_) => ParameterType::Integer,
            Self::String(_) => ParameterType::String,
            Self::IntegerSet(_) => ParameterType::IntegerSet,
        }
    }

    /// Build a set parameter from person identifiers
    pub fn cohort<'a>(persons: impl IntoIterator<Item = &'a PersonId>) -> Self {
        Self::IntegerSet(persons.into_iter().map(|p| p.get()).collect())
    }
}

impl From<NaiveDate> for Parameter {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<i64> for Parameter {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<&str> for Parameter {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Parameter {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<BTreeSet<i64>> for Parameter {
    fn from(set: BTreeSet<i64>) -> Self {
        Self::IntegerSet(set)
    }
}

/// A scalar value in a rendered query's positional parameter list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundValue {
    Date(NaiveDate),
    Integer(i64),
    String(String),
}

impl fmt::Display for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "'{s}'"),
        }
    }
}
