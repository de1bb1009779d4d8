//! Query builder

use crate::scanner::{segments, Segment};
use crate::{BindingError, BoundValue, Parameter, ParameterType};
use indexmap::IndexMap;
use std::fmt;

/// Report start date parameter name
pub const START_DATE: &str = "startDate";
/// Report end date parameter name
pub const END_DATE: &str = "endDate";
/// Optional person cohort parameter name
pub const COHORT: &str = "cohort";

/// Accumulates query text and named, typed parameters.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    text: String,
    parameters: IndexMap<String, Parameter>,
    expected: IndexMap<String, ParameterType>,
}

impl QueryBuilder {
    /// Create an empty builder with no declared placeholders
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with the report parameters pre-declared:
    /// `startDate` and `endDate` as dates, `cohort` as a set of person ids.
    pub fn with_standard_parameters() -> Self {
        let mut builder = Self::new();
        builder
            .expect(START_DATE, ParameterType::Date)
            .expect(END_DATE, ParameterType::Date)
            .expect(COHORT, ParameterType::IntegerSet);
        builder
    }

    /// Append a trusted literal fragment
    pub fn append(&mut self, fragment: impl AsRef<str>) -> &mut Self {
        self.text.push_str(fragment.as_ref());
        self
    }

    /// Bind a value to a named placeholder, replacing any earlier binding
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Parameter>) -> &mut Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Declare the type a placeholder must be bound with
    pub fn expect(&mut self, name: impl Into<String>, parameter_type: ParameterType) -> &mut Self {
        self.expected.insert(name.into(), parameter_type);
        self
    }

    /// The accumulated template text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Get a bound parameter
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    /// Check whether the template references a placeholder
    pub fn references(&self, name: &str) -> bool {
        segments(&self.text)
            .iter()
            .any(|s| matches!(s, Segment::Placeholder(p) if *p == name))
    }

    /// Render positional SQL.
    ///
    /// Each distinct placeholder gets stable `?N` indices on first use, so a
    /// parameter referenced twice is bound once. Sets expand to one index per
    /// element; an empty set renders as `NULL`. Parameters that are bound but
    /// never referenced are ignored.
    pub fn render(&self) -> Result<RenderedQuery, BindingError> {
        let mut sql = String::with_capacity(self.text.len());
        let mut values: Vec<BoundValue> = Vec::new();
        let mut assigned: IndexMap<&str, String> = IndexMap::new();

        for segment in segments(&self.text) {
            match segment {
                Segment::Text(text) => sql.push_str(text),
                Segment::Placeholder(name) => {
                    if let Some(rendered) = assigned.get(name) {
                        sql.push_str(rendered);
                        continue;
                    }
                    let parameter = self.checked_parameter(name)?;
                    let rendered = push_values(parameter, &mut values);
                    sql.push_str(&rendered);
                    assigned.insert(name, rendered);
                }
            }
        }

        Ok(RenderedQuery { sql, values })
    }

    fn checked_parameter(&self, name: &str) -> Result<&Parameter, BindingError> {
        let parameter = self
            .parameters
            .get(name)
            .ok_or_else(|| BindingError::unbound(name))?;
        if let Some(expected) = self.expected.get(name) {
            let found = parameter.parameter_type();
            if *expected != found {
                return Err(BindingError::type_mismatch(name, *expected, found));
            }
        }
        Ok(parameter)
    }
}

fn push_values(parameter: &Parameter, values: &mut Vec<BoundValue>) -> String {
    let mut next = |value: BoundValue| {
        values.push(value);
        format!("?{}", values.len())
    };
    match parameter {
        Parameter::Date(d) => next(BoundValue::Date(*d)),
        Parameter::Integer(i) => next(BoundValue::Integer(*i)),
        Parameter::String(s) => next(BoundValue::String(s.clone())),
        Parameter::IntegerSet(set) if set.is_empty() => "NULL".to_string(),
        Parameter::IntegerSet(set) => set
            .iter()
            .map(|i| next(BoundValue::Integer(*i)))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Query text with positional placeholders and the values to bind to them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedQuery {
    pub sql: String,
    /// `values[0]` binds `?1`
    pub values: Vec<BoundValue>,
}

impl RenderedQuery {
    /// A query with no parameters
    pub fn literal(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            values: Vec::new(),
        }
    }
}

impl fmt::Display for RenderedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.values.is_empty() {
            let values: Vec<String> = self.values.iter().map(ToString::to_string).collect();
            write!(f, " [{}]", values.join(", "))?;
        }
        Ok(())
    }
}
