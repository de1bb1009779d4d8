//! Runtime values
//!
//! `Value` is the scalar a warehouse cell or an evaluated per-person attribute
//! holds. It is deliberately small: reports only ever need text, numbers,
//! dates and null.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::date::{parse_date, parse_datetime};

/// Warehouse person identifier (`client_id` / `person_id`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub i64);

impl PersonId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for PersonId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A scalar value, possibly null.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Value {
    /// Missing / SQL NULL
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    /// Arbitrary precision decimal (lab values, REAL columns)
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean(_) => "Boolean",
            Self::Integer(_) => "Integer",
            Self::Decimal(_) => "Decimal",
            Self::String(_) => "String",
            Self::Date(_) => "Date",
            Self::DateTime(_) => "DateTime",
        }
    }

    /// Try to get as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as an integer. Whole decimals are accepted.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Decimal(d) if d.fract().is_zero() => i64::try_from(*d).ok(),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to get as a calendar date.
    ///
    /// Text columns are parsed, since SQLite and most ETL flat tables store
    /// dates as ISO strings.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::DateTime(dt) => Some(dt.date()),
            Self::String(s) => parse_date(s).ok(),
            _ => None,
        }
    }

    /// Try to get as a date-time; plain dates are read as midnight
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            Self::Date(d) => d.and_hms_opt(0, 0, 0),
            Self::String(s) => parse_datetime(s).ok(),
            _ => None,
        }
    }

    /// Render the value as report text, `None` for null.
    ///
    /// Decimals are normalized so that a stored `550.0` prints as `550`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{}", d.normalize()),
            Self::String(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            other => serializer.collect_str(other),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Self::Decimal(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Self::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_decimal_display_is_normalized() {
        let v = Value::Decimal(Decimal::from_str("550.00").unwrap());
        assert_eq!(v.to_string(), "550");

        let v = Value::Decimal(Decimal::from_str("1.50").unwrap());
        assert_eq!(v.to_string(), "1.5");
    }

    #[test]
    fn test_as_date_from_text() {
        let v = Value::string("2023-01-10 09:30:00");
        assert_eq!(v.as_date(), NaiveDate::from_ymd_opt(2023, 1, 10));
        assert_eq!(Value::Integer(3).as_date(), None);
        assert_eq!(Value::Null.as_date(), None);
    }

    #[test]
    fn test_as_integer() {
        assert_eq!(Value::Integer(7).as_integer(), Some(7));
        assert_eq!(Value::Decimal(Decimal::new(70, 1)).as_integer(), Some(7));
        assert_eq!(Value::Decimal(Decimal::new(75, 1)).as_integer(), None);
        assert_eq!(Value::string(" 12 ").as_integer(), Some(12));
    }

    #[test]
    fn test_to_text() {
        assert_eq!(Value::Null.to_text(), None);
        assert_eq!(Value::string("BDL").to_text().as_deref(), Some("BDL"));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(4_i64)), Value::Integer(4));
    }
}
