//! JSON rendering of values as reports consume them

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::json;
use ssemr_reports_types::{PersonId, ReportingPeriod, Value};

#[test]
fn test_values_serialize_as_plain_json() {
    let values = vec![
        Value::Null,
        Value::Boolean(true),
        Value::Integer(42),
        Value::Decimal(Decimal::new(5500, 1)),
        Value::string("Pending Result"),
        Value::Date(NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()),
    ];

    let rendered = serde_json::to_value(&values).unwrap();
    assert_eq!(
        rendered,
        json!([null, true, 42, "550", "Pending Result", "2023-02-01"])
    );
}

#[test]
fn test_person_id_is_transparent() {
    let id = PersonId(1001);
    assert_eq!(serde_json::to_value(id).unwrap(), json!(1001));
    let back: PersonId = serde_json::from_value(json!(1001)).unwrap();
    assert_eq!(back, id);
}

#[test]
fn test_period_round_trips_through_config_json() {
    let raw = json!({ "start": "2024-01-01", "end": "2024-03-31" });
    let period: ReportingPeriod = serde_json::from_value(raw).unwrap();
    assert_eq!(period.start, NaiveDate::from_ymd_opt(2024, 1, 1));
    assert_eq!(period.end, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
}
