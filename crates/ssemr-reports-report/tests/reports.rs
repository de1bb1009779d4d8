//! Report registration and evaluation against a SQLite warehouse

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use ssemr_reports_eval::{EvalError, EvaluationContext};
use ssemr_reports_report::library::{
    aft_initiations_register, art_initiations_register, AFT_INITIATIONS_REPORT_UUID, ART_INITIATIONS_REPORT_UUID,
};
use ssemr_reports_report::{
    DataSetDefinition, RepeatingSection, ReportDefinition, ReportDesign, ReportError, ReportManager, ResourceError,
    TemplateStore,
};
use ssemr_reports_types::{PersonId, Value};
use ssemr_reports_warehouse::SqliteWarehouse;
use std::sync::Arc;

const FIXTURE: &str = "
CREATE TABLE ssemr_etl.ssemr_flat_encounter_hiv_care_enrolment (
    encounter_id INTEGER PRIMARY KEY, client_id INTEGER, encounter_datetime TEXT, date_first_tested_positive TEXT
);
CREATE TABLE ssemr_etl.mamba_dim_person (
    person_id INTEGER PRIMARY KEY, person_name_long TEXT, age INTEGER, birthdate TEXT
);
CREATE TABLE ssemr_etl.ssemr_flat_encounter_hiv_care_follow_up (
    encounter_id INTEGER PRIMARY KEY, client_id INTEGER, encounter_datetime TEXT, date_vl_results_received TEXT
);
CREATE TABLE ssemr_etl.ssemr_flat_encounter_high_viral_load (
    encounter_id INTEGER PRIMARY KEY, client_id INTEGER, encounter_datetime TEXT,
    date_of_collection_of_repeat_vl TEXT, repeat_vl_result_date TEXT, repeat_vl_results TEXT, repeat_vl_value REAL
);
INSERT INTO ssemr_etl.ssemr_flat_encounter_hiv_care_follow_up VALUES
    (1, 1, '2024-01-10 09:00:00', '2024-01-10'),
    (2, 4, '2024-02-01 09:00:00', '2024-01-30');
INSERT INTO ssemr_etl.ssemr_flat_encounter_high_viral_load VALUES
    (10, 1, '2024-02-15 10:00:00', '2024-02-01', '2024-02-14', 'Viral Load Value', 550.0),
    (11, 2, '2024-03-01 10:00:00', '2024-03-01', NULL, NULL, NULL);
";

fn warehouse() -> Arc<SqliteWarehouse> {
    warehouse_in("ssemr_etl")
}

/// The fixture with its tables in an attached database named `schema`
fn warehouse_in(schema: &str) -> Arc<SqliteWarehouse> {
    let warehouse = SqliteWarehouse::open_in_memory().unwrap();
    warehouse.attach(schema, ":memory:").unwrap();
    warehouse
        .execute_batch(&FIXTURE.replace("ssemr_etl.", &format!("{schema}.")))
        .unwrap();
    for i in 1..=12 {
        warehouse
            .execute_batch(&format!(
                "INSERT INTO {schema}.mamba_dim_person VALUES ({i}, 'Person {i}', {age}, '1990-01-{i:02}');
                 INSERT INTO {schema}.ssemr_flat_encounter_hiv_care_enrolment
                     VALUES ({i}, {i}, '2024-01-{i:02} 08:00:00', '2023-12-{i:02}');",
                age = 20 + i
            ))
            .unwrap();
    }
    Arc::new(warehouse)
}

fn manager() -> ReportManager {
    ReportManager::standard(warehouse(), "ssemr_etl").unwrap()
}

fn end(s: &str) -> EvaluationContext {
    EvaluationContext::builder()
        .end_date(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
        .build()
        .unwrap()
}

#[test]
fn standard_reports_are_listed_in_order() {
    let manager = manager();
    let names: Vec<&str> = manager.iter().map(|r| r.definition.name.as_str()).collect();
    assert_eq!(names, vec!["ART Initiations Register", "AFT Initiations Register"]);

    assert_eq!(
        manager.get("art initiations register").unwrap().definition.uuid,
        ART_INITIATIONS_REPORT_UUID
    );
    assert_eq!(
        manager.get(AFT_INITIATIONS_REPORT_UUID).unwrap().definition.name,
        "AFT Initiations Register"
    );
    assert!(matches!(manager.get("nope"), Err(ReportError::UnknownReport { .. })));
}

#[test]
fn art_register_lists_latest_ten_enrolments() {
    let data = manager().evaluate(ART_INITIATIONS_REPORT_UUID, &end("2024-03-31")).unwrap();
    let table = data.dataset("ART_INITIATIONS").unwrap();

    assert_eq!(
        table.columns,
        vec!["person_name", "age", "birthdate", "date_first_tested_positive", "encounter_datetime"]
    );
    assert_eq!(table.len(), 10);
    assert_eq!(table.cell(0, "person_name"), Some(&Value::string("Person 12")));
    assert_eq!(table.cell(0, "age"), Some(&Value::Integer(32)));
    assert_eq!(table.cell(9, "person_name"), Some(&Value::string("Person 3")));
}

#[test]
fn art_register_follows_the_configured_schema() {
    let manager = ReportManager::standard(warehouse_in("reporting"), "reporting").unwrap();
    let data = manager.evaluate(ART_INITIATIONS_REPORT_UUID, &end("2024-03-31")).unwrap();
    let table = data.dataset("ART_INITIATIONS").unwrap();

    assert_eq!(table.len(), 10);
    assert_eq!(table.cell(0, "person_name"), Some(&Value::string("Person 12")));
}

#[test]
fn aft_register_joins_person_columns() {
    let data = manager().evaluate("AFT Initiations Register", &end("2024-03-31")).unwrap();
    let table = data.dataset("AFT_INITIATIONS").unwrap();

    assert_eq!(table.columns, vec!["person_id", "Date VL Sample Received", "Repeat VL Result"]);
    assert_eq!(
        table.rows,
        vec![
            vec![Value::Integer(1), Value::string("14-02-2024"), Value::string("550")],
            vec![Value::Integer(2), Value::Null, Value::string("Pending Result")],
            vec![Value::Integer(4), Value::string("30-01-2024"), Value::Null],
        ]
    );
}

#[test]
fn aft_register_rows_follow_the_cohort() {
    let ctx = EvaluationContext::builder()
        .end_date(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap())
        .cohort([PersonId(1), PersonId(2), PersonId(3)])
        .build()
        .unwrap();
    let data = manager().evaluate(AFT_INITIATIONS_REPORT_UUID, &ctx).unwrap();
    let table = data.dataset("AFT_INITIATIONS").unwrap();

    let persons: Vec<&Value> = table.rows.iter().map(|r| &r[0]).collect();
    assert_eq!(persons, vec![&Value::Integer(1), &Value::Integer(2), &Value::Integer(3)]);
    assert_eq!(table.rows[2], vec![Value::Integer(3), Value::Null, Value::Null]);
}

#[test]
fn failing_dataset_aborts_the_report() {
    let mut manager = manager();
    let report = ReportDefinition::new("broken-report", "Broken")
        .with_dataset("FIRST", DataSetDefinition::sql("First", "SELECT 1 AS one"))
        .with_dataset("MISSING", DataSetDefinition::sql("Missing", "SELECT * FROM ssemr_etl.nowhere"));
    manager.register(report, Vec::new()).unwrap();

    let err = manager.evaluate("broken-report", &end("2024-03-31")).unwrap_err();
    match err {
        ReportError::DataSet { dataset, source } => {
            assert_eq!(dataset, "MISSING");
            assert!(matches!(source, EvalError::Warehouse(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn registration_validates_designs() {
    let mut manager = manager();
    let (art, designs) = art_initiations_register();
    assert!(matches!(
        manager.register(art, designs),
        Err(ReportError::DuplicateReport { .. })
    ));

    let report = ReportDefinition::new("other", "Other").with_dataset("A", DataSetDefinition::sql("A", "SELECT 1"));
    let design = ReportDesign::new("d", "Other design", "other.xls").with_section(RepeatingSection::new(1, 2, "B"));
    assert!(matches!(
        manager.register(report, vec![design]),
        Err(ReportError::InvalidDesign { .. })
    ));
}

#[test]
fn registration_checks_templates_when_a_store_is_configured() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("art_initiations.xls"), b"xls").unwrap();
    assert!(manager().templates().is_none());

    let eval = ssemr_reports_eval::PersonDataService::standard(warehouse(), "ssemr_etl").unwrap();
    let mut manager = ReportManager::new(
        eval,
        ssemr_reports_eval::EvaluationService::new(warehouse()),
        ssemr_reports_eval::QueryBuilderFactory::new("ssemr_etl").unwrap(),
    )
    .with_templates(TemplateStore::new(dir.path()));

    let (art, art_designs) = art_initiations_register();
    manager.register(art, art_designs).unwrap();

    let (aft, aft_designs) = aft_initiations_register();
    let err = manager.register(aft, aft_designs).unwrap_err();
    assert!(matches!(err, ReportError::Resource(ResourceError::NotFound { .. })));
    assert_eq!(manager.len(), 1);
}

#[test]
fn report_data_serializes_for_output() {
    let data = manager().evaluate(AFT_INITIATIONS_REPORT_UUID, &end("2024-03-31")).unwrap();
    let json = serde_json::to_value(&data).unwrap();

    assert_eq!(json["report"], AFT_INITIATIONS_REPORT_UUID);
    assert_eq!(json["period"]["end"], "2024-03-31");
    assert_eq!(json["datasets"]["AFT_INITIATIONS"]["rows"][1][2], "Pending Result");
    assert_eq!(json["datasets"]["AFT_INITIATIONS"]["rows"][1][1], serde_json::Value::Null);
}
