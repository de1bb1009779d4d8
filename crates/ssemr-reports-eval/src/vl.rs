//! Viral load definitions
//!
//! Table names are bare; the evaluator's `QueryBuilderFactory` qualifies them
//! with the warehouse schema (`ssemr_etl` in production).

use crate::{
    CurrentRowQuery, DefinitionBody, EventSource, LatestValueQuery, PendingRule, PersonDataDefinition, StatusRules,
    Substitution, ValueFormat,
};

pub const HIV_CARE_FOLLOW_UP: &str = "ssemr_flat_encounter_hiv_care_follow_up";
pub const HIGH_VIRAL_LOAD: &str = "ssemr_flat_encounter_high_viral_load";

/// Date the most recent VL sample result was received, across routine
/// follow-up and high viral load encounters, as `dd-mm-yyyy`
pub fn date_vl_sample_received() -> PersonDataDefinition {
    PersonDataDefinition::new(
        "date_vl_sample_received",
        "Date VL Sample Received",
        DefinitionBody::LatestValue(LatestValueQuery {
            sources: vec![
                EventSource::dated(HIV_CARE_FOLLOW_UP, "date_vl_results_received"),
                EventSource::dated(HIGH_VIRAL_LOAD, "repeat_vl_result_date"),
            ],
            format: ValueFormat::DayMonthYear,
        }),
    )
    .with_description("Latest VL result received date as of the report end date")
}

/// Status of the most recent repeat VL test
pub fn repeat_vl_result() -> PersonDataDefinition {
    PersonDataDefinition::new(
        "repeat_vl_result",
        "Repeat VL Result",
        DefinitionBody::CurrentRow(CurrentRowQuery {
            table: HIGH_VIRAL_LOAD.to_string(),
            person_column: "client_id".to_string(),
            row_key_column: "encounter_id".to_string(),
            time_column: "encounter_datetime".to_string(),
            status: StatusRules {
                pending: Some(PendingRule {
                    collected_column: "date_of_collection_of_repeat_vl".to_string(),
                    result_date_column: "repeat_vl_result_date".to_string(),
                }),
                category_column: "repeat_vl_results".to_string(),
                numeric_column: Some("repeat_vl_value".to_string()),
                substitutions: vec![
                    Substitution::pass_numeric("Viral Load Value"),
                    Substitution::fixed("Below Detectable (BDL)", "BDL"),
                ],
            },
        }),
    )
    .with_description("Repeat VL value, BDL, Pending Result, or the recorded outcome")
}

/// Every built-in definition, in registration order
pub fn standard_definitions() -> Vec<PersonDataDefinition> {
    vec![date_vl_sample_received(), repeat_vl_result()]
}
