//! Built-in reports

use crate::{DataSetDefinition, PersonColumn, RepeatingSection, ReportDefinition, ReportDesign, ReportParameter};
use ssemr_reports_eval::vl;

pub const ART_INITIATIONS_REPORT_UUID: &str = "1f4b4d0e-6c5a-4c7e-9a51-0c2b8d7f3a11";
pub const ART_INITIATIONS_TEMPLATE_UUID: &str = "6a9d2c41-8b3e-4f10-a2d7-5e6f7a8b9c12";
pub const AFT_INITIATIONS_REPORT_UUID: &str = "3c7e9f12-4a5b-4d6c-8e9f-1a2b3c4d5e13";
pub const AFT_INITIATIONS_TEMPLATE_UUID: &str = "9b8a7c6d-5e4f-4a3b-9c2d-1e0f2a3b4c14";

const ART_INITIATIONS_QUERY: &str = "SELECT p.person_name_long AS person_name, p.age, p.birthdate, \
    e.date_first_tested_positive, e.encounter_datetime \
    FROM {schema}.ssemr_flat_encounter_hiv_care_enrolment e \
    INNER JOIN {schema}.mamba_dim_person p ON e.client_id = p.person_id \
    ORDER BY e.encounter_datetime DESC LIMIT 10";

/// Most recent ART enrolments with patient demographics
pub fn art_initiations_register() -> (ReportDefinition, Vec<ReportDesign>) {
    let definition = ReportDefinition::new(ART_INITIATIONS_REPORT_UUID, "ART Initiations Register")
        .with_description("Listing of ART Initiations from ETL")
        .with_dataset(
            "ART_INITIATIONS",
            DataSetDefinition::sql("ART Initiations", ART_INITIATIONS_QUERY),
        );
    let design = ReportDesign::new(
        ART_INITIATIONS_TEMPLATE_UUID,
        "Listing of ART Initiations from ETL",
        "art_initiations.xls",
    )
    .with_section(RepeatingSection::new(1, 3, "ART_INITIATIONS"))
    .with_sort_weight(5000);
    (definition, vec![design])
}

/// Viral load follow-up per person as of the end date
pub fn aft_initiations_register() -> (ReportDefinition, Vec<ReportDesign>) {
    let received = vl::date_vl_sample_received();
    let repeat = vl::repeat_vl_result();
    let definition = ReportDefinition::new(AFT_INITIATIONS_REPORT_UUID, "AFT Initiations Register")
        .with_description("Listing of AFT Initiations from ETL")
        .with_parameter(ReportParameter::date("endDate", "End Date"))
        .with_dataset(
            "AFT_INITIATIONS",
            DataSetDefinition::person(
                "AFT Initiations",
                vec![
                    PersonColumn::new(received.name, received.id),
                    PersonColumn::new(repeat.name, repeat.id),
                ],
            ),
        );
    let design = ReportDesign::new(
        AFT_INITIATIONS_TEMPLATE_UUID,
        "Listing of AFT Initiations from ETL",
        "aft_initiations.xls",
    )
    .with_section(RepeatingSection::new(1, 2, "AFT_INITIATIONS"));
    (definition, vec![design])
}

/// Every built-in report, in registration order
pub fn standard_reports() -> Vec<(ReportDefinition, Vec<ReportDesign>)> {
    vec![art_initiations_register(), aft_initiations_register()]
}
