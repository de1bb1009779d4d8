//! List command implementation

use super::output::{Tabular, TextTable};
use serde::Serialize;
use ssemr_reports_report::ReportManager;

/// A registered person data definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionSummary {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub description: Option<String>,
}

/// A registered report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub uuid: String,
    pub name: String,
    pub datasets: Vec<String>,
    pub templates: Vec<String>,
}

/// Everything a run can evaluate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub definitions: Vec<DefinitionSummary>,
    pub reports: Vec<ReportSummary>,
}

/// Collect definitions and reports in registration order
pub fn list(manager: &ReportManager) -> Listing {
    let definitions = manager
        .persons()
        .definitions()
        .iter()
        .map(|d| DefinitionSummary {
            id: d.id.to_string(),
            name: d.name.clone(),
            kind: d.kind().to_string(),
            description: d.description.clone(),
        })
        .collect();
    let reports = manager
        .iter()
        .map(|r| ReportSummary {
            uuid: r.definition.uuid.clone(),
            name: r.definition.name.clone(),
            datasets: r.definition.datasets.keys().cloned().collect(),
            templates: r.designs.iter().map(|d| d.template.clone()).collect(),
        })
        .collect();
    Listing { definitions, reports }
}

impl Tabular for Listing {
    fn tables(&self) -> Vec<TextTable> {
        let mut definitions = TextTable::new(
            "Definitions",
            vec!["Id".to_string(), "Name".to_string(), "Kind".to_string()],
        );
        definitions.rows = self
            .definitions
            .iter()
            .map(|d| vec![d.id.clone(), d.name.clone(), d.kind.clone()])
            .collect();

        let mut reports = TextTable::new(
            "Reports",
            vec!["Uuid".to_string(), "Name".to_string(), "Datasets".to_string()],
        );
        reports.rows = self
            .reports
            .iter()
            .map(|r| vec![r.uuid.clone(), r.name.clone(), r.datasets.join(", ")])
            .collect();

        vec![definitions, reports]
    }
}
