//! Evaluate command implementation

use super::output::{Tabular, TextTable};
use anyhow::{Context, Result};
use ssemr_reports_eval::{DefinitionId, EvaluatedPersonData, EvaluationContext, PersonDataDefinition, PersonDataService};
use std::sync::Arc;
use tracing::info;

/// Find a definition by id, or by name ignoring case
pub fn find_definition(service: &PersonDataService, key: &str) -> Result<Arc<PersonDataDefinition>> {
    let library = service.definitions();
    if let Ok(definition) = library.get(&DefinitionId::new(key)) {
        return Ok(definition);
    }
    library
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(key))
        .cloned()
        .with_context(|| format!("Unknown definition: {key}"))
}

/// Evaluate one definition for the context's period and cohort
pub fn evaluate(service: &PersonDataService, key: &str, ctx: &EvaluationContext) -> Result<Arc<EvaluatedPersonData>> {
    let definition = find_definition(service, key)?;
    let result = service
        .evaluate(&definition, ctx)
        .with_context(|| format!("Failed to evaluate {}", definition.name))?;
    info!(definition = %definition.id, persons = result.len(), "evaluation finished");
    Ok(result)
}

impl Tabular for EvaluatedPersonData {
    fn tables(&self) -> Vec<TextTable> {
        let mut table = TextTable::new(
            format!("{} ({})", self.definition, self.period),
            vec!["Person".to_string(), "Value".to_string()],
        );
        table.rows = self
            .iter()
            .map(|(person, value)| vec![person.to_string(), value.to_string()])
            .collect();
        vec![table]
    }
}
