//! Report command implementation

use super::output::{Tabular, TextTable};
use anyhow::{Context, Result};
use ssemr_reports_eval::EvaluationContext;
use ssemr_reports_report::{ReportData, ReportManager};

/// Evaluate every dataset of a report
pub fn report(manager: &ReportManager, key: &str, ctx: &EvaluationContext) -> Result<ReportData> {
    manager
        .evaluate(key, ctx)
        .with_context(|| format!("Failed to run report {key}"))
}

impl Tabular for ReportData {
    fn tables(&self) -> Vec<TextTable> {
        self.datasets
            .iter()
            .map(|(key, dataset)| {
                let mut table = TextTable::new(format!("{} / {key} ({})", self.name, self.period), dataset.columns.clone());
                table.rows = dataset
                    .rows
                    .iter()
                    .map(|row| row.iter().map(ToString::to_string).collect())
                    .collect();
                table
            })
            .collect()
    }
}
