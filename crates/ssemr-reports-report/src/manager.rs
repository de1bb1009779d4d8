//! Report registration and evaluation

use crate::error::{ReportError, ReportResult, ResourceError};
use crate::{library, DataSetDefinition, DataSetTable, PersonColumn, ReportData, ReportDefinition, ReportDesign, TemplateStore};
use indexmap::IndexMap;
use ssemr_reports_eval::{EvalResult, EvaluationContext, EvaluationService, PersonDataService, QueryBuilderFactory};
use ssemr_reports_types::{PersonId, Value};
use ssemr_reports_warehouse::Warehouse;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, info_span};

/// Column holding the person id in person datasets
pub const PERSON_ID_COLUMN: &str = "person_id";

/// A report with its designs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredReport {
    pub definition: ReportDefinition,
    pub designs: Vec<ReportDesign>,
}

/// Registered reports and the services that evaluate their datasets
#[derive(Debug)]
pub struct ReportManager {
    reports: IndexMap<String, RegisteredReport>,
    persons: PersonDataService,
    service: EvaluationService,
    factory: QueryBuilderFactory,
    templates: Option<TemplateStore>,
}

impl ReportManager {
    pub fn new(persons: PersonDataService, service: EvaluationService, factory: QueryBuilderFactory) -> Self {
        Self {
            reports: IndexMap::new(),
            persons,
            service,
            factory,
            templates: None,
        }
    }

    /// Built-in definitions and reports over `warehouse`
    pub fn standard(warehouse: Arc<dyn Warehouse>, schema: &str) -> ReportResult<Self> {
        let persons = PersonDataService::standard(warehouse.clone(), schema)?;
        let factory = QueryBuilderFactory::new(schema)?;
        let mut manager = Self::new(persons, EvaluationService::new(warehouse), factory);
        for (definition, designs) in library::standard_reports() {
            manager.register(definition, designs)?;
        }
        Ok(manager)
    }

    /// Check design templates against `store` from now on
    pub fn with_templates(mut self, store: TemplateStore) -> Self {
        self.templates = Some(store);
        self
    }

    pub fn templates(&self) -> Option<&TemplateStore> {
        self.templates.as_ref()
    }

    pub fn persons(&self) -> &PersonDataService {
        &self.persons
    }

    /// Register a report.
    ///
    /// Every repeating section must name a dataset of the report, and when a
    /// template store is configured every design's template must exist.
    pub fn register(&mut self, definition: ReportDefinition, designs: Vec<ReportDesign>) -> ReportResult<()> {
        if self.reports.contains_key(&definition.uuid) {
            return Err(ReportError::DuplicateReport { uuid: definition.uuid });
        }
        for design in &designs {
            if let Some(section) = design
                .repeating_sections
                .iter()
                .find(|s| !definition.datasets.contains_key(&s.dataset))
            {
                return Err(ReportError::invalid_design(format!(
                    "design '{}' repeats unknown dataset '{}'",
                    design.name, section.dataset
                )));
            }
            if let Some(store) = &self.templates {
                let path = store.path(&design.template)?;
                if !path.is_file() {
                    return Err(ResourceError::NotFound { path }.into());
                }
            }
        }

        debug!(uuid = %definition.uuid, name = %definition.name, "registered report");
        self.reports
            .insert(definition.uuid.clone(), RegisteredReport { definition, designs });
        Ok(())
    }

    /// Find a report by uuid, or by name ignoring case
    pub fn get(&self, key: &str) -> ReportResult<&RegisteredReport> {
        self.reports
            .get(key)
            .or_else(|| {
                self.reports
                    .values()
                    .find(|r| r.definition.name.eq_ignore_ascii_case(key))
            })
            .ok_or_else(|| ReportError::UnknownReport { key: key.to_string() })
    }

    /// Reports in registration order
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredReport> {
        self.reports.values()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Evaluate every dataset of a report. The first failing dataset aborts
    /// the run.
    pub fn evaluate(&self, key: &str, ctx: &EvaluationContext) -> ReportResult<ReportData> {
        let report = &self.get(key)?.definition;
        let span = info_span!("report", uuid = %report.uuid, period = %ctx.period());
        let _entered = span.enter();

        let mut datasets = IndexMap::with_capacity(report.datasets.len());
        for (dataset_key, dataset) in &report.datasets {
            let table = self
                .evaluate_dataset(dataset, ctx)
                .map_err(|source| ReportError::DataSet {
                    dataset: dataset_key.clone(),
                    source,
                })?;
            debug!(dataset = %dataset_key, rows = table.len(), "dataset evaluated");
            datasets.insert(dataset_key.clone(), table);
        }

        info!(report = %report.name, datasets = datasets.len(), "report evaluated");
        Ok(ReportData {
            report: report.uuid.clone(),
            name: report.name.clone(),
            period: ctx.period(),
            datasets,
        })
    }

    fn evaluate_dataset(&self, dataset: &DataSetDefinition, ctx: &EvaluationContext) -> EvalResult<DataSetTable> {
        match dataset {
            DataSetDefinition::Sql { name, query } => {
                let mut builder = self.factory.builder(ctx);
                builder.append(self.factory.expand_schema(query));
                let rows = self.service.evaluate_rows(&builder)?;
                Ok(DataSetTable::from_rows(name.as_str(), rows))
            }
            DataSetDefinition::Person { name, columns } => self.person_dataset(name, columns, ctx),
        }
    }

    /// One row per person: the cohort when there is one, otherwise every
    /// person with a value in any column
    fn person_dataset(&self, name: &str, columns: &[PersonColumn], ctx: &EvaluationContext) -> EvalResult<DataSetTable> {
        let results = columns
            .iter()
            .map(|c| self.persons.evaluate_by_id(&c.definition, ctx))
            .collect::<EvalResult<Vec<_>>>()?;

        let persons: BTreeSet<PersonId> = match ctx.cohort() {
            Some(cohort) => cohort.clone(),
            None => results.iter().flat_map(|r| r.persons()).collect(),
        };

        let mut header = Vec::with_capacity(columns.len() + 1);
        header.push(PERSON_ID_COLUMN.to_string());
        header.extend(columns.iter().map(|c| c.label.clone()));

        let mut table = DataSetTable::new(name, header);
        for person in persons {
            let mut row = Vec::with_capacity(columns.len() + 1);
            row.push(Value::Integer(person.get()));
            row.extend(results.iter().map(|r| r.get(person).cloned().unwrap_or_default()));
            table.rows.push(row);
        }
        Ok(table)
    }
}
