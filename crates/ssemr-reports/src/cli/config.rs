//! Run configuration
//!
//! ```json
//! {
//!   "warehouse": "/var/lib/ssemr/analysis.db",
//!   "attach": "/var/lib/ssemr/ssemr_etl.db",
//!   "schema": "ssemr_etl",
//!   "templates": "/etc/ssemr/templates",
//!   "cohort": [1, 2, 3]
//! }
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use ssemr_reports_eval::{EvaluationService, PersonDataService, QueryBuilderFactory};
use ssemr_reports_report::{ReportManager, TemplateStore};
use ssemr_reports_warehouse::SqliteWarehouse;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_SCHEMA: &str = "ssemr_etl";

/// Where the warehouse lives and how reports are set up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RunConfig {
    /// Main database file; in-memory when absent
    #[serde(default)]
    pub warehouse: Option<PathBuf>,
    /// Database file attached under `schema`
    #[serde(default)]
    pub attach: Option<PathBuf>,
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Template directory checked at report registration
    #[serde(default)]
    pub templates: Option<PathBuf>,
    /// Persons evaluated when the command line names none
    #[serde(default)]
    pub cohort: Option<Vec<i64>>,
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            warehouse: None,
            attach: None,
            schema: default_schema(),
            templates: None,
            cohort: None,
        }
    }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub warehouse: Option<PathBuf>,
    pub attach: Option<PathBuf>,
    pub schema: Option<String>,
    pub templates: Option<PathBuf>,
}

impl RunConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse run config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Load `path` when given, otherwise start from defaults, then apply
    /// `overrides`
    pub fn resolve(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        Ok(config.with_overrides(overrides))
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(warehouse) = overrides.warehouse {
            self.warehouse = Some(warehouse);
        }
        if let Some(attach) = overrides.attach {
            self.attach = Some(attach);
        }
        if let Some(schema) = overrides.schema {
            self.schema = schema;
        }
        if let Some(templates) = overrides.templates {
            self.templates = Some(templates);
        }
        self
    }

    /// Open the configured warehouse and attach the ETL schema
    pub fn open_warehouse(&self) -> Result<Arc<SqliteWarehouse>> {
        if self.warehouse.is_none() && self.attach.is_none() {
            bail!("No warehouse configured; set `warehouse` or `attach`");
        }
        let warehouse = match &self.warehouse {
            Some(path) => SqliteWarehouse::open(path)
                .with_context(|| format!("Failed to open warehouse: {}", path.display()))?,
            None => SqliteWarehouse::open_in_memory().context("Failed to open in-memory warehouse")?,
        };
        if let Some(path) = &self.attach {
            warehouse
                .attach(&self.schema, path)
                .with_context(|| format!("Failed to attach {} as {}", path.display(), self.schema))?;
        }
        debug!(schema = %self.schema, "warehouse opened");
        Ok(Arc::new(warehouse))
    }

    /// Report manager with the built-in definitions and reports
    pub fn report_manager(&self) -> Result<ReportManager> {
        let warehouse = self.open_warehouse()?;
        let manager = match &self.templates {
            Some(root) => {
                let store = TemplateStore::new(root);
                let (persons, service, factory) = standard_services(warehouse, &self.schema)?;
                let mut manager = ReportManager::new(persons, service, factory).with_templates(store);
                for (definition, designs) in ssemr_reports_report::library::standard_reports() {
                    manager
                        .register(definition, designs)
                        .context("Failed to register built-in report")?;
                }
                manager
            }
            None => ReportManager::standard(warehouse, &self.schema).context("Failed to set up reports")?,
        };
        Ok(manager)
    }
}

fn standard_services(
    warehouse: Arc<SqliteWarehouse>,
    schema: &str,
) -> Result<(PersonDataService, EvaluationService, QueryBuilderFactory)> {
    let persons = PersonDataService::standard(warehouse.clone(), schema).context("Failed to set up evaluators")?;
    let factory = QueryBuilderFactory::new(schema).context("Invalid schema name")?;
    Ok((persons, EvaluationService::new(warehouse), factory))
}
