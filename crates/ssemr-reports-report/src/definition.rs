//! Report and dataset definitions

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use ssemr_reports_eval::DefinitionId;

/// A report: named datasets evaluated together for one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDefinition {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub parameters: Vec<ReportParameter>,
    /// Keyed by the name designs refer to (e.g. `ART_INITIATIONS`)
    pub datasets: IndexMap<String, DataSetDefinition>,
}

impl ReportDefinition {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            description: String::new(),
            version: default_version(),
            parameters: Vec::new(),
            datasets: IndexMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_parameter(mut self, parameter: ReportParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Add a dataset under `key`, replacing any dataset with the same key
    pub fn with_dataset(mut self, key: impl Into<String>, dataset: DataSetDefinition) -> Self {
        self.datasets.insert(key.into(), dataset);
        self
    }
}

fn default_version() -> String {
    "1.0-SNAPSHOT".to_string()
}

/// A parameter a report asks for at run time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportParameter {
    pub name: String,
    pub label: String,
    pub kind: ParameterKind,
}

impl ReportParameter {
    pub fn date(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: ParameterKind::Date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Date,
    Integer,
    String,
    PersonSet,
}

/// How a dataset's rows are produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSetDefinition {
    /// Trusted literal SQL; columns are whatever the query returns
    Sql { name: String, query: String },
    /// One row per person, one column per evaluated definition
    Person { name: String, columns: Vec<PersonColumn> },
}

impl DataSetDefinition {
    pub fn sql(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self::Sql {
            name: name.into(),
            query: query.into(),
        }
    }

    pub fn person(name: impl Into<String>, columns: Vec<PersonColumn>) -> Self {
        Self::Person {
            name: name.into(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Sql { name, .. } | Self::Person { name, .. } => name,
        }
    }
}

/// A person dataset column backed by a library definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonColumn {
    pub label: String,
    pub definition: DefinitionId,
}

impl PersonColumn {
    pub fn new(label: impl Into<String>, definition: impl Into<DefinitionId>) -> Self {
        Self {
            label: label.into(),
            definition: definition.into(),
        }
    }
}
