//! Evaluated person data

use crate::DefinitionId;
use indexmap::IndexMap;
use serde::Serialize;
use ssemr_reports_types::{PersonId, ReportingPeriod, Value};

/// One value per person for one definition and period.
///
/// A person with no qualifying data is absent. Entries are kept in ascending
/// person order so output is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluatedPersonData {
    pub definition: DefinitionId,
    pub period: ReportingPeriod,
    pub data: IndexMap<PersonId, Value>,
}

impl EvaluatedPersonData {
    pub fn new(definition: DefinitionId, period: ReportingPeriod) -> Self {
        Self {
            definition,
            period,
            data: IndexMap::new(),
        }
    }

    /// Build from resolved entries, sorting by person
    pub fn from_entries(
        definition: DefinitionId,
        period: ReportingPeriod,
        entries: impl IntoIterator<Item = (PersonId, Value)>,
    ) -> Self {
        let mut data: IndexMap<PersonId, Value> = entries.into_iter().collect();
        data.sort_keys();
        Self {
            definition,
            period,
            data,
        }
    }

    /// Insert a value, returning the one it replaced
    pub fn insert(&mut self, person: PersonId, value: Value) -> Option<Value> {
        self.data.insert(person, value)
    }

    pub fn get(&self, person: PersonId) -> Option<&Value> {
        self.data.get(&person)
    }

    pub fn contains(&self, person: PersonId) -> bool {
        self.data.contains_key(&person)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PersonId, &Value)> {
        self.data.iter()
    }

    pub fn persons(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.data.keys().copied()
    }
}
