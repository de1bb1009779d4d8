//! Evaluation context for one report run

use crate::error::{EvalError, EvalResult};
use crate::{DefinitionBody, DefinitionId, EvaluatedPersonData, PersonDataDefinition};
use chrono::NaiveDate;
use indexmap::IndexMap;
use parking_lot::Mutex;
use ssemr_reports_query::{Parameter, COHORT, END_DATE, START_DATE};
use ssemr_reports_types::{PersonId, ReportingPeriod};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Reporting period, optional cohort, extra parameters, and the memo of
/// results already computed in this run.
///
/// Everything except the memo is fixed at construction. The memo sits behind
/// a mutex so a context can be shared by evaluators running on several threads.
#[derive(Debug)]
pub struct EvaluationContext {
    period: ReportingPeriod,
    cohort: Option<BTreeSet<PersonId>>,
    parameters: IndexMap<String, Parameter>,
    memo: Mutex<HashMap<DefinitionId, Arc<EvaluatedPersonData>>>,
    bodies: Mutex<HashMap<DefinitionId, DefinitionBody>>,
}

impl EvaluationContext {
    /// Start building a context
    pub fn builder() -> EvaluationContextBuilder {
        EvaluationContextBuilder::default()
    }

    /// Context for a period with no cohort restriction
    pub fn for_period(period: ReportingPeriod) -> Self {
        Self {
            period,
            cohort: None,
            parameters: IndexMap::new(),
            memo: Mutex::new(HashMap::new()),
            bodies: Mutex::new(HashMap::new()),
        }
    }

    pub fn period(&self) -> ReportingPeriod {
        self.period
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.period.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.period.end
    }

    /// The person cohort, `None` meaning everyone in the warehouse
    pub fn cohort(&self) -> Option<&BTreeSet<PersonId>> {
        self.cohort.as_ref()
    }

    /// Check whether a person is inside the cohort (always true without one)
    pub fn includes(&self, person: PersonId) -> bool {
        self.cohort.as_ref().is_none_or(|c| c.contains(&person))
    }

    /// Look up a parameter value.
    ///
    /// `startDate`, `endDate` and `cohort` come from the period and cohort;
    /// anything else from the extra parameters.
    pub fn parameter(&self, name: &str) -> Option<Parameter> {
        match name {
            START_DATE => self.period.start.map(Parameter::Date),
            END_DATE => Some(Parameter::Date(self.period.end)),
            COHORT => self.cohort.as_ref().map(Parameter::cohort),
            other => self.parameters.get(other).cloned(),
        }
    }

    /// All parameters a query may bind, standard ones first
    pub fn parameters(&self) -> Vec<(String, Parameter)> {
        let mut all = Vec::with_capacity(self.parameters.len() + 3);
        for name in [START_DATE, END_DATE, COHORT] {
            if let Some(value) = self.parameter(name) {
                all.push((name.to_string(), value));
            }
        }
        all.extend(self.parameters.iter().map(|(k, v)| (k.clone(), v.clone())));
        all
    }

    /// Get a memoized result
    pub fn cached(&self, definition: &DefinitionId) -> Option<Arc<EvaluatedPersonData>> {
        self.memo.lock().get(definition).cloned()
    }

    /// Memoize a result; an existing entry for the definition is kept
    pub fn store(&self, result: EvaluatedPersonData) -> Arc<EvaluatedPersonData> {
        let mut memo = self.memo.lock();
        memo.entry(result.definition.clone())
            .or_insert_with(|| Arc::new(result))
            .clone()
    }

    /// Tie a definition id to its body for the rest of the run.
    ///
    /// The memo is keyed by id, so a later definition that reuses an id with a
    /// different body is an error instead of a memo hit.
    pub fn claim(&self, definition: &PersonDataDefinition) -> EvalResult<()> {
        let mut bodies = self.bodies.lock();
        match bodies.get(&definition.id) {
            Some(body) if *body != definition.body => Err(EvalError::ConflictingDefinition {
                id: definition.id.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                bodies.insert(definition.id.clone(), definition.body.clone());
                Ok(())
            }
        }
    }

    /// Number of memoized results
    pub fn memo_len(&self) -> usize {
        self.memo.lock().len()
    }
}

/// Builder for `EvaluationContext`
#[derive(Debug, Default)]
pub struct EvaluationContextBuilder {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    cohort: Option<BTreeSet<PersonId>>,
    parameters: IndexMap<String, Parameter>,
}

impl EvaluationContextBuilder {
    pub fn start_date(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end_date(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    pub fn period(mut self, period: ReportingPeriod) -> Self {
        self.start = period.start;
        self.end = Some(period.end);
        self
    }

    /// Restrict evaluation to these persons
    pub fn cohort(mut self, persons: impl IntoIterator<Item = PersonId>) -> Self {
        self.cohort = Some(persons.into_iter().collect());
        self
    }

    /// Add an extra named parameter. The standard names are reserved.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Parameter>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> EvalResult<EvaluationContext> {
        let end = self.end.ok_or_else(|| EvalError::InvalidContext {
            message: "an end date is required".to_string(),
        })?;
        let period = match self.start {
            Some(start) => ReportingPeriod::new(start, end).map_err(|e| EvalError::InvalidContext {
                message: e.to_string(),
            })?,
            None => ReportingPeriod::ending(end),
        };
        if let Some(reserved) = [START_DATE, END_DATE, COHORT]
            .into_iter()
            .find(|name| self.parameters.contains_key(*name))
        {
            return Err(EvalError::InvalidContext {
                message: format!("parameter '{reserved}' is set from the period or cohort"),
            });
        }

        Ok(EvaluationContext {
            period,
            cohort: self.cohort,
            parameters: self.parameters,
            memo: Mutex::new(HashMap::new()),
            bodies: Mutex::new(HashMap::new()),
        })
    }
}
