//! Evaluator registry
//!
//! Maps each definition kind to a priority-ordered list of evaluators. The
//! registry is built explicitly at startup; nothing is discovered at run time.

use crate::error::{EvalError, EvalResult};
use crate::{
    CurrentRowEvaluator, DefinitionKind, EvaluationService, LatestValueEvaluator, PersonDataDefinition,
    PersonDataEvaluator, QueryBuilderFactory, SqlPersonDataEvaluator,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Priority of the built-in evaluators
pub const DEFAULT_PRIORITY: i32 = 50;

/// Extra condition a registration applies before accepting a definition
pub type DefinitionPredicate = Arc<dyn Fn(&PersonDataDefinition) -> bool + Send + Sync>;

#[derive(Clone)]
struct Registration {
    priority: i32,
    predicate: Option<DefinitionPredicate>,
    evaluator: Arc<dyn PersonDataEvaluator>,
}

impl Registration {
    fn accepts(&self, definition: &PersonDataDefinition) -> bool {
        self.predicate.as_ref().is_none_or(|p| p(definition))
    }
}

/// Registry of evaluators keyed by definition kind
#[derive(Clone, Default)]
pub struct EvaluatorRegistry {
    by_kind: HashMap<DefinitionKind, Vec<Registration>>,
}

impl EvaluatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the three built-in evaluators at `DEFAULT_PRIORITY`
    pub fn standard(service: EvaluationService, factory: QueryBuilderFactory) -> Self {
        let mut registry = Self::new();
        registry
            .register(
                DEFAULT_PRIORITY,
                Arc::new(LatestValueEvaluator::new(service.clone(), factory.clone())),
            )
            .register(
                DEFAULT_PRIORITY,
                Arc::new(CurrentRowEvaluator::new(service.clone(), factory.clone())),
            )
            .register(DEFAULT_PRIORITY, Arc::new(SqlPersonDataEvaluator::new(service, factory)));
        registry
    }

    /// Register an evaluator for every kind it supports
    pub fn register(&mut self, priority: i32, evaluator: Arc<dyn PersonDataEvaluator>) -> &mut Self {
        self.insert(priority, None, evaluator)
    }

    /// Register an evaluator that only accepts definitions matching `predicate`
    pub fn register_when(
        &mut self,
        priority: i32,
        predicate: DefinitionPredicate,
        evaluator: Arc<dyn PersonDataEvaluator>,
    ) -> &mut Self {
        self.insert(priority, Some(predicate), evaluator)
    }

    fn insert(
        &mut self,
        priority: i32,
        predicate: Option<DefinitionPredicate>,
        evaluator: Arc<dyn PersonDataEvaluator>,
    ) -> &mut Self {
        for kind in evaluator.supports() {
            let registrations = self.by_kind.entry(*kind).or_default();
            // After every registration of equal or higher priority
            let at = registrations
                .iter()
                .position(|r| r.priority < priority)
                .unwrap_or(registrations.len());
            registrations.insert(
                at,
                Registration {
                    priority,
                    predicate: predicate.clone(),
                    evaluator: evaluator.clone(),
                },
            );
        }
        self
    }

    /// Select the evaluator for a definition: the highest-priority
    /// registration for its kind whose predicate accepts it
    pub fn dispatch(&self, definition: &PersonDataDefinition) -> EvalResult<Arc<dyn PersonDataEvaluator>> {
        let kind = definition.kind();
        self.by_kind
            .get(&kind)
            .and_then(|registrations| registrations.iter().find(|r| r.accepts(definition)))
            .map(|r| r.evaluator.clone())
            .ok_or_else(|| EvalError::NoEvaluator {
                kind,
                definition: definition.id.clone(),
            })
    }

    /// Number of registrations for a kind
    pub fn count(&self, kind: DefinitionKind) -> usize {
        self.by_kind.get(&kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (kind, registrations) in &self.by_kind {
            let names: Vec<_> = registrations
                .iter()
                .map(|r| format!("{}@{}", r.evaluator.name(), r.priority))
                .collect();
            map.entry(kind, &names);
        }
        map.finish()
    }
}
