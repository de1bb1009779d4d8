//! Person data service
//!
//! Entry point of the pipeline: looks a definition up in the run's memo,
//! otherwise dispatches it to its evaluator and memoizes the result.

use crate::error::EvalResult;
use crate::{
    DefinitionId, DefinitionLibrary, EvaluatedPersonData, EvaluationContext, EvaluationService, EvaluatorRegistry,
    PersonDataDefinition, QueryBuilderFactory,
};
use indexmap::IndexMap;
use ssemr_reports_warehouse::Warehouse;
use std::sync::Arc;
use tracing::{debug, info_span, warn};

/// Memoizing dispatcher over an evaluator registry and a definition library
#[derive(Debug, Clone)]
pub struct PersonDataService {
    registry: EvaluatorRegistry,
    library: DefinitionLibrary,
}

impl PersonDataService {
    pub fn new(registry: EvaluatorRegistry, library: DefinitionLibrary) -> Self {
        Self { registry, library }
    }

    /// Built-in evaluators and definitions over `warehouse`, with table names
    /// qualified by `schema`
    pub fn standard(warehouse: Arc<dyn Warehouse>, schema: &str) -> EvalResult<Self> {
        let factory = QueryBuilderFactory::new(schema)?;
        let service = EvaluationService::new(warehouse);
        Ok(Self::new(
            EvaluatorRegistry::standard(service, factory),
            DefinitionLibrary::with_standard_definitions(),
        ))
    }

    pub fn registry(&self) -> &EvaluatorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EvaluatorRegistry {
        &mut self.registry
    }

    pub fn definitions(&self) -> &DefinitionLibrary {
        &self.library
    }

    /// Add a definition to the library
    pub fn register_definition(&mut self, definition: PersonDataDefinition) -> EvalResult<Arc<PersonDataDefinition>> {
        self.library.register(definition)
    }

    /// Evaluate a definition for the context's period.
    ///
    /// A definition already evaluated in this context is served from the memo
    /// without touching the warehouse. Reusing an id for a definition with a
    /// different body fails with `ConflictingDefinition`. Failures are wrapped with the
    /// definition id and period; nothing is memoized for a failed evaluation.
    pub fn evaluate(
        &self,
        definition: &PersonDataDefinition,
        ctx: &EvaluationContext,
    ) -> EvalResult<Arc<EvaluatedPersonData>> {
        let span = info_span!("evaluate", definition = %definition.id, period = %ctx.period());
        let _entered = span.enter();

        ctx.claim(definition)?;
        if let Some(cached) = ctx.cached(&definition.id) {
            debug!(persons = cached.len(), "memo hit");
            return Ok(cached);
        }

        let result = self
            .registry
            .dispatch(definition)
            .and_then(|evaluator| {
                debug!(evaluator = evaluator.name(), kind = %definition.kind(), "dispatching");
                evaluator.evaluate(definition, ctx)
            })
            .map_err(|e| e.in_evaluation(&definition.id, ctx.period()));

        match result {
            Ok(data) => {
                debug!(persons = data.len(), "evaluated");
                Ok(ctx.store(data))
            }
            Err(e) => {
                warn!(error = %e, "evaluation failed");
                Err(e)
            }
        }
    }

    /// Evaluate a library definition by id
    pub fn evaluate_by_id(&self, id: &DefinitionId, ctx: &EvaluationContext) -> EvalResult<Arc<EvaluatedPersonData>> {
        let definition = self.library.get(id)?;
        self.evaluate(&definition, ctx)
    }

    /// Evaluate every library definition, stopping at the first failure
    pub fn evaluate_all(&self, ctx: &EvaluationContext) -> EvalResult<IndexMap<DefinitionId, Arc<EvaluatedPersonData>>> {
        let mut results = IndexMap::with_capacity(self.library.len());
        for definition in self.library.iter() {
            let data = self.evaluate(definition, ctx)?;
            results.insert(definition.id.clone(), data);
        }
        Ok(results)
    }
}

impl From<EvaluatorRegistry> for PersonDataService {
    fn from(registry: EvaluatorRegistry) -> Self {
        Self::new(registry, DefinitionLibrary::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EvalError;
    use chrono::NaiveDate;
    use ssemr_reports_types::ReportingPeriod;
    use ssemr_reports_warehouse::EmptyWarehouse;

    fn ctx() -> EvaluationContext {
        EvaluationContext::for_period(ReportingPeriod::ending(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()))
    }

    #[test]
    fn test_standard_service_rejects_bad_schema() {
        let err = PersonDataService::standard(Arc::new(EmptyWarehouse::new()), "etl; --").unwrap_err();
        assert!(matches!(err, EvalError::Binding(_)));
    }

    #[test]
    fn test_missing_evaluator_is_wrapped_with_definition() {
        let service = PersonDataService::from(EvaluatorRegistry::new());
        let definition = crate::vl::repeat_vl_result();
        let ctx = ctx();
        let err = service.evaluate(&definition, &ctx).unwrap_err();

        match &err {
            EvalError::Evaluation { definition: id, .. } => assert_eq!(id.as_str(), "repeat_vl_result"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(err.root_cause(), EvalError::NoEvaluator { .. }));
        assert_eq!(ctx.memo_len(), 0);
    }

    #[test]
    fn test_evaluate_all_covers_library() {
        let service = PersonDataService::standard(Arc::new(EmptyWarehouse::new()), "ssemr_etl").unwrap();
        let ctx = ctx();
        let results = service.evaluate_all(&ctx).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(ctx.memo_len(), 2);
    }
}
