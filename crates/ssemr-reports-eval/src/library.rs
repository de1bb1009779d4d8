//! Named definitions available to reports

use crate::error::{EvalError, EvalResult};
use crate::{vl, DefinitionId, PersonDataDefinition};
use indexmap::IndexMap;
use std::sync::Arc;

/// Definitions by id, iterated in registration order
#[derive(Debug, Clone, Default)]
pub struct DefinitionLibrary {
    definitions: IndexMap<DefinitionId, Arc<PersonDataDefinition>>,
}

impl DefinitionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library holding the built-in viral load definitions
    pub fn with_standard_definitions() -> Self {
        let mut library = Self::new();
        for definition in vl::standard_definitions() {
            // Built-in ids are distinct
            let _ = library.register(definition);
        }
        library
    }

    /// Add a definition; an id can only be registered once
    pub fn register(&mut self, definition: PersonDataDefinition) -> EvalResult<Arc<PersonDataDefinition>> {
        if self.definitions.contains_key(&definition.id) {
            return Err(EvalError::DuplicateDefinition { id: definition.id });
        }
        let definition = Arc::new(definition);
        self.definitions.insert(definition.id.clone(), definition.clone());
        Ok(definition)
    }

    pub fn get(&self, id: &DefinitionId) -> EvalResult<Arc<PersonDataDefinition>> {
        self.definitions
            .get(id)
            .cloned()
            .ok_or_else(|| EvalError::UnknownDefinition { id: id.clone() })
    }

    pub fn contains(&self, id: &DefinitionId) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PersonDataDefinition>> {
        self.definitions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_library_order() {
        let library = DefinitionLibrary::with_standard_definitions();
        let ids: Vec<&str> = library.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["date_vl_sample_received", "repeat_vl_result"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut library = DefinitionLibrary::with_standard_definitions();
        let err = library.register(vl::repeat_vl_result()).unwrap_err();
        assert!(matches!(err, EvalError::DuplicateDefinition { ref id } if id.as_str() == "repeat_vl_result"));
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn test_unknown_id() {
        let library = DefinitionLibrary::new();
        assert!(matches!(
            library.get(&"missing".into()),
            Err(EvalError::UnknownDefinition { .. })
        ));
    }
}
