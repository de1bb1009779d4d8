//! Binding errors

use crate::ParameterType;
use thiserror::Error;

/// Errors raised while rendering a query, before anything reaches the warehouse
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The template references a placeholder with no bound value
    #[error("Unbound query parameter: {name}")]
    Unbound { name: String },

    /// A bound value does not match the placeholder's declared type
    #[error("Parameter {name} expects {expected}, found {found}")]
    TypeMismatch {
        name: String,
        expected: ParameterType,
        found: ParameterType,
    },

    /// A trusted identifier (schema, table, column) failed validation
    #[error("Invalid SQL identifier: '{identifier}'")]
    InvalidIdentifier { identifier: String },
}

impl BindingError {
    /// Create an unbound parameter error
    pub fn unbound(name: impl Into<String>) -> Self {
        Self::Unbound { name: name.into() }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(name: impl Into<String>, expected: ParameterType, found: ParameterType) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected,
            found,
        }
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(identifier: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.into(),
        }
    }
}
