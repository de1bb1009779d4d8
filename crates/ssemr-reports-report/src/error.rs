//! Report errors

use ssemr_reports_eval::EvalError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Errors raised while registering or evaluating reports
#[derive(Debug, Error)]
pub enum ReportError {
    /// A dataset failed; the whole report run is abandoned
    #[error("Dataset {dataset} failed: {source}")]
    DataSet {
        dataset: String,
        #[source]
        source: EvalError,
    },

    #[error("Report already registered: {uuid}")]
    DuplicateReport { uuid: String },

    #[error("Unknown report: {key}")]
    UnknownReport { key: String },

    #[error("Invalid report design: {message}")]
    InvalidDesign { message: String },

    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Setup or lookup failure outside any dataset
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl ReportError {
    /// Create an invalid design error
    pub fn invalid_design(message: impl Into<String>) -> Self {
        Self::InvalidDesign {
            message: message.into(),
        }
    }
}

/// A template or other packaged resource could not be loaded
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Resource not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Invalid resource name: '{name}'")]
    InvalidName { name: String },

    #[error("Failed to read resource {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
