//! Error types for the budget governance engine

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the budget engine.
///
/// Budget rejections are not errors: they are reported through
/// [`AdmissionVerdict::allowed`](crate::budget::AdmissionVerdict).
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Invalid limits, thresholds, ratios or price table. Fatal at construction.
    #[error("Invalid budget configuration: {0}")]
    Configuration(String),

    /// Snapshot read or write failure
    #[error("Budget storage I/O failed for {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Budget snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BudgetError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }
}

pub type BudgetResult<T> = Result<T, BudgetError>;
