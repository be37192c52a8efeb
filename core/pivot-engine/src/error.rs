//! FILENAME: core/pivot-engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PivotError {
    #[error("You must select row and column fields")]
    EmptyDimensions,

    #[error("You must enter labels for all machine label fields (missing for '{field}')")]
    EmptyLabelList { field: String },

    #[error("Unknown header field: {0}")]
    UnknownField(String),

    #[error("Invalid header field '{column}': {reason}")]
    InvalidField { column: String, reason: String },

    #[error("Invalid history argument {key}={value}")]
    InvalidHistoryArgument { key: String, value: String },

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl PivotError {
    /// User-correctable errors that block a query before any fetch is issued.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PivotError::EmptyDimensions | PivotError::EmptyLabelList { .. }
        )
    }
}

/// Failure reported by the external data source for one fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Fetch failed: {0}")]
pub struct FetchError(pub String);

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        FetchError(message.into())
    }
}
