//! Error types for the document list engine.

use thiserror::Error;

/// Failure of a single chunk fetch, as seen by the load controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport-level failure (thread died, connection refused, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// The source answered but with `success: false`
    #[error("{0}")]
    Rejected(String),

    /// The response could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Network(_))
    }
}

/// Engine-level errors returned by fallible public operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Operation attempted on a destroyed table
    #[error("table has been destroyed")]
    Destroyed,

    /// Operation not supported by the table's strategy
    #[error("operation `{operation}` is not available under the {strategy} strategy")]
    UnsupportedStrategy {
        operation: &'static str,
        strategy: crate::model::Strategy,
    },

    /// Page number outside the known page range
    #[error("page {page} is out of range (last page is {last_page})")]
    PageOutOfRange { page: u32, last_page: u32 },

    /// An action tag or its parameters could not be parsed
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Configuration file could not be read or decoded
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
