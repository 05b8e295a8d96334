//! Storage layer errors

use thiserror::Error;

/// Errors a backing store can report for a write.
///
/// Clone so a single outcome can reach both the put callback and the
/// awaiting handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Target table does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Request rate or provisioned throughput exceeded
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Credentials rejected or signature invalid
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request rejected as malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any other error reported by the store API
    #[error("Store API error: {code} - {message}")]
    Api {
        /// Error type reported by the store
        code: String,
        /// Human readable message
        message: String,
    },

    /// Transport failure before a response arrived
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request did not complete in time
    #[error("Request timed out")]
    Timeout,

    /// Store accepted the call but left items unwritten
    #[error("{count} item(s) left unprocessed for table {table}")]
    Unprocessed {
        /// Table the items belonged to
        table: String,
        /// Number of unwritten items
        count: usize,
    },

    /// Request or response could not be encoded/decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Create an API error
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
