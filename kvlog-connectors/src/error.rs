//! Connector errors

use thiserror::Error;

/// Errors raised while building the client.
///
/// Failures of the write itself are reported as `kvlog_store::StoreError`.
#[derive(Debug, Clone, Error)]
pub enum ConnectorError {
    /// Connection parameters are incomplete or malformed
    #[error("Invalid connection config: {0}")]
    InvalidConfig(String),
}

impl From<kvlog_domain::DomainError> for ConnectorError {
    fn from(err: kvlog_domain::DomainError) -> Self {
        ConnectorError::InvalidConfig(err.to_string())
    }
}
