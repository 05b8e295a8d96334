//! CLI error types.

use kvlog_connectors::ConnectorError;
use kvlog_eventlog::EventLogError;
use thiserror::Error;

/// CLI-level errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Appender error
    #[error("Event log error: {0}")]
    EventLog(#[from] EventLogError),

    /// Store connector error
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// Reading input failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
