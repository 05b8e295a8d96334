//! Kvlog CLI
//!
//! Wires configuration, the store client, and the event appender, and
//! streams newline-delimited JSON events into the configured table.

pub mod config;
pub mod error;
pub mod ingest;

pub use config::{Config, Environment, DEFAULT_MAX_IN_FLIGHT};
pub use error::{CliError, CliResult};
pub use ingest::{ingest, IngestSummary};

use kvlog_connectors::DynamoDbClient;
use kvlog_domain::KeyGenerator;
use kvlog_eventlog::{EventAppender, Subscription, TraceEvent};
use kvlog_store::{BatchWriteClient, MemoryStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Build the appender for a configuration.
///
/// The test environment writes to an in-memory store; every other
/// environment talks to DynamoDB. No request is sent here.
pub fn build_appender(config: &Config) -> CliResult<EventAppender> {
    let client: Arc<dyn BatchWriteClient> = match config.environment {
        Environment::Test => Arc::new(MemoryStore::new()),
        Environment::Development | Environment::Production => {
            Arc::new(DynamoDbClient::new(config.connection.clone())?)
        }
    };

    let appender = EventAppender::new(client, config.table_name.clone())?
        .with_key_generator(KeyGenerator::new(config.key_format));

    Ok(appender)
}

/// Mirror the appender's trace lines into the log.
pub fn log_traces(appender: &EventAppender) -> Subscription {
    appender.subscribe(|event| match event {
        TraceEvent::Put { .. } => debug!(target: "kvlog::trace", "{}", event),
        TraceEvent::Ok { .. } => info!(target: "kvlog::trace", "{}", event),
        TraceEvent::Error { .. } => warn!(target: "kvlog::trace", "{}", event),
    })
}
