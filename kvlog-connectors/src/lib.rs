//! Kvlog Store Connectors
//!
//! Adapters that implement the batch-write port against real stores.
//! Normalizes store-specific error responses to `StoreError`.

#![warn(clippy::all)]

// Public modules
pub mod config;
pub mod dynamodb;
pub mod error;

// Re-exports
pub use config::{ConnectionConfig, DEFAULT_REGION, REQUEST_TIMEOUT_SECS};
pub use dynamodb::{map_error_code, map_sdk_error, DynamoDbClient};
pub use error::ConnectorError;
