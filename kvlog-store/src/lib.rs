//! Kvlog Storage Layer
//!
//! The port the event appender writes through, its wire types, and an
//! in-memory implementation.
//!
//! # Architecture
//!
//! - **`BatchWriteClient`**: the single conditionless batch put (port)
//! - **Wire types**: DynamoDB JSON shapes of `BatchWriteItem`
//! - **`MemoryStore`**: in-process implementation for tests and local runs
//!
//! # Usage
//!
//! ```rust
//! use kvlog_domain::{KeyGenerator, StoredRecord};
//! use kvlog_store::{BatchWriteClient, BatchWriteRequest, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!     let key = KeyGenerator::default().next_key();
//!     let record = StoredRecord::from_event(key, &serde_json::json!({"n": 1})).unwrap();
//!
//!     store
//!         .batch_write_item(BatchWriteRequest::single_put("events", &record))
//!         .await
//!         .unwrap();
//!     assert_eq!(store.record_count("events"), 1);
//! }
//! ```

#![warn(clippy::all)]

// Modules
mod error;
mod memory;
mod repository;
pub mod wire;

// Re-exports
pub use error::StoreError;
pub use memory::MemoryStore;
pub use repository::BatchWriteClient;
pub use wire::{AttributeValue, BatchWriteOutput, BatchWriteRequest, Item, WriteRequest};
