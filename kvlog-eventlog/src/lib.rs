//! Event Log Module
//!
//! Appends JSON events to one table of a batch-write key-value store:
//! - Lexicographically sortable, time-derived record keys
//! - One unconditional single-item batch write per event
//! - Outcome reported through an optional callback and a trace bus
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kvlog_eventlog::{on_complete, EventAppender};
//! use kvlog_store::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let appender = EventAppender::new(Arc::new(MemoryStore::new()), "events")?;
//! let _traces = appender.subscribe(|event| println!("{}", event));
//!
//! let handle = appender.put(
//!     &serde_json::json!({"type": "signup", "user": 42}),
//!     on_complete(|outcome| {
//!         if let Err(e) = outcome {
//!             eprintln!("write failed: {}", e);
//!         }
//!     }),
//! )?;
//! handle.wait().await?;
//! # Ok(())
//! # }
//! ```

pub mod append;
pub mod trace;
pub mod types;

pub use append::EventAppender;
pub use trace::{Subscription, TraceBus, TraceEvent, TraceHandler, TraceReceiver};
pub use types::{on_complete, EventLogError, PutCallback, PutHandle, PutOutcome, Result};
