//! Event Appending
//!
//! One put = derive key, serialize, trace, submit a single-item batch,
//! trace the outcome, invoke the callback. No retries.

use crate::trace::{Subscription, TraceBus, TraceEvent};
use crate::types::{EventLogError, PutCallback, PutHandle, Result};
use kvlog_domain::{KeyGenerator, StoredRecord};
use kvlog_store::{BatchWriteClient, BatchWriteRequest};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Appends events to one table of a batch-write store.
///
/// Holds only immutable configuration plus the key generator; any number of
/// puts may be in flight at once.
pub struct EventAppender {
    client: Arc<dyn BatchWriteClient>,
    table_name: Arc<str>,
    keys: KeyGenerator,
    traces: TraceBus,
}

impl EventAppender {
    /// Create an appender writing to `table_name` through `client`.
    ///
    /// Performs no I/O.
    ///
    /// # Errors
    /// - `InvalidConfig` if the table name is empty
    pub fn new(client: Arc<dyn BatchWriteClient>, table_name: impl Into<String>) -> Result<Self> {
        let table_name = table_name.into();
        if table_name.trim().is_empty() {
            return Err(EventLogError::InvalidConfig(
                "table name is required".to_string(),
            ));
        }

        Ok(Self {
            client,
            table_name: table_name.into(),
            keys: KeyGenerator::default(),
            traces: TraceBus::default(),
        })
    }

    /// Use a specific key generator (format or clock)
    pub fn with_key_generator(mut self, keys: KeyGenerator) -> Self {
        self.keys = keys;
        self
    }

    /// Emit traces on an existing bus
    pub fn with_trace_bus(mut self, traces: TraceBus) -> Self {
        self.traces = traces;
        self
    }

    /// Target table
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Trace bus this appender emits on
    pub fn traces(&self) -> &TraceBus {
        &self.traces
    }

    /// Register a trace handler on this appender's bus
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&TraceEvent) + Send + Sync + 'static,
    {
        self.traces.subscribe(handler)
    }

    /// Append one event.
    ///
    /// Returns as soon as the write is submitted; the store's answer arrives
    /// through `callback`, the trace bus, and the returned handle.
    ///
    /// # Errors
    /// - `Serialization` if the event cannot be encoded (nothing is sent)
    /// - `NoRuntime` if called outside a tokio runtime (nothing is sent)
    pub fn put<E>(&self, event: &E, callback: Option<PutCallback>) -> Result<PutHandle>
    where
        E: Serialize + ?Sized,
    {
        let key = self.keys.next_key();
        let record = StoredRecord::from_event(key, event)?;
        let runtime = Handle::try_current().map_err(|_| EventLogError::NoRuntime)?;

        let request = BatchWriteRequest::single_put(self.table_name.as_ref(), &record);
        let StoredRecord { key, body } = record;

        debug!(key = %key, table = %self.table_name, "Submitting event");
        self.traces.emit(TraceEvent::Put {
            key: key.clone(),
            body,
        });

        let client = self.client.clone();
        let traces = self.traces.clone();
        let table = self.table_name.clone();
        let task_key = key.clone();

        let task = runtime.spawn(async move {
            let outcome = match client.batch_write_item(request).await {
                Ok(output) => output.ensure_processed(),
                Err(e) => Err(e),
            };

            match &outcome {
                Ok(()) => {
                    debug!(key = %task_key, table = %table, "Event stored");
                    traces.emit(TraceEvent::Ok { key: task_key });
                }
                Err(e) => {
                    warn!(key = %task_key, table = %table, error = %e, "Event write failed");
                    traces.emit(TraceEvent::Error { key: task_key });
                }
            }

            if let Some(callback) = callback {
                callback(outcome.clone());
            }

            outcome
        });

        Ok(PutHandle::new(key, task))
    }
}

impl fmt::Debug for EventAppender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventAppender")
            .field("table_name", &self.table_name)
            .field("keys", &self.keys)
            .field("traces", &self.traces)
            .finish_non_exhaustive()
    }
}
