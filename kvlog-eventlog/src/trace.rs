//! Trace bus for appender diagnostics.
//!
//! Every put emits `put <key> <body>` before submission and `ok <key>` or
//! `error <key>` once the store answers. Observers attach in two ways:
//! - `subscribe(handler)`: synchronous callback, detached when the returned
//!   `Subscription` is dropped
//! - `receiver()`: tokio broadcast receiver for async consumers
//!
//! Subscribers are independent; no delivery order between them is promised.

use kvlog_domain::RecordKey;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tokio::sync::broadcast;

// =============================================================================
// Trace Events
// =============================================================================

/// Diagnostic event emitted by the appender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// About to submit `body` under `key`
    Put {
        /// Derived record key
        key: RecordKey,
        /// Serialized event
        body: String,
    },
    /// Store acknowledged the write
    Ok {
        /// Record key
        key: RecordKey,
    },
    /// Store rejected or failed the write
    Error {
        /// Record key
        key: RecordKey,
    },
}

impl TraceEvent {
    /// Key the event refers to
    pub fn key(&self) -> &RecordKey {
        match self {
            TraceEvent::Put { key, .. } | TraceEvent::Ok { key } | TraceEvent::Error { key } => key,
        }
    }

    /// Leading word of the rendered trace line
    pub fn tag(&self) -> &'static str {
        match self {
            TraceEvent::Put { .. } => "put",
            TraceEvent::Ok { .. } => "ok",
            TraceEvent::Error { .. } => "error",
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Put { key, body } => write!(f, "put {} {}", key, body),
            TraceEvent::Ok { key } => write!(f, "ok {}", key),
            TraceEvent::Error { key } => write!(f, "error {}", key),
        }
    }
}

// =============================================================================
// Trace Bus
// =============================================================================

/// Synchronous trace observer
pub type TraceHandler = Arc<dyn Fn(&TraceEvent) + Send + Sync>;

struct BusInner {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(u64, TraceHandler)>>,
    sender: broadcast::Sender<TraceEvent>,
}

/// Fan-out of trace events to handlers and channel receivers.
///
/// Cloning yields another handle to the same bus.
#[derive(Clone)]
pub struct TraceBus {
    inner: Arc<BusInner>,
}

impl TraceBus {
    /// Create a bus whose channel receivers buffer up to `capacity` events.
    ///
    /// Slow channel receivers beyond that start missing events (lagging).
    /// Handlers are called inline and never lag.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(BusInner {
                next_id: AtomicU64::new(0),
                handlers: RwLock::new(Vec::new()),
                sender,
            }),
        }
    }

    /// Register a handler. It stays registered until the returned
    /// `Subscription` is dropped or `unsubscribe`d.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&TraceEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(handler)));

        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Receive all events emitted after this call.
    pub fn receiver(&self) -> TraceReceiver {
        TraceReceiver {
            receiver: self.inner.sender.subscribe(),
        }
    }

    /// Deliver an event to every handler and channel receiver.
    ///
    /// Returns how many observers it reached; 0 when nobody listens.
    pub fn emit(&self, event: TraceEvent) -> usize {
        // Snapshot so handlers may (un)subscribe without deadlocking
        let handlers: Vec<TraceHandler> = self
            .inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in &handlers {
            handler(&event);
        }

        // send() returns Err if there are no receivers, but we don't care
        handlers.len() + self.inner.sender.send(event).unwrap_or(0)
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of live channel receivers
    pub fn receiver_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }
}

impl Default for TraceBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl fmt::Debug for TraceBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceBus")
            .field("handlers", &self.handler_count())
            .field("receivers", &self.receiver_count())
            .finish()
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Registration handle for a trace handler.
#[must_use = "dropping a Subscription unregisters its handler"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Unregister the handler now
    pub fn unsubscribe(self) {}

    /// True while the handler is registered on a live bus
    pub fn is_active(&self) -> bool {
        self.bus.upgrade().is_some_and(|inner| {
            inner
                .handlers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .any(|(id, _)| *id == self.id)
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner
                .handlers
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}

// =============================================================================
// Channel Receiver
// =============================================================================

/// Async receiver for trace events.
pub struct TraceReceiver {
    receiver: broadcast::Receiver<TraceEvent>,
}

impl TraceReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` if the bus has been dropped.
    /// Returns error description if the receiver lagged (missed events).
    pub async fn recv(&mut self) -> Option<Result<TraceEvent, String>> {
        match self.receiver.recv().await {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::RecvError::Closed) => None,
            Err(broadcast::error::RecvError::Lagged(count)) => {
                Some(Err(format!("Receiver lagged, missed {} events", count)))
            }
        }
    }

    /// Try to receive an event without blocking.
    ///
    /// Returns `None` if no event is immediately available.
    pub fn try_recv(&mut self) -> Option<Result<TraceEvent, String>> {
        match self.receiver.try_recv() {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::TryRecvError::Empty) => None,
            Err(broadcast::error::TryRecvError::Closed) => None,
            Err(broadcast::error::TryRecvError::Lagged(count)) => {
                Some(Err(format!("Receiver lagged, missed {} events", count)))
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
