//! Event Log Types

use kvlog_domain::RecordKey;
use kvlog_store::StoreError;
use tokio::task::JoinHandle;

/// What the store answered to one put
pub type PutOutcome = std::result::Result<(), StoreError>;

/// Completion callback for a put.
///
/// Called exactly once with `Ok(())` once the store acknowledged the write,
/// or with the store error otherwise.
pub type PutCallback = Box<dyn FnOnce(PutOutcome) + Send + 'static>;

/// Box a closure as a put callback.
///
/// ```rust,no_run
/// # fn example(appender: &kvlog_eventlog::EventAppender) -> kvlog_eventlog::Result<()> {
/// appender.put(
///     &serde_json::json!({"type": "signup"}),
///     kvlog_eventlog::on_complete(|outcome| {
///         if let Err(e) = outcome {
///             eprintln!("write failed: {}", e);
///         }
///     }),
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn on_complete<F>(callback: F) -> Option<PutCallback>
where
    F: FnOnce(PutOutcome) + Send + 'static,
{
    Some(Box::new(callback))
}

/// Handle to an in-flight write.
///
/// Dropping it detaches the write; it still completes and still reports to
/// the callback and trace bus.
#[derive(Debug)]
pub struct PutHandle {
    key: RecordKey,
    task: JoinHandle<PutOutcome>,
}

impl PutHandle {
    pub(crate) fn new(key: RecordKey, task: JoinHandle<PutOutcome>) -> Self {
        Self { key, task }
    }

    /// Key the event was written under
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    /// True once the store answered and the callback ran
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the store's answer.
    pub async fn wait(self) -> Result<()> {
        match self.task.await {
            Ok(outcome) => outcome.map_err(EventLogError::Store),
            Err(e) => Err(EventLogError::Task(e.to_string())),
        }
    }
}

/// Event log errors
#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No tokio runtime available to submit the write")]
    NoRuntime,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Write task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, EventLogError>;
