//! Newline-delimited JSON ingestion.

use kvlog_eventlog::{EventAppender, PutHandle};
use std::collections::VecDeque;
use std::fmt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::error::CliResult;

/// Counts for one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Events handed to the appender
    pub submitted: usize,
    /// Writes the store acknowledged
    pub stored: usize,
    /// Writes the store failed
    pub failed: usize,
    /// Lines that were not valid JSON or could not be submitted
    pub rejected: usize,
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "submitted={} stored={} failed={} rejected={}",
            self.submitted, self.stored, self.failed, self.rejected
        )
    }
}

/// Append one event per non-blank input line, then wait for every write.
///
/// At most `max_in_flight` writes are outstanding at once; when the limit is
/// reached the oldest write is awaited before the next line is submitted.
pub async fn ingest<R>(
    appender: &EventAppender,
    reader: R,
    max_in_flight: usize,
) -> CliResult<IngestSummary>
where
    R: AsyncBufRead + Unpin,
{
    let max_in_flight = max_in_flight.max(1);
    let mut summary = IngestSummary::default();
    let mut handles: VecDeque<PutHandle> = VecDeque::with_capacity(max_in_flight);
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: serde_json::Value = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping invalid JSON line");
                summary.rejected += 1;
                continue;
            }
        };

        if handles.len() >= max_in_flight {
            if let Some(oldest) = handles.pop_front() {
                settle(oldest, &mut summary).await;
            }
        }

        match appender.put(&event, None) {
            Ok(handle) => {
                summary.submitted += 1;
                handles.push_back(handle);
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "Event rejected");
                summary.rejected += 1;
            }
        }
    }

    debug!(pending = handles.len(), "Input exhausted, waiting for writes");

    for handle in handles {
        settle(handle, &mut summary).await;
    }

    Ok(summary)
}

async fn settle(handle: PutHandle, summary: &mut IngestSummary) {
    // Failure details are already logged by the appender
    match handle.wait().await {
        Ok(()) => summary.stored += 1,
        Err(_) => summary.failed += 1,
    }
}
