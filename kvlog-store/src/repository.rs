//! Store client port
//!
//! The one operation the appender needs from a backing key-value store.
//! Implementations can be DynamoDB over HTTP, in-memory, or a test double.

use crate::error::StoreError;
use crate::wire::{BatchWriteOutput, BatchWriteRequest};
use async_trait::async_trait;

/// Conditionless batch put against one or more tables.
#[async_trait]
pub trait BatchWriteClient: Send + Sync {
    /// Submit a batch of unconditional writes.
    ///
    /// `Ok` means the store answered; items it did not apply are listed in
    /// `BatchWriteOutput::unprocessed_items`.
    async fn batch_write_item(
        &self,
        request: BatchWriteRequest,
    ) -> Result<BatchWriteOutput, StoreError>;
}
