//! In-memory store implementation
//!
//! Used for testing and development without a remote store.
//! Thread-safe using RwLock for concurrent access.

use crate::error::StoreError;
use crate::repository::BatchWriteClient;
use crate::wire::{
    record_from_item, BatchWriteOutput, BatchWriteRequest, Item, WriteRequest, KEY_ATTRIBUTE,
};
use async_trait::async_trait;
use kvlog_domain::StoredRecord;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

/// Items of one table ordered by primary key
type Table = BTreeMap<String, Item>;

/// In-memory store for testing
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    /// When set, writes to tables outside this set fail with `TableNotFound`
    known_tables: Option<HashSet<String>>,
    /// Delay applied before each batch is handled
    latency: Option<Duration>,
    calls: AtomicUsize,
    fail_next: Mutex<Option<StoreError>>,
    unprocessed_next: Mutex<bool>,
    /// Received batches, kept only when the request log is enabled
    requests: Option<Mutex<Vec<BatchWriteRequest>>>,
}

impl MemoryStore {
    /// Create a store that accepts writes to any table
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            known_tables: None,
            latency: None,
            calls: AtomicUsize::new(0),
            fail_next: Mutex::new(None),
            unprocessed_next: Mutex::new(false),
            requests: None,
        }
    }

    /// Create a store where only the named tables exist
    pub fn with_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known: HashSet<String> = tables.into_iter().map(Into::into).collect();
        let mut store = Self::new();
        store.tables = RwLock::new(known.iter().map(|t| (t.clone(), Table::new())).collect());
        store.known_tables = Some(known);
        store
    }

    /// Delay every batch by `latency` before applying it
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Keep a copy of every batch received, for inspection in tests
    pub fn with_request_log(mut self) -> Self {
        self.requests = Some(Mutex::new(Vec::new()));
        self
    }

    /// Fail the next batch with `error` (one-shot)
    pub fn set_fail_next(&self, error: StoreError) {
        *self.fail_next.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    /// Report the next batch as entirely unprocessed (one-shot)
    pub fn set_unprocessed_next(&self) {
        *self
            .unprocessed_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = true;
    }

    /// Number of `batch_write_item` calls received
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every batch received, in arrival order.
    ///
    /// Empty unless the store was built `with_request_log`.
    pub fn requests(&self) -> Vec<BatchWriteRequest> {
        self.requests.as_ref().map_or_else(Vec::new, |log| {
            log.lock().unwrap_or_else(PoisonError::into_inner).clone()
        })
    }

    /// Number of records in a table
    pub fn record_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .map_or(0, BTreeMap::len)
    }

    /// Fetch one record by key
    pub fn get(&self, table: &str, key: &str) -> Option<StoredRecord> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(table)
            .and_then(|items| items.get(key))
            .and_then(|item| record_from_item(item).ok())
    }

    /// All records of a table in key order
    pub fn records(&self, table: &str) -> Result<Vec<StoredRecord>, StoreError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(table)
            .map(|items| items.values().map(record_from_item).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// Clear all data (useful for test setup)
    pub fn clear(&self) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .values_mut()
            .for_each(BTreeMap::clear);
        if let Some(log) = &self.requests {
            log.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
        self.calls.store(0, Ordering::SeqCst);
    }

    fn take_fail_next(&self) -> Option<StoreError> {
        self.fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn take_unprocessed_next(&self) -> bool {
        std::mem::take(
            &mut *self
                .unprocessed_next
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    fn check_tables(&self, request: &BatchWriteRequest) -> Result<(), StoreError> {
        if let Some(known) = &self.known_tables {
            if let Some(missing) = request.request_items.keys().find(|t| !known.contains(*t)) {
                return Err(StoreError::TableNotFound(missing.clone()));
            }
        }
        Ok(())
    }

    fn apply(&self, request: &BatchWriteRequest) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);

        for (table, writes) in &request.request_items {
            let items = tables.entry(table.clone()).or_default();
            for write in writes {
                match write {
                    WriteRequest::Put { item } => {
                        let key = item
                            .get(KEY_ATTRIBUTE)
                            .and_then(|value| value.as_s())
                            .ok_or_else(|| {
                                StoreError::Validation(
                                    "item is missing the string key attribute".to_string(),
                                )
                            })?;
                        // Unconditional: an existing item under the same key is replaced
                        items.insert(key.to_string(), item.clone());
                    }
                }
            }
        }

        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchWriteClient for MemoryStore {
    async fn batch_write_item(
        &self,
        request: BatchWriteRequest,
    ) -> Result<BatchWriteOutput, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.requests {
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.take_fail_next() {
            debug!(error = %error, "Simulated store failure");
            return Err(error);
        }

        self.check_tables(&request)?;

        if self.take_unprocessed_next() {
            return Ok(BatchWriteOutput {
                unprocessed_items: request.request_items,
            });
        }

        self.apply(&request)?;

        debug!(items = request.len(), "Batch applied");
        Ok(BatchWriteOutput::default())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kvlog_domain::RecordKey;

    fn record(key: &str, body: &str) -> StoredRecord {
        StoredRecord {
            key: RecordKey::parse(key).unwrap(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_put_then_read_back() {
        let store = MemoryStore::new();
        let rec = record("20240115T100000123000000001", r#"{"n":1}"#);

        let output = store
            .batch_write_item(BatchWriteRequest::single_put("events", &rec))
            .await
            .unwrap();

        assert_eq!(output.unprocessed_count(), 0);
        assert_eq!(store.call_count(), 1);
        assert_eq!(store.record_count("events"), 1);
        assert_eq!(store.get("events", rec.key.as_str()), Some(rec));
    }

    #[tokio::test]
    async fn test_put_is_unconditional_overwrite() {
        let store = MemoryStore::new();
        let key = "20240115T100000123000000001";

        store
            .batch_write_item(BatchWriteRequest::single_put("events", &record(key, "1")))
            .await
            .unwrap();
        store
            .batch_write_item(BatchWriteRequest::single_put("events", &record(key, "2")))
            .await
            .unwrap();

        assert_eq!(store.record_count("events"), 1);
        assert_eq!(store.get("events", key).unwrap().body, "2");
    }

    #[tokio::test]
    async fn test_records_come_back_in_key_order() {
        let store = MemoryStore::new();
        for key in [
            "20240115T100002000000000000",
            "20240115T100000000000000000",
            "20240115T100001000000000000",
        ] {
            store
                .batch_write_item(BatchWriteRequest::single_put("events", &record(key, "{}")))
                .await
                .unwrap();
        }

        let keys: Vec<String> = store
            .records("events")
            .unwrap()
            .into_iter()
            .map(|r| r.key.into_string())
            .collect();

        assert_eq!(
            keys,
            vec![
                "20240115T100000000000000000",
                "20240115T100001000000000000",
                "20240115T100002000000000000",
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_table_rejected() {
        let store = MemoryStore::with_tables(["events"]);
        let rec = record("20240115T100000123000000001", "{}");

        let err = store
            .batch_write_item(BatchWriteRequest::single_put("missing", &rec))
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::TableNotFound("missing".to_string()));
        assert_eq!(store.record_count("missing"), 0);
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let store = MemoryStore::new();
        store.set_fail_next(StoreError::Throttled("slow down".to_string()));
        let rec = record("20240115T100000123000000001", "{}");

        let first = store
            .batch_write_item(BatchWriteRequest::single_put("events", &rec))
            .await;
        let second = store
            .batch_write_item(BatchWriteRequest::single_put("events", &rec))
            .await;

        assert!(matches!(first, Err(StoreError::Throttled(_))));
        assert!(second.is_ok());
        assert_eq!(store.call_count(), 2);
        assert_eq!(store.record_count("events"), 1);
    }

    #[tokio::test]
    async fn test_unprocessed_next_leaves_item_unwritten() {
        let store = MemoryStore::new();
        store.set_unprocessed_next();
        let rec = record("20240115T100000123000000001", "{}");

        let output = store
            .batch_write_item(BatchWriteRequest::single_put("events", &rec))
            .await
            .unwrap();

        assert_eq!(output.unprocessed_count(), 1);
        assert_eq!(store.record_count("events"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_delays_apply() {
        let store = std::sync::Arc::new(
            MemoryStore::new().with_latency(Duration::from_millis(50)),
        );
        let rec = record("20240115T100000123000000001", "{}");

        let task = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .batch_write_item(BatchWriteRequest::single_put("events", &rec))
                    .await
            })
        };

        tokio::task::yield_now().await;
        assert_eq!(store.record_count("events"), 0);

        task.await.unwrap().unwrap();
        assert_eq!(store.record_count("events"), 1);
    }

    #[tokio::test]
    async fn test_request_log_is_opt_in() {
        let rec = record("20240115T100000123000000001", "{}");

        let plain = MemoryStore::new();
        plain
            .batch_write_item(BatchWriteRequest::single_put("events", &rec))
            .await
            .unwrap();
        assert!(plain.requests().is_empty());
        assert_eq!(plain.call_count(), 1);

        let logged = MemoryStore::new().with_request_log();
        logged
            .batch_write_item(BatchWriteRequest::single_put("events", &rec))
            .await
            .unwrap();
        assert_eq!(logged.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_resets_state() {
        let store = MemoryStore::new().with_request_log();
        let rec = record("20240115T100000123000000001", "{}");
        store
            .batch_write_item(BatchWriteRequest::single_put("events", &rec))
            .await
            .unwrap();

        store.clear();

        assert_eq!(store.call_count(), 0);
        assert_eq!(store.record_count("events"), 0);
        assert!(store.requests().is_empty());
    }
}
