//! Batch-write wire types
//!
//! Serde models of the DynamoDB JSON shapes used by `BatchWriteItem`:
//!
//! ```json
//! {"RequestItems": {"events": [{"PutRequest": {"Item": {"key": {"S": "..."}, "body": {"S": "..."}}}}]}}
//! ```

use kvlog_domain::{RecordKey, StoredRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::StoreError;

/// Attribute name of the primary key
pub const KEY_ATTRIBUTE: &str = "key";

/// Attribute name of the serialized event
pub const BODY_ATTRIBUTE: &str = "body";

/// A typed attribute value. Only strings are ever written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String attribute
    S(String),
}

impl AttributeValue {
    /// String payload, if this is a string attribute
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(value) => Some(value),
        }
    }
}

/// One item: attribute name to value
pub type Item = BTreeMap<String, AttributeValue>;

/// One operation inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteRequest {
    /// Unconditional insert-or-replace
    #[serde(rename = "PutRequest")]
    Put {
        /// Item to write
        #[serde(rename = "Item")]
        item: Item,
    },
}

impl WriteRequest {
    /// Put request carrying exactly the `key` and `body` attributes of a record
    pub fn put_record(record: &StoredRecord) -> Self {
        let mut item = Item::new();
        item.insert(
            KEY_ATTRIBUTE.to_string(),
            AttributeValue::S(record.key.as_str().to_string()),
        );
        item.insert(
            BODY_ATTRIBUTE.to_string(),
            AttributeValue::S(record.body.clone()),
        );
        WriteRequest::Put { item }
    }

    /// Item carried by the request
    pub fn item(&self) -> &Item {
        match self {
            WriteRequest::Put { item } => item,
        }
    }
}

/// Convert a stored item back into a record
pub fn record_from_item(item: &Item) -> Result<StoredRecord, StoreError> {
    let key = item
        .get(KEY_ATTRIBUTE)
        .and_then(AttributeValue::as_s)
        .ok_or_else(|| StoreError::Serialization("item has no string key".to_string()))?;
    let body = item
        .get(BODY_ATTRIBUTE)
        .and_then(AttributeValue::as_s)
        .ok_or_else(|| StoreError::Serialization("item has no string body".to_string()))?;

    let key = RecordKey::parse(key).map_err(|e| StoreError::Serialization(e.to_string()))?;

    Ok(StoredRecord {
        key,
        body: body.to_string(),
    })
}

/// `BatchWriteItem` request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchWriteRequest {
    /// Operations grouped by table name
    #[serde(rename = "RequestItems")]
    pub request_items: BTreeMap<String, Vec<WriteRequest>>,
}

impl BatchWriteRequest {
    /// Batch holding one unconditional put of `record` into `table`
    pub fn single_put(table: impl Into<String>, record: &StoredRecord) -> Self {
        let mut request_items = BTreeMap::new();
        request_items.insert(table.into(), vec![WriteRequest::put_record(record)]);
        Self { request_items }
    }

    /// Total number of operations across all tables
    pub fn len(&self) -> usize {
        self.request_items.values().map(Vec::len).sum()
    }

    /// True if the batch carries no operations
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `BatchWriteItem` response
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchWriteOutput {
    /// Operations the store did not apply, grouped by table name
    #[serde(rename = "UnprocessedItems", default)]
    pub unprocessed_items: BTreeMap<String, Vec<WriteRequest>>,
}

impl BatchWriteOutput {
    /// Number of operations left unprocessed
    pub fn unprocessed_count(&self) -> usize {
        self.unprocessed_items.values().map(Vec::len).sum()
    }

    /// Fail if anything was left unprocessed.
    pub fn ensure_processed(&self) -> Result<(), StoreError> {
        match self
            .unprocessed_items
            .iter()
            .find(|(_, requests)| !requests.is_empty())
        {
            Some((table, requests)) => Err(StoreError::Unprocessed {
                table: table.clone(),
                count: requests.len(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> StoredRecord {
        StoredRecord {
            key: RecordKey::parse("20240115T100000123000000456").unwrap(),
            body: r#"{"type":"signup"}"#.to_string(),
        }
    }

    #[test]
    fn test_single_put_wire_shape() {
        let request = BatchWriteRequest::single_put("events", &record());
        let wire = serde_json::to_value(&request).unwrap();

        assert_eq!(
            wire,
            json!({
                "RequestItems": {
                    "events": [{
                        "PutRequest": {
                            "Item": {
                                "key": {"S": "20240115T100000123000000456"},
                                "body": {"S": "{\"type\":\"signup\"}"}
                            }
                        }
                    }]
                }
            })
        );
        assert_eq!(request.len(), 1);
    }

    #[test]
    fn test_put_record_has_only_key_and_body() {
        let request = WriteRequest::put_record(&record());
        let names: Vec<&str> = request.item().keys().map(String::as_str).collect();

        assert_eq!(names, vec!["body", "key"]);
    }

    #[test]
    fn test_record_from_item_reads_back() {
        let request = WriteRequest::put_record(&record());
        assert_eq!(record_from_item(request.item()).unwrap(), record());
    }

    #[test]
    fn test_output_without_unprocessed_items() {
        let output: BatchWriteOutput = serde_json::from_str(r#"{"UnprocessedItems": {}}"#).unwrap();
        assert_eq!(output.unprocessed_count(), 0);
        assert!(output.ensure_processed().is_ok());

        let output: BatchWriteOutput = serde_json::from_str("{}").unwrap();
        assert!(output.ensure_processed().is_ok());
    }

    #[test]
    fn test_output_with_unprocessed_items() {
        let body = json!({
            "UnprocessedItems": {
                "events": [{"PutRequest": {"Item": {"key": {"S": "k"}, "body": {"S": "{}"}}}}]
            }
        });
        let output: BatchWriteOutput = serde_json::from_value(body).unwrap();

        assert_eq!(output.unprocessed_count(), 1);
        assert_eq!(
            output.ensure_processed(),
            Err(StoreError::Unprocessed {
                table: "events".to_string(),
                count: 1
            })
        );
    }
}
