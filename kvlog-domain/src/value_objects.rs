//! Value Objects for the Kvlog Domain
//!
//! Immutable, validated primitives shared by the appender and the stores.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the `YYYYMMDDTHHMMSS` prefix every record key starts with.
pub const KEY_SECOND_PREFIX_LEN: usize = 15;

/// chrono format string for the second-resolution key prefix.
pub const KEY_SECOND_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Record key does not start with a `YYYYMMDDTHHMMSS` prefix
    #[error("Invalid record key: {0}")]
    InvalidKey(String),

    /// Credentials are incomplete
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

// =============================================================================
// RecordKey
// =============================================================================

/// Primary key of a stored record.
///
/// `YYYYMMDD` + `T` + `HHMMSS` followed by a sub-second uniqueness suffix.
/// Ordering is plain lexicographic string ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    /// Wrap an already-rendered key. Callers inside the crate guarantee the shape.
    pub(crate) fn from_rendered(key: String) -> Self {
        Self(key)
    }

    /// Parse a key read back from a store.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidKey` if the second-resolution prefix is
    /// malformed or the suffix contains non-digits.
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();

        if value.len() < KEY_SECOND_PREFIX_LEN || !value.is_ascii() {
            return Err(DomainError::InvalidKey(value));
        }

        let (prefix, suffix) = value.split_at(KEY_SECOND_PREFIX_LEN);
        if NaiveDateTime::parse_from_str(prefix, KEY_SECOND_FORMAT).is_err()
            || !suffix.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(DomainError::InvalidKey(value));
        }

        Ok(Self(value))
    }

    /// Borrow the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key, returning the owned string
    pub fn into_string(self) -> String {
        self.0
    }

    /// Wall-clock second encoded in the key prefix
    pub fn second(&self) -> Option<DateTime<Utc>> {
        let prefix = self.0.get(..KEY_SECOND_PREFIX_LEN)?;
        NaiveDateTime::parse_from_str(prefix, KEY_SECOND_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

impl AsRef<str> for RecordKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// StoredRecord
// =============================================================================

/// The persisted representation of one event.
///
/// # Invariants
/// - `body` is the JSON serialization of the appended event
/// - the record is never mutated after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Primary key
    pub key: RecordKey,
    /// Serialized event
    pub body: String,
}

impl StoredRecord {
    /// Serialize `event` into a record under `key`.
    ///
    /// # Errors
    /// Propagates the serializer error unchanged.
    pub fn from_event<E>(key: RecordKey, event: &E) -> Result<Self, serde_json::Error>
    where
        E: Serialize + ?Sized,
    {
        let body = serde_json::to_string(event)?;
        Ok(Self { key, body })
    }

    /// Deserialize the body back into a caller type
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_accepts_generated_shape() {
        let key = RecordKey::parse("20240115T100000123456789").unwrap();
        assert_eq!(key.as_str(), "20240115T100000123456789");
        assert_eq!(
            key.second().unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_bad_prefix() {
        assert!(RecordKey::parse("2024-01-15T10:00").is_err());
        assert!(RecordKey::parse("20241315T100000123").is_err());
        assert!(RecordKey::parse("20240115T10000012a").is_err());
        assert!(RecordKey::parse("").is_err());
    }

    #[test]
    fn test_keys_order_lexicographically() {
        let earlier = RecordKey::parse("20240115T100000999000000001").unwrap();
        let later = RecordKey::parse("20240115T100001000000000000").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_record_body_round_trips() {
        let event = json!({
            "type": "signup",
            "user": {"id": 42, "tags": ["a", "b"]},
            "score": 1.5,
            "active": true,
            "referrer": null
        });
        let key = RecordKey::parse("20240115T100000123").unwrap();

        let record = StoredRecord::from_event(key, &event).unwrap();
        let decoded: serde_json::Value = record.decode_body().unwrap();

        assert_eq!(decoded, event);
    }

    #[test]
    fn test_record_from_event_propagates_serializer_error() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let mut event = HashMap::new();
        event.insert((1, 2), "tuple keyed");

        let key = RecordKey::parse("20240115T100000123").unwrap();
        assert!(StoredRecord::from_event(key, &event).is_err());
    }
}
