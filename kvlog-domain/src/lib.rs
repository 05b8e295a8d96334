//! Kvlog Domain Layer
//!
//! Pure types with zero I/O dependencies: sortable record keys,
//! the stored record shape, and store credentials.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod credentials;
pub mod key;
pub mod value_objects;

// Re-export commonly used types
pub use credentials::StoreCredentials;
pub use key::{Clock, KeyFormat, KeyGenerator, ManualClock, SystemClock};
pub use value_objects::{DomainError, RecordKey, StoredRecord};
