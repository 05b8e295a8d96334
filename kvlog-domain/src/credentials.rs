//! Store credentials
//!
//! Access key pair passed to the backing store client.

use std::fmt;
use zeroize::Zeroize;

use crate::value_objects::DomainError;

/// Access key pair for the backing store (in-memory only, never persisted).
///
/// The secret is zeroized when dropped and redacted from `Debug` output.
#[derive(Clone)]
pub struct StoreCredentials {
    /// Access key ID (public identifier)
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: zeroize::Zeroizing<String>,
}

impl StoreCredentials {
    /// Create new credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: zeroize::Zeroizing::new(secret_access_key.into()),
        }
    }

    /// Ensure both halves are present.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.access_key_id.trim().is_empty() {
            return Err(DomainError::InvalidCredentials(
                "access key id is empty".to_string(),
            ));
        }
        if self.secret_access_key.is_empty() {
            return Err(DomainError::InvalidCredentials(
                "secret access key is empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl Zeroize for StoreCredentials {
    fn zeroize(&mut self) {
        self.access_key_id.zeroize();
        self.secret_access_key.zeroize();
    }
}

impl Drop for StoreCredentials {
    fn drop(&mut self) {
        self.zeroize();
    }
}
