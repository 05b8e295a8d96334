//! Connection parameters for the DynamoDB endpoint.

use kvlog_domain::StoreCredentials;
use std::time::Duration;

use crate::error::ConnectorError;

/// Default region when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Where and how to reach the store.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Region the requests are signed for and routed to
    pub region: String,
    /// Access key pair used to sign requests
    pub credentials: Option<StoreCredentials>,
    /// Use HTTPS (default true)
    pub ssl_enabled: bool,
    /// Overrides the regional endpoint, e.g. `localhost:8000` for DynamoDB Local
    pub endpoint: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ConnectionConfig {
    /// Config for `region` with TLS on and no credentials yet
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            credentials: None,
            ssl_enabled: true,
            endpoint: None,
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    /// Set credentials
    pub fn with_credentials(mut self, credentials: StoreCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Toggle TLS
    pub fn with_ssl(mut self, enabled: bool) -> Self {
        self.ssl_enabled = enabled;
        self
    }

    /// Override the endpoint host (optionally with scheme and port)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn scheme(&self) -> &'static str {
        if self.ssl_enabled {
            "https"
        } else {
            "http"
        }
    }

    /// Base URL requests are sent to.
    ///
    /// An endpoint override carrying its own scheme wins over `ssl_enabled`.
    pub fn endpoint_url(&self) -> String {
        match self.endpoint.as_deref().map(|e| e.trim_end_matches('/')) {
            Some(endpoint) if endpoint.contains("://") => endpoint.to_string(),
            Some(endpoint) => format!("{}://{}", self.scheme(), endpoint),
            None => format!("{}://dynamodb.{}.amazonaws.com", self.scheme(), self.region),
        }
    }

    /// Endpoint the SDK must be pointed at, if not its regional default.
    ///
    /// `None` for the regional HTTPS endpoint; the SDK resolves that itself.
    pub fn endpoint_override(&self) -> Option<String> {
        if self.endpoint.is_some() || !self.ssl_enabled {
            Some(self.endpoint_url())
        } else {
            None
        }
    }

    /// Check the config is usable for signed requests.
    pub fn validate(&self) -> Result<&StoreCredentials, ConnectorError> {
        if self.region.trim().is_empty() {
            return Err(ConnectorError::InvalidConfig("region is empty".to_string()));
        }

        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ConnectorError::InvalidConfig("credentials are missing".to_string()))?;
        credentials.validate()?;

        Ok(credentials)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}
