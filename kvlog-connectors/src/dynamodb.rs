//! DynamoDB client for batch writes
//!
//! Thin adapter over `aws_sdk_dynamodb::Client::batch_write_item`:
//! - static credentials and region from `ConnectionConfig`
//! - endpoint override for local stores and plain-HTTP setups
//! - SDK retries disabled; one attempt per write
//!
//! Construction only builds the SDK client; nothing is sent until the
//! first write.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use aws_sdk_dynamodb::config::retry::RetryConfig;
use aws_sdk_dynamodb::config::timeout::TimeoutConfig;
use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types as ddb;
use aws_sdk_dynamodb::Client;
use tracing::debug;

use kvlog_store::{
    AttributeValue, BatchWriteClient, BatchWriteOutput, BatchWriteRequest, StoreError,
    WriteRequest,
};

use crate::config::ConnectionConfig;
use crate::error::ConnectorError;

/// Provider name attached to the static credentials
const CREDENTIALS_PROVIDER: &str = "kvlog";

// =============================================================================
// Client
// =============================================================================

/// DynamoDB implementation of the batch-write port.
pub struct DynamoDbClient {
    client: Client,
    config: ConnectionConfig,
    endpoint_url: String,
}

impl DynamoDbClient {
    /// Create a client from connection parameters.
    ///
    /// # Errors
    /// `InvalidConfig` if region or credentials are missing.
    pub fn new(config: ConnectionConfig) -> Result<Self, ConnectorError> {
        let credentials = config.validate()?;

        let mut builder = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(Credentials::new(
                credentials.access_key_id.clone(),
                credentials.secret_access_key.as_str().to_owned(),
                None,
                None,
                CREDENTIALS_PROVIDER,
            ))
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.timeout)
                    .build(),
            );

        if let Some(url) = config.endpoint_override() {
            builder = builder.endpoint_url(url);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            endpoint_url: config.endpoint_url(),
            config,
        })
    }

    /// URL requests are sent to
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Region requests are signed for
    pub fn region(&self) -> &str {
        &self.config.region
    }
}

#[async_trait]
impl BatchWriteClient for DynamoDbClient {
    async fn batch_write_item(
        &self,
        request: BatchWriteRequest,
    ) -> Result<BatchWriteOutput, StoreError> {
        debug!(
            endpoint = %self.endpoint_url,
            items = request.len(),
            "Sending BatchWriteItem"
        );

        let output = self
            .client
            .batch_write_item()
            .set_request_items(Some(to_sdk_items(request)?))
            .send()
            .await
            .map_err(map_sdk_error)?;

        let unprocessed_items = output
            .unprocessed_items()
            .map(|tables| {
                tables
                    .iter()
                    .map(|(table, writes)| {
                        (table.clone(), writes.iter().filter_map(from_sdk_write).collect())
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(BatchWriteOutput { unprocessed_items })
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn to_sdk_items(
    request: BatchWriteRequest,
) -> Result<HashMap<String, Vec<ddb::WriteRequest>>, StoreError> {
    request
        .request_items
        .into_iter()
        .map(|(table, writes)| {
            let writes = writes
                .into_iter()
                .map(to_sdk_write)
                .collect::<Result<Vec<_>, _>>()?;
            Ok((table, writes))
        })
        .collect()
}

fn to_sdk_write(write: WriteRequest) -> Result<ddb::WriteRequest, StoreError> {
    match write {
        WriteRequest::Put { item } => {
            let item = item
                .into_iter()
                .map(|(name, AttributeValue::S(value))| (name, ddb::AttributeValue::S(value)))
                .collect::<HashMap<_, _>>();
            let put = ddb::PutRequest::builder()
                .set_item(Some(item))
                .build()
                .map_err(|e| StoreError::Validation(e.to_string()))?;
            Ok(ddb::WriteRequest::builder().put_request(put).build())
        }
    }
}

/// Only string attributes are ever written, so others are dropped
fn from_sdk_write(write: &ddb::WriteRequest) -> Option<WriteRequest> {
    let put = write.put_request()?;
    let item = put
        .item()
        .iter()
        .filter_map(|(name, value)| {
            value
                .as_s()
                .ok()
                .map(|s| (name.clone(), AttributeValue::S(s.clone())))
        })
        .collect();
    Some(WriteRequest::Put { item })
}

// =============================================================================
// Errors
// =============================================================================

/// Map an SDK failure to a store error.
pub fn map_sdk_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: fmt::Debug,
{
    match &err {
        SdkError::TimeoutError(_) => StoreError::Timeout,
        SdkError::DispatchFailure(failure) if failure.is_timeout() => StoreError::Timeout,
        SdkError::DispatchFailure(_) => {
            StoreError::Connection(DisplayErrorContext(&err).to_string())
        }
        SdkError::ServiceError(context) => {
            map_error_code(context.err().code(), context.err().message())
        }
        _ => StoreError::api("SdkError", DisplayErrorContext(&err).to_string()),
    }
}

/// Map a DynamoDB error code and message to a store error.
pub fn map_error_code(code: Option<&str>, message: Option<&str>) -> StoreError {
    let message = message.unwrap_or_default().to_string();

    match code.unwrap_or_default() {
        "ResourceNotFoundException" => StoreError::TableNotFound(message),
        "ProvisionedThroughputExceededException"
        | "ThrottlingException"
        | "RequestLimitExceeded" => StoreError::Throttled(message),
        "UnrecognizedClientException"
        | "AccessDeniedException"
        | "InvalidSignatureException"
        | "MissingAuthenticationTokenException"
        | "IncompleteSignatureException"
        | "ExpiredTokenException" => StoreError::Unauthorized(message),
        "ValidationException" | "SerializationException" => StoreError::Validation(message),
        "" => StoreError::api("Unknown", message),
        other => StoreError::Api {
            code: other.to_string(),
            message,
        },
    }
}

// =============================================================================
// Tests
// =============================================================================
