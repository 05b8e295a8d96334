//! CLI configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{CliError, CliResult};
use kvlog_connectors::{ConnectionConfig, DEFAULT_REGION};
use kvlog_domain::{KeyFormat, StoreCredentials};
use std::env;
use std::fmt;

/// Default cap on concurrent writes during ingest
pub const DEFAULT_MAX_IN_FLIGHT: usize = 25;

// =============================================================================
// Configuration
// =============================================================================

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment (test, development, production)
    pub environment: Environment,

    /// Target table
    pub table_name: String,

    /// Store connection parameters
    pub connection: ConnectionConfig,

    /// Record key suffix format
    pub key_format: KeyFormat,

    /// Maximum writes outstanding at once during ingest
    pub max_in_flight: usize,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (writes to an in-memory store)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> CliResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (environment, map, ...).
    pub fn from_lookup<F>(lookup: F) -> CliResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = Self::load_environment(&lookup)?;
        let table_name = lookup("KVLOG_TABLE")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| CliError::Config("KVLOG_TABLE is required".to_string()))?;
        let connection = Self::load_connection(&lookup)?;
        let key_format = match lookup("KVLOG_KEY_FORMAT") {
            Some(value) => value
                .parse::<KeyFormat>()
                .map_err(|e| CliError::Config(format!("Invalid KVLOG_KEY_FORMAT: {}", e)))?,
            None => KeyFormat::default(),
        };
        let max_in_flight = match lookup("KVLOG_MAX_IN_FLIGHT") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    CliError::Config(format!("Invalid KVLOG_MAX_IN_FLIGHT value: {}", value))
                })?,
            None => DEFAULT_MAX_IN_FLIGHT,
        };

        Ok(Self {
            environment,
            table_name,
            connection,
            key_format,
            max_in_flight,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            environment: Environment::Test,
            table_name: "events".to_string(),
            connection: ConnectionConfig::default(),
            key_format: KeyFormat::Monotonic,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    fn load_environment<F>(lookup: &F) -> CliResult<Environment>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_str = lookup("KVLOG_ENV").unwrap_or_else(|| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(CliError::Config(format!(
                "Invalid KVLOG_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_connection<F>(lookup: &F) -> CliResult<ConnectionConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let region = lookup("KVLOG_REGION")
            .or_else(|| lookup("AWS_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let ssl_enabled = match lookup("KVLOG_SSL_ENABLED") {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                CliError::Config(format!("Invalid KVLOG_SSL_ENABLED value: {}", value))
            })?,
            None => true,
        };

        let mut connection = ConnectionConfig::new(region).with_ssl(ssl_enabled);

        match (lookup("AWS_ACCESS_KEY_ID"), lookup("AWS_SECRET_ACCESS_KEY")) {
            (Some(key_id), Some(secret)) => {
                connection = connection.with_credentials(StoreCredentials::new(key_id, secret));
            }
            (None, None) => {}
            _ => {
                return Err(CliError::Config(
                    "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together"
                        .to_string(),
                ))
            }
        }

        if let Some(endpoint) = lookup("KVLOG_ENDPOINT").filter(|e| !e.trim().is_empty()) {
            connection = connection.with_endpoint(endpoint);
        }

        Ok(connection)
    }
}

/// Accepts true/false, 1/0, yes/no, on/off (case-insensitive)
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> CliResult<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.table_name, "events");
        assert!(config.connection.ssl_enabled);
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("KVLOG_TABLE", "events")]).unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.connection.region, DEFAULT_REGION);
        assert!(config.connection.ssl_enabled);
        assert!(config.connection.credentials.is_none());
        assert!(config.connection.endpoint.is_none());
        assert_eq!(config.key_format, KeyFormat::Monotonic);
        assert_eq!(config.max_in_flight, DEFAULT_MAX_IN_FLIGHT);
    }

    #[test]
    fn test_max_in_flight() {
        let config = load(&[("KVLOG_TABLE", "events"), ("KVLOG_MAX_IN_FLIGHT", "4")]).unwrap();
        assert_eq!(config.max_in_flight, 4);

        assert!(load(&[("KVLOG_TABLE", "events"), ("KVLOG_MAX_IN_FLIGHT", "0")]).is_err());
        assert!(load(&[("KVLOG_TABLE", "events"), ("KVLOG_MAX_IN_FLIGHT", "many")]).is_err());
    }

    #[test]
    fn test_table_required() {
        assert!(matches!(load(&[]), Err(CliError::Config(_))));
        assert!(matches!(load(&[("KVLOG_TABLE", " ")]), Err(CliError::Config(_))));
    }

    #[test]
    fn test_full_config() {
        let config = load(&[
            ("KVLOG_ENV", "prod"),
            ("KVLOG_TABLE", "audit"),
            ("AWS_REGION", "eu-central-1"),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("KVLOG_SSL_ENABLED", "false"),
            ("KVLOG_ENDPOINT", "localhost:8000"),
            ("KVLOG_KEY_FORMAT", "legacy"),
        ])
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.table_name, "audit");
        assert_eq!(config.connection.region, "eu-central-1");
        assert!(!config.connection.ssl_enabled);
        assert_eq!(config.connection.endpoint_url(), "http://localhost:8000");
        assert_eq!(
            config.connection.credentials.as_ref().unwrap().access_key_id,
            "AKIDEXAMPLE"
        );
        assert_eq!(config.key_format, KeyFormat::Legacy);
    }

    #[test]
    fn test_kvlog_region_wins_over_aws_region() {
        let config = load(&[
            ("KVLOG_TABLE", "events"),
            ("KVLOG_REGION", "ap-south-1"),
            ("AWS_REGION", "eu-central-1"),
        ])
        .unwrap();

        assert_eq!(config.connection.region, "ap-south-1");
    }

    #[test]
    fn test_half_credentials_rejected() {
        let result = load(&[("KVLOG_TABLE", "events"), ("AWS_ACCESS_KEY_ID", "AKID")]);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(load(&[("KVLOG_TABLE", "e"), ("KVLOG_ENV", "staging")]).is_err());
        assert!(load(&[("KVLOG_TABLE", "e"), ("KVLOG_SSL_ENABLED", "maybe")]).is_err());
        assert!(load(&[("KVLOG_TABLE", "e"), ("KVLOG_KEY_FORMAT", "uuid")]).is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
