//! Configuration module for the tailor workflow service.
//!
//! This module provides structures and utilities for managing service configuration.
//! It supports loading configuration from TOML files and provides validation to ensure
//! all required configuration values are properly set.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files for better organization:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

#[cfg(any(test, feature = "testing"))]
pub mod builders;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the tailor service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this service instance.
	pub service: ServiceConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Tuning for the workflow components.
	#[serde(default)]
	pub workflow: WorkflowConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this instance, used in logs.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Retry bounds for storage backend faults.
	#[serde(default)]
	pub retry: RetryConfig,
}

/// Exponential backoff bounds applied to storage backend faults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
	#[serde(default = "default_initial_interval_ms")]
	pub initial_interval_ms: u64,
	#[serde(default = "default_max_interval_ms")]
	pub max_interval_ms: u64,
	/// Total time spent retrying before the fault is surfaced.
	#[serde(default = "default_max_elapsed_ms")]
	pub max_elapsed_ms: u64,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			initial_interval_ms: default_initial_interval_ms(),
			max_interval_ms: default_max_interval_ms(),
			max_elapsed_ms: default_max_elapsed_ms(),
		}
	}
}

impl RetryConfig {
	pub fn initial_interval(&self) -> Duration {
		Duration::from_millis(self.initial_interval_ms)
	}

	pub fn max_interval(&self) -> Duration {
		Duration::from_millis(self.max_interval_ms)
	}

	pub fn max_elapsed(&self) -> Duration {
		Duration::from_millis(self.max_elapsed_ms)
	}
}

fn default_initial_interval_ms() -> u64 {
	50
}

fn default_max_interval_ms() -> u64 {
	2_000
}

fn default_max_elapsed_ms() -> u64 {
	10_000
}

/// Tuning for the order, bid and progress components.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
	/// Page size used when a listing request does not name one.
	#[serde(default = "default_page_size")]
	pub default_page_size: u32,
	/// Upper bound that requested page sizes are clamped to.
	#[serde(default = "default_max_page_size")]
	pub max_page_size: u32,
	/// How many times a mutation re-reads and re-validates after losing a
	/// compare-and-swap race before giving up.
	#[serde(default = "default_max_conflict_retries")]
	pub max_conflict_retries: u32,
}

impl Default for WorkflowConfig {
	fn default() -> Self {
		Self {
			default_page_size: default_page_size(),
			max_page_size: default_max_page_size(),
			max_conflict_retries: default_max_conflict_retries(),
		}
	}
}

fn default_page_size() -> u32 {
	20
}

fn default_max_page_size() -> u32 {
	100
}

fn default_max_conflict_retries() -> u32 {
	5
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// CORS configuration.
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	/// Allowed origins for CORS.
	pub allowed_origins: Vec<String>,
	/// Allowed headers for CORS.
	pub allowed_headers: Vec<String>,
	/// Allowed methods for CORS.
	pub allowed_methods: Vec<String>,
}

/// Returns the default API host.
fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

/// Returns the default API port.
fn default_api_port() -> u16 {
	3000
}

/// Returns the default API timeout in seconds.
fn default_api_timeout() -> u64 {
	30
}

/// Returns the default maximum request size in bytes.
fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut replacements = Vec::new();
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};
		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	let mut result = input.to_string();
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving includes and environment variables.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		// Storage
		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}
		let retry = &self.storage.retry;
		if retry.initial_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"storage.retry.initial_interval_ms must be greater than 0".into(),
			));
		}
		if retry.max_interval_ms < retry.initial_interval_ms {
			return Err(ConfigError::Validation(
				"storage.retry.max_interval_ms cannot be below initial_interval_ms".into(),
			));
		}

		// Workflow
		let workflow = &self.workflow;
		if workflow.max_page_size == 0 {
			return Err(ConfigError::Validation(
				"workflow.max_page_size must be at least 1".into(),
			));
		}
		if workflow.default_page_size == 0 || workflow.default_page_size > workflow.max_page_size
		{
			return Err(ConfigError::Validation(format!(
				"workflow.default_page_size must be between 1 and max_page_size ({})",
				workflow.max_page_size
			)));
		}
		if workflow.max_conflict_retries == 0 {
			return Err(ConfigError::Validation(
				"workflow.max_conflict_retries must be at least 1".into(),
			));
		}
		if workflow.max_conflict_retries > 100 {
			return Err(ConfigError::Validation(
				"workflow.max_conflict_retries cannot exceed 100".into(),
			));
		}

		if let Some(ref api) = self.api {
			if api.enabled && api.timeout_seconds == 0 {
				return Err(ConfigError::Validation(
					"api.timeout_seconds must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

/// Implementation of FromStr trait for Config to enable parsing from string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[service]
id = "tailor-test"

[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("TAILOR_TEST_HOST", "localhost");
		std::env::set_var("TAILOR_TEST_PORT", "5432");

		let input = "host = \"${TAILOR_TEST_HOST}:${TAILOR_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("TAILOR_TEST_HOST");
		std::env::remove_var("TAILOR_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${TAILOR_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${TAILOR_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("TAILOR_MISSING_VAR"));
	}

	#[test]
	fn test_minimal_config_gets_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.service.id, "tailor-test");
		assert_eq!(config.workflow.default_page_size, 20);
		assert_eq!(config.workflow.max_page_size, 100);
		assert_eq!(config.workflow.max_conflict_retries, 5);
		assert_eq!(config.storage.retry.max_elapsed(), Duration::from_secs(10));
		assert!(config.api.is_none());
	}

	#[test]
	fn test_config_with_env_vars() {
		std::env::set_var("TAILOR_TEST_SERVICE_ID", "from-env");

		let config_str = r#"
[service]
id = "${TAILOR_TEST_SERVICE_ID}"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "${TAILOR_TEST_STORAGE_PATH:-./data/test}"

[api]
enabled = true
port = 8081
"#;

		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.service.id, "from-env");
		assert_eq!(
			config.storage.implementations["file"]
				.get("storage_path")
				.and_then(|v| v.as_str()),
			Some("./data/test")
		);
		let api = config.api.unwrap();
		assert_eq!(api.port, 8081);
		assert_eq!(api.host, "127.0.0.1");

		std::env::remove_var("TAILOR_TEST_SERVICE_ID");
	}

	#[test]
	fn test_primary_storage_must_be_configured() {
		let config_str = r#"
[service]
id = "tailor-test"

[storage]
primary = "file"
[storage.implementations.memory]
"#;
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Primary storage 'file'"));
	}

	#[test]
	fn test_default_page_size_above_max_rejected() {
		let config_str = format!(
			"{}\n[workflow]\ndefault_page_size = 50\nmax_page_size = 10\n",
			MINIMAL
		);
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("default_page_size"));
	}

	#[test]
	fn test_zero_conflict_retries_rejected() {
		let config_str = format!("{}\n[workflow]\nmax_conflict_retries = 0\n", MINIMAL);
		assert!(config_str.parse::<Config>().is_err());
	}

	#[test]
	fn test_empty_service_id_rejected() {
		let config_str = MINIMAL.replace("tailor-test", " ");
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Service ID"));
	}
}
