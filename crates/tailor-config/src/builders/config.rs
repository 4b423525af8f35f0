//! Configuration builder for creating test and development configurations.

use crate::{
	ApiConfig, Config, RetryConfig, ServiceConfig, StorageConfig, WorkflowConfig,
};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to an in-memory store and fast storage retries.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	storage_primary: String,
	storage_implementations: HashMap<String, toml::Value>,
	retry: RetryConfig,
	workflow: WorkflowConfig,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` with default values suitable for testing.
	pub fn new() -> Self {
		let mut storage_implementations = HashMap::new();
		storage_implementations.insert(
			"memory".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);
		Self {
			service_id: "tailor-test".to_string(),
			storage_primary: "memory".to_string(),
			storage_implementations,
			retry: RetryConfig {
				initial_interval_ms: 1,
				max_interval_ms: 10,
				max_elapsed_ms: 200,
			},
			workflow: WorkflowConfig::default(),
			api: None,
		}
	}

	/// Sets the service ID.
	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	/// Selects the primary storage implementation and its options.
	pub fn storage(mut self, primary: impl Into<String>, options: toml::Value) -> Self {
		let primary = primary.into();
		self.storage_implementations.insert(primary.clone(), options);
		self.storage_primary = primary;
		self
	}

	/// Sets the workflow tuning.
	pub fn workflow(mut self, workflow: WorkflowConfig) -> Self {
		self.workflow = workflow;
		self
	}

	/// Sets the maximum page size.
	pub fn max_page_size(mut self, max_page_size: u32) -> Self {
		self.workflow.max_page_size = max_page_size;
		self.workflow.default_page_size = self.workflow.default_page_size.min(max_page_size);
		self
	}

	/// Sets the API configuration.
	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	/// Builds the `Config` with the configured values.
	pub fn build(self) -> Config {
		Config {
			service: ServiceConfig {
				id: self.service_id,
			},
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations: self.storage_implementations,
				retry: self.retry,
			},
			workflow: self.workflow,
			api: self.api,
		}
	}
}
