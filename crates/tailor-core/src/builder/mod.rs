//! Builder for constructing workflow engines.
//!
//! Storage backends are pluggable: the builder looks up the configured
//! implementations in a table of factory functions, validates and creates
//! each one, and wires the primary backend into the engine.

use crate::engine::WorkflowEngine;
use std::collections::HashMap;
use std::sync::Arc;
use tailor_config::Config;
use tailor_storage::{RetryPolicy, StorageError, StorageInterface, StorageService};
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions available to the builder, keyed by implementation name.
pub struct WorkflowFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

impl<SF> WorkflowFactories<SF> {
	/// Collects `(name, factory)` pairs such as those from
	/// `tailor_storage::get_all_implementations`.
	pub fn from_storage<I>(implementations: I) -> Self
	where
		I: IntoIterator<Item = (&'static str, SF)>,
	{
		Self {
			storage_factories: implementations
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}
}

/// Builder for constructing a WorkflowEngine with a pluggable storage backend.
pub struct WorkflowBuilder {
	config: Config,
}

impl WorkflowBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine, creating every configured storage implementation
	/// that has a factory and keeping the primary one.
	pub fn build<SF>(self, factories: WorkflowFactories<SF>) -> Result<WorkflowEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			let Some(factory) = factories.storage_factories.get(name) else {
				tracing::warn!(component = "storage", implementation = %name, "No factory registered, skipping");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					let is_primary = &self.config.storage.primary == name;
					tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
					storage_impls.insert(name.clone(), implementation);
				},
				Err(e) => {
					tracing::error!(
						component = "storage",
						implementation = %name,
						error = %e,
						"Failed to create storage implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create storage implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		if storage_impls.is_empty() {
			return Err(BuilderError::MissingComponent(
				"no valid storage implementations available".into(),
			));
		}

		let primary = &self.config.storage.primary;
		let backend = storage_impls.remove(primary).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary storage '{}' failed to load or has invalid configuration",
				primary
			))
		})?;

		let retry = &self.config.storage.retry;
		let storage = StorageService::new(backend).with_retry_policy(RetryPolicy {
			initial_interval: retry.initial_interval(),
			max_interval: retry.max_interval(),
			max_elapsed: retry.max_elapsed(),
		});

		Ok(WorkflowEngine::new(self.config, Arc::new(storage)))
	}
}
