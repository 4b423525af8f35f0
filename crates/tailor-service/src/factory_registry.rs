//! Dynamic factory registry for storage implementations.
//!
//! Every backend shipped with `tailor-storage` is registered once under its
//! configuration name; the service builds its engine by looking up the
//! implementations named in `[storage.implementations]`.

use std::collections::HashMap;
use std::sync::OnceLock;
use tailor_config::Config;
use tailor_core::{WorkflowBuilder, WorkflowEngine, WorkflowFactories};
use tailor_storage::StorageFactory;

/// Global registry of implementation factories.
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
}

impl FactoryRegistry {
	/// Create a new empty registry
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
		}
	}

	/// Register a storage implementation
	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Get the global factory registry, populating it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();
		for (name, factory) in tailor_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}
		registry
	})
}

/// Builds the workflow engine for `config`.
///
/// Fails when the configuration names a storage implementation that is not
/// registered, listing the available ones.
pub fn build_engine_from_config(
	config: Config,
) -> Result<WorkflowEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let mut storage_factories = HashMap::new();
	for name in config.storage.implementations.keys() {
		let Some(factory) = registry.storage.get(name) else {
			let mut available: Vec<_> = registry.storage.keys().cloned().collect();
			available.sort();
			return Err(format!(
				"Unknown storage implementation '{}'. Available: [{}]",
				name,
				available.join(", ")
			)
			.into());
		};
		storage_factories.insert(name.clone(), *factory);
	}

	Ok(WorkflowBuilder::new(config).build(WorkflowFactories { storage_factories })?)
}
