//! In-memory storage backend implementation for the tailor service.
//!
//! This module provides a memory-based implementation of the StorageInterface trait,
//! useful for testing and development scenarios where persistence is not required.

use crate::{BatchEntry, Expected, StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tailor_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use tokio::sync::RwLock;

/// In-memory storage implementation.
///
/// Data lives in an ordered map behind a read-write lock. A commit holds the
/// write lock while it checks every precondition and applies every write, so
/// readers see either none or all of a batch.
pub struct MemoryStorage {
	/// The in-memory store protected by a read-write lock.
	store: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
	/// Creates a new MemoryStorage instance.
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(BTreeMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

/// Checks one precondition against the current map contents.
pub(crate) fn precondition_holds(current: Option<&Vec<u8>>, expected: &Expected) -> bool {
	match (expected, current) {
		(Expected::Absent, None) => true,
		(Expected::Bytes(bytes), Some(current)) => bytes == current,
		_ => false,
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store.get(key).cloned().ok_or(StorageError::NotFound)
	}

	async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let store = self.store.read().await;
		Ok(store
			.range(prefix.to_string()..)
			.take_while(|(key, _)| key.starts_with(prefix))
			.map(|(key, _)| key.clone())
			.collect())
	}

	async fn commit(&self, batch: Vec<BatchEntry>) -> Result<(), StorageError> {
		let mut store = self.store.write().await;

		for entry in &batch {
			if !precondition_holds(store.get(&entry.key), &entry.expected) {
				return Err(StorageError::Conflict(entry.key.clone()));
			}
		}

		for entry in batch {
			if let Some(value) = entry.value {
				store.insert(entry.key, value);
			}
		}
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}
}

/// Configuration schema for MemoryStorage.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Memory storage takes no options
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		|config: &toml::Value| -> Result<Box<dyn StorageInterface>, StorageError> {
			MemoryStorageSchema
				.validate(config)
				.map_err(|e| StorageError::Configuration(e.to_string()))?;
			Ok(Box::new(MemoryStorage::new()))
		}
	}
}

impl StorageRegistry for Registry {}
