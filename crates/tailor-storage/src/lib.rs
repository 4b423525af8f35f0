//! Storage module for the tailor workflow.
//!
//! This module is the persistence gateway consumed by the workflow core. It
//! provides a small key-value contract that every backend implements (point
//! reads, prefix scans and atomic multi-key commits guarded by
//! compare-and-swap preconditions) plus a typed service on top that handles
//! JSON serialization and bounded retry of infrastructure faults.

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tailor_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// A commit precondition did not hold; nothing was written.
	#[error("Precondition failed for key '{0}'")]
	Conflict(String),
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// State a key must be in for a commit to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
	/// The key must not exist.
	Absent,
	/// The key must hold exactly these bytes.
	Bytes(Vec<u8>),
}

/// One element of an atomic commit.
///
/// `value: None` makes the entry a pure guard: its precondition is checked
/// but nothing is written.
#[derive(Debug, Clone)]
pub struct BatchEntry {
	pub key: String,
	pub expected: Expected,
	pub value: Option<Vec<u8>>,
}

/// Trait defining the low-level interface for storage backends.
///
/// `commit` is the atomicity boundary of the whole system: either every
/// precondition in the batch holds and every write is applied, or the batch
/// fails with `StorageError::Conflict` and nothing is applied. Readers never
/// observe a partially applied batch.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Lists every stored key starting with `prefix`, sorted.
	async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

	/// Atomically checks all preconditions and applies all writes.
	async fn commit(&self, batch: Vec<BatchEntry>) -> Result<(), StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Builds the backend key for a record.
fn storage_key(namespace: &str, id: &str) -> String {
	format!("{}:{}", namespace, id)
}

/// A typed value together with the exact bytes it was read from.
///
/// The bytes are the compare-and-swap token: writing through a snapshot only
/// succeeds if the record is still byte-for-byte what was read.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
	pub value: T,
	key: String,
	raw: Vec<u8>,
}

impl<T> Snapshot<T> {
	/// Backend key the snapshot was read from.
	pub fn key(&self) -> &str {
		&self.key
	}
}

/// Builder for an atomic commit.
#[derive(Debug, Default)]
pub struct Transaction {
	entries: Vec<BatchEntry>,
}

impl Transaction {
	pub fn new() -> Self {
		Self::default()
	}

	/// Writes a new record; fails the commit if the key already exists.
	pub fn insert<T: Serialize>(
		&mut self,
		namespace: &str,
		id: &str,
		value: &T,
	) -> Result<(), StorageError> {
		self.entries.push(BatchEntry {
			key: storage_key(namespace, id),
			expected: Expected::Absent,
			value: Some(to_bytes(value)?),
		});
		Ok(())
	}

	/// Overwrites a record; fails the commit if it changed since `prior` was read.
	pub fn replace<T, U: Serialize>(
		&mut self,
		prior: &Snapshot<T>,
		value: &U,
	) -> Result<(), StorageError> {
		self.entries.push(BatchEntry {
			key: prior.key.clone(),
			expected: Expected::Bytes(prior.raw.clone()),
			value: Some(to_bytes(value)?),
		});
		Ok(())
	}

	/// Writes a record that may or may not exist yet, guarded by what was read.
	pub fn upsert<T, U: Serialize>(
		&mut self,
		namespace: &str,
		id: &str,
		prior: Option<&Snapshot<T>>,
		value: &U,
	) -> Result<(), StorageError> {
		let expected = match prior {
			Some(snapshot) => Expected::Bytes(snapshot.raw.clone()),
			None => Expected::Absent,
		};
		self.entries.push(BatchEntry {
			key: storage_key(namespace, id),
			expected,
			value: Some(to_bytes(value)?),
		});
		Ok(())
	}

	/// Requires a record to be unchanged without writing it.
	pub fn guard<T>(&mut self, prior: &Snapshot<T>) {
		self.entries.push(BatchEntry {
			key: prior.key.clone(),
			expected: Expected::Bytes(prior.raw.clone()),
			value: None,
		});
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
	serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
	serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Bounds for retrying backend faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub initial_interval: Duration,
	pub max_interval: Duration,
	/// Total time budget after which the last error is returned.
	pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			initial_interval: Duration::from_millis(50),
			max_interval: Duration::from_secs(2),
			max_elapsed: Duration::from_secs(10),
		}
	}
}

impl RetryPolicy {
	fn backoff(&self) -> backoff::ExponentialBackoff {
		ExponentialBackoffBuilder::new()
			.with_initial_interval(self.initial_interval)
			.with_max_interval(self.max_interval)
			.with_max_elapsed_time(Some(self.max_elapsed))
			.build()
	}
}

/// Only backend faults are worth retrying; everything else is a real answer.
fn classify(error: StorageError) -> backoff::Error<StorageError> {
	match error {
		StorageError::Backend(ref message) => {
			tracing::debug!(error = %message, "Storage backend fault, retrying");
			backoff::Error::transient(error)
		},
		other => backoff::Error::permanent(other),
	}
}

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level storage backend and provides
/// convenient methods for storing and retrieving typed data with
/// automatic serialization/deserialization.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
	/// Retry bounds for backend faults.
	retry: RetryPolicy,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self {
			backend,
			retry: RetryPolicy::default(),
		}
	}

	/// Replaces the retry bounds for backend faults.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}

	async fn get_raw(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let backend = &self.backend;
		backoff::future::retry(self.retry.backoff(), || async move {
			backend.get_bytes(key).await.map_err(classify)
		})
		.await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.get_raw(&storage_key(namespace, id)).await?;
		from_bytes(&bytes)
	}

	/// Retrieves a value together with its compare-and-swap token.
	pub async fn snapshot<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Snapshot<T>, StorageError> {
		let key = storage_key(namespace, id);
		let raw = self.get_raw(&key).await?;
		Ok(Snapshot {
			value: from_bytes(&raw)?,
			key,
			raw,
		})
	}

	/// Like `snapshot`, but maps a missing record to `None`.
	pub async fn try_snapshot<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<Snapshot<T>>, StorageError> {
		match self.snapshot(namespace, id).await {
			Ok(snapshot) => Ok(Some(snapshot)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Reads every record of a namespace.
	pub async fn scan<T: DeserializeOwned>(&self, namespace: &str) -> Result<Vec<T>, StorageError> {
		Ok(self
			.scan_snapshots(namespace)
			.await?
			.into_iter()
			.map(|snapshot| snapshot.value)
			.collect())
	}

	/// Reads every record of a namespace with its compare-and-swap token.
	///
	/// Records removed between the key listing and the read are skipped.
	pub async fn scan_snapshots<T: DeserializeOwned>(
		&self,
		namespace: &str,
	) -> Result<Vec<Snapshot<T>>, StorageError> {
		let prefix = storage_key(namespace, "");
		let backend = &self.backend;
		let prefix = prefix.as_str();
		let keys = backoff::future::retry(self.retry.backoff(), || async move {
			backend.keys_with_prefix(prefix).await.map_err(classify)
		})
		.await?;

		let mut snapshots = Vec::with_capacity(keys.len());
		for key in keys {
			match self.get_raw(&key).await {
				Ok(raw) => snapshots.push(Snapshot {
					value: from_bytes(&raw)?,
					key,
					raw,
				}),
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(snapshots)
	}

	/// Applies a transaction atomically.
	///
	/// A backend fault is retried within the retry policy. If the backend
	/// failed after applying the batch, the retried commit sees its own
	/// writes as a precondition conflict; that case is detected and reported
	/// as success.
	pub async fn commit(&self, transaction: Transaction) -> Result<(), StorageError> {
		if transaction.is_empty() {
			return Ok(());
		}

		let entries = transaction.entries;
		let faulted = AtomicBool::new(false);
		let result = backoff::future::retry(self.retry.backoff(), || {
			let batch = entries.clone();
			let faulted = &faulted;
			let backend = &self.backend;
			async move {
				backend.commit(batch).await.map_err(|e| {
					if matches!(e, StorageError::Backend(_)) {
						faulted.store(true, Ordering::SeqCst);
					}
					classify(e)
				})
			}
		})
		.await;

		match result {
			Err(StorageError::Conflict(key)) if faulted.load(Ordering::SeqCst) => {
				if self.already_applied(&entries).await? {
					tracing::debug!("Commit applied before backend fault was reported");
					Ok(())
				} else {
					Err(StorageError::Conflict(key))
				}
			},
			other => other,
		}
	}

	async fn already_applied(&self, entries: &[BatchEntry]) -> Result<bool, StorageError> {
		for entry in entries {
			let Some(value) = &entry.value else {
				continue;
			};
			match self.get_raw(&entry.key).await {
				Ok(current) if &current == value => {},
				Ok(_) | Err(StorageError::NotFound) => return Ok(false),
				Err(e) => return Err(e),
			}
		}
		Ok(true)
	}
}
