//! File-based storage backend for the tailor service.
//!
//! Each record is a JSON file at `<base>/<namespace>/<id>.json`, with both
//! path segments percent-encoded. Commits are serialized across processes by
//! an advisory lock on `<base>/.lock` and made atomic by a write-ahead journal
//! at `<base>/.journal`: the journal is durably written before any record is
//! touched, and a journal left behind by a crash is replayed before the next
//! read or commit.

use super::memory::precondition_holds;
use crate::{BatchEntry, StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tailor_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};

const LOCK_FILE: &str = ".lock";
const JOURNAL_FILE: &str = ".journal";
const RECORD_EXTENSION: &str = "json";

fn backend(e: impl std::fmt::Display) -> StorageError {
	StorageError::Backend(e.to_string())
}

/// A write recorded in the journal before it is applied.
#[derive(Debug, Serialize, Deserialize)]
struct JournalWrite {
	key: String,
	value: Vec<u8>,
}

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
}

impl FileStorage {
	/// Opens (creating if needed) a store rooted at `base_path`.
	///
	/// Any journal left by an interrupted commit is replayed before returning.
	pub fn new(base_path: PathBuf) -> Result<Self, StorageError> {
		fs::create_dir_all(&base_path).map_err(backend)?;
		{
			let lock = open_lock(&base_path)?;
			lock.lock_exclusive().map_err(backend)?;
			replay_journal(&base_path)?;
		}
		Ok(Self { base_path })
	}

	/// Runs a blocking filesystem job against this store.
	async fn run<T, F>(&self, job: F) -> Result<T, StorageError>
	where
		F: FnOnce(&Path) -> Result<T, StorageError> + Send + 'static,
		T: Send + 'static,
	{
		let base = self.base_path.clone();
		tokio::task::spawn_blocking(move || job(&base))
			.await
			.map_err(backend)?
	}
}

/// Percent-encodes everything outside `[A-Za-z0-9_-]`.
fn encode_segment(segment: &str) -> String {
	let mut encoded = String::with_capacity(segment.len());
	for byte in segment.bytes() {
		if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
			encoded.push(byte as char);
		} else {
			encoded.push_str(&format!("%{:02X}", byte));
		}
	}
	encoded
}

fn decode_segment(segment: &str) -> Option<String> {
	let bytes = segment.as_bytes();
	let mut decoded = Vec::with_capacity(bytes.len());
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'%' {
			let hex = segment.get(i + 1..i + 3)?;
			decoded.push(u8::from_str_radix(hex, 16).ok()?);
			i += 3;
		} else {
			decoded.push(bytes[i]);
			i += 1;
		}
	}
	String::from_utf8(decoded).ok()
}

fn record_path(base: &Path, key: &str) -> PathBuf {
	let (namespace, id) = key.split_once(':').unwrap_or(("", key));
	base.join(encode_segment(namespace))
		.join(format!("{}.{}", encode_segment(id), RECORD_EXTENSION))
}

fn open_lock(base: &Path) -> Result<File, StorageError> {
	OpenOptions::new()
		.create(true)
		.truncate(false)
		.read(true)
		.write(true)
		.open(base.join(LOCK_FILE))
		.map_err(backend)
}

fn read_record(base: &Path, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
	match fs::read(record_path(base, key)) {
		Ok(data) => Ok(Some(data)),
		Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
		Err(e) => Err(backend(e)),
	}
}

/// Writes via a synced temp file and rename so a record is never torn.
fn write_durably(path: &Path, data: &[u8]) -> Result<(), StorageError> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).map_err(backend)?;
	}
	let temp_path = path.with_extension("tmp");
	let mut file = File::create(&temp_path).map_err(backend)?;
	file.write_all(data).map_err(backend)?;
	file.sync_all().map_err(backend)?;
	fs::rename(&temp_path, path).map_err(backend)
}

fn apply_writes(base: &Path, writes: &[JournalWrite]) -> Result<(), StorageError> {
	for write in writes {
		write_durably(&record_path(base, &write.key), &write.value)?;
	}
	Ok(())
}

/// Re-applies an interrupted commit. Caller must hold the exclusive lock.
fn replay_journal(base: &Path) -> Result<(), StorageError> {
	let journal_path = base.join(JOURNAL_FILE);
	let data = match fs::read(&journal_path) {
		Ok(data) => data,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
		Err(e) => return Err(backend(e)),
	};

	let writes: Vec<JournalWrite> = serde_json::from_slice(&data)
		.map_err(|e| StorageError::Backend(format!("Corrupt journal: {}", e)))?;
	tracing::warn!(writes = writes.len(), "Replaying interrupted storage commit");
	apply_writes(base, &writes)?;
	fs::remove_file(&journal_path).map_err(backend)
}

/// Takes a shared lock for reading, upgrading to replay a pending journal.
fn lock_for_read(base: &Path) -> Result<File, StorageError> {
	let lock = open_lock(base)?;
	lock.lock_shared().map_err(backend)?;
	if base.join(JOURNAL_FILE).exists() {
		drop(lock);
		let lock = open_lock(base)?;
		lock.lock_exclusive().map_err(backend)?;
		replay_journal(base)?;
		return Ok(lock);
	}
	Ok(lock)
}

fn list_keys(base: &Path, prefix: &str) -> Result<Vec<String>, StorageError> {
	let mut keys = Vec::new();
	for dir in fs::read_dir(base).map_err(backend)? {
		let dir = dir.map_err(backend)?;
		if !dir.file_type().map_err(backend)?.is_dir() {
			continue;
		}
		let Some(namespace) = dir.file_name().to_str().and_then(decode_segment) else {
			continue;
		};
		for file in fs::read_dir(dir.path()).map_err(backend)? {
			let path = file.map_err(backend)?.path();
			if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
				continue;
			}
			let Some(id) = path
				.file_stem()
				.and_then(|s| s.to_str())
				.and_then(decode_segment)
			else {
				continue;
			};
			let key = format!("{}:{}", namespace, id);
			if key.starts_with(prefix) {
				keys.push(key);
			}
		}
	}
	keys.sort();
	Ok(keys)
}

fn commit_batch(base: &Path, batch: Vec<BatchEntry>) -> Result<(), StorageError> {
	let lock = open_lock(base)?;
	lock.lock_exclusive().map_err(backend)?;
	replay_journal(base)?;

	for entry in &batch {
		let current = read_record(base, &entry.key)?;
		if !precondition_holds(current.as_ref(), &entry.expected) {
			return Err(StorageError::Conflict(entry.key.clone()));
		}
	}

	let writes: Vec<JournalWrite> = batch
		.into_iter()
		.filter_map(|entry| {
			entry.value.map(|value| JournalWrite {
				key: entry.key,
				value,
			})
		})
		.collect();
	if writes.is_empty() {
		return Ok(());
	}

	let journal = serde_json::to_vec(&writes).map_err(|e| StorageError::Serialization(e.to_string()))?;
	let journal_path = base.join(JOURNAL_FILE);
	write_durably(&journal_path, &journal)?;
	apply_writes(base, &writes)?;
	fs::remove_file(&journal_path).map_err(backend)
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let key = key.to_string();
		self.run(move |base| {
			let _lock = lock_for_read(base)?;
			read_record(base, &key)?.ok_or(StorageError::NotFound)
		})
		.await
	}

	async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let prefix = prefix.to_string();
		self.run(move |base| {
			let _lock = lock_for_read(base)?;
			list_keys(base, &prefix)
		})
		.await
	}

	async fn commit(&self, batch: Vec<BatchEntry>) -> Result<(), StorageError> {
		self.run(move |base| commit_batch(base, batch)).await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("storage_path", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(path) if !path.trim().is_empty() => Ok(()),
						_ => Err("storage_path must not be empty".to_string()),
					}
				}),
			],
		);
		schema.validate(config)
	}
}

/// Registry for the file storage implementation.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/storage")
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		|config: &toml::Value| -> Result<Box<dyn StorageInterface>, StorageError> {
			FileStorageSchema
				.validate(config)
				.map_err(|e| StorageError::Configuration(e.to_string()))?;

			let storage_path = config
				.get("storage_path")
				.and_then(|v| v.as_str())
				.unwrap_or("./data/storage");

			Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))?))
		}
	}
}

impl StorageRegistry for Registry {}
