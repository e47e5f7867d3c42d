//! Storage module for the ordering backend.
//!
//! This module provides the record store abstraction over named collections
//! (orders, messenger links, profiles, coin ledgers, OTP challenges) with
//! pluggable backends. The typed [`StorageService`] adds JSON serialization
//! and coarse per-collection mutual exclusion so that read-modify-write
//! sequences never interleave.

use async_trait::async_trait;
use orderflow_types::{Collection, ConfigSchema};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;

use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// A requested record is not found.
	#[error("Not found")]
	NotFound,
	/// A record with the same id already exists.
	#[error("Duplicate id")]
	Duplicate,
	/// Serialization or deserialization failed.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The storage backend failed.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Configuration validation failed.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// This trait must be implemented by any storage backend that wants to
/// integrate with the ordering backend. It provides basic key-value
/// operations plus prefix enumeration for collection scans.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes under the given key.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Lists all keys starting with the given prefix.
	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level storage backend and provides
/// convenient methods for storing and retrieving typed records with
/// automatic JSON serialization. One async mutex per collection serializes
/// every access to that collection; this is deliberately coarse but
/// prevents lost updates under concurrent handlers.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
	/// Per-collection exclusive locks.
	locks: HashMap<Collection, Mutex<()>>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		let locks = Collection::all().map(|c| (c, Mutex::new(()))).collect();
		Self { backend, locks }
	}

	fn key(collection: Collection, id: &str) -> String {
		format!("{}:{}", collection.as_str(), id)
	}

	fn lock(&self, collection: Collection) -> &Mutex<()> {
		// The map is populated for every variant in new().
		&self.locks[&collection]
	}

	async fn read_value<T: DeserializeOwned>(
		&self,
		collection: Collection,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(collection, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	async fn write_value<T: Serialize>(
		&self,
		collection: Collection,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&Self::key(collection, id), bytes).await
	}

	/// Retrieves and deserializes a record.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		collection: Collection,
		id: &str,
	) -> Result<T, StorageError> {
		let _guard = self.lock(collection).lock().await;
		self.read_value(collection, id).await
	}

	/// Stores a record, creating or overwriting it.
	pub async fn store<T: Serialize>(
		&self,
		collection: Collection,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let _guard = self.lock(collection).lock().await;
		self.write_value(collection, id, data).await
	}

	/// Stores a new record, failing with [`StorageError::Duplicate`] if the
	/// id is already taken.
	pub async fn create<T: Serialize>(
		&self,
		collection: Collection,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let _guard = self.lock(collection).lock().await;
		if self.backend.exists(&Self::key(collection, id)).await? {
			return Err(StorageError::Duplicate);
		}
		self.write_value(collection, id, data).await
	}

	/// Updates an existing record.
	///
	/// Returns [`StorageError::NotFound`] if the record does not exist,
	/// making it semantically different from store() which will create.
	pub async fn update<T: Serialize>(
		&self,
		collection: Collection,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let _guard = self.lock(collection).lock().await;
		if !self.backend.exists(&Self::key(collection, id)).await? {
			return Err(StorageError::NotFound);
		}
		self.write_value(collection, id, data).await
	}

	/// Removes a record. Missing records are not an error.
	pub async fn remove(&self, collection: Collection, id: &str) -> Result<(), StorageError> {
		let _guard = self.lock(collection).lock().await;
		self.backend.delete(&Self::key(collection, id)).await
	}

	/// Checks if a record exists.
	pub async fn exists(&self, collection: Collection, id: &str) -> Result<bool, StorageError> {
		let _guard = self.lock(collection).lock().await;
		self.backend.exists(&Self::key(collection, id)).await
	}

	/// Retrieves every record of a collection.
	pub async fn list<T: DeserializeOwned>(
		&self,
		collection: Collection,
	) -> Result<Vec<T>, StorageError> {
		let _guard = self.lock(collection).lock().await;
		let prefix = format!("{}:", collection.as_str());
		let keys = self.backend.list_keys(&prefix).await?;
		let mut records = Vec::with_capacity(keys.len());
		for key in keys {
			let bytes = self.backend.get_bytes(&key).await?;
			let record = serde_json::from_slice(&bytes)
				.map_err(|e| StorageError::Serialization(e.to_string()))?;
			records.push(record);
		}
		Ok(records)
	}

	/// Applies a closure to an existing record and persists the result.
	///
	/// The read, the closure and the write all run under the collection
	/// lock, so check-then-modify sequences are atomic with respect to
	/// other service calls. The closure's return value is passed through.
	pub async fn mutate<T, R, F>(
		&self,
		collection: Collection,
		id: &str,
		updater: F,
	) -> Result<R, StorageError>
	where
		T: Serialize + DeserializeOwned,
		F: FnOnce(&mut T) -> R,
	{
		let _guard = self.lock(collection).lock().await;
		let mut value: T = self.read_value(collection, id).await?;
		let result = updater(&mut value);
		self.write_value(collection, id, &value).await?;
		Ok(result)
	}

	/// Like [`StorageService::mutate`], but starts from `T::default()` when
	/// the record does not exist yet.
	pub async fn mutate_or_default<T, R, F>(
		&self,
		collection: Collection,
		id: &str,
		updater: F,
	) -> Result<R, StorageError>
	where
		T: Serialize + DeserializeOwned + Default,
		F: FnOnce(&mut T) -> R,
	{
		let _guard = self.lock(collection).lock().await;
		let mut value: T = match self.read_value(collection, id).await {
			Ok(value) => value,
			Err(StorageError::NotFound) => T::default(),
			Err(e) => return Err(e),
		};
		let result = updater(&mut value);
		self.write_value(collection, id, &value).await?;
		Ok(result)
	}

	/// Bumps and returns a named monotonic sequence counter.
	pub async fn next_sequence(&self, name: &str) -> Result<u64, StorageError> {
		self.mutate_or_default::<u64, u64, _>(Collection::Counters, name, |counter| {
			*counter += 1;
			*counter
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
	struct Record {
		value: u32,
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn create_rejects_duplicates() {
		let storage = service();
		let record = Record { value: 1 };
		storage
			.create(Collection::Orders, "0001", &record)
			.await
			.unwrap();
		let result = storage.create(Collection::Orders, "0001", &record).await;
		assert!(matches!(result, Err(StorageError::Duplicate)));
	}

	#[tokio::test]
	async fn update_requires_existing_record() {
		let storage = service();
		let result = storage
			.update(Collection::Orders, "missing", &Record { value: 1 })
			.await;
		assert!(matches!(result, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn mutate_passes_through_closure_result() {
		let storage = service();
		storage
			.store(Collection::Ledgers, "+1", &Record { value: 5 })
			.await
			.unwrap();
		let doubled = storage
			.mutate::<Record, _, _>(Collection::Ledgers, "+1", |r| {
				r.value *= 2;
				r.value
			})
			.await
			.unwrap();
		assert_eq!(doubled, 10);
		let stored: Record = storage.retrieve(Collection::Ledgers, "+1").await.unwrap();
		assert_eq!(stored.value, 10);
	}

	#[tokio::test]
	async fn sequence_counter_is_monotonic() {
		let storage = service();
		assert_eq!(storage.next_sequence("orders").await.unwrap(), 1);
		assert_eq!(storage.next_sequence("orders").await.unwrap(), 2);
		assert_eq!(storage.next_sequence("other").await.unwrap(), 1);
		assert_eq!(storage.next_sequence("orders").await.unwrap(), 3);
	}

	#[tokio::test]
	async fn list_returns_all_records_of_a_collection() {
		let storage = service();
		for (id, value) in [("a", 1), ("b", 2), ("c", 3)] {
			storage
				.store(Collection::Profiles, id, &Record { value })
				.await
				.unwrap();
		}
		storage
			.store(Collection::Orders, "x", &Record { value: 9 })
			.await
			.unwrap();

		let mut values: Vec<u32> = storage
			.list::<Record>(Collection::Profiles)
			.await
			.unwrap()
			.into_iter()
			.map(|r| r.value)
			.collect();
		values.sort_unstable();
		assert_eq!(values, vec![1, 2, 3]);
	}
}
