//! File-based storage backend for the ordering backend.
//!
//! Records are stored as one JSON file per key, grouped into a directory
//! per collection. Writes go to a temporary file first and are renamed into
//! place, so a crash mid-write can never leave a truncated record behind.
//! This is a crash-safety property only; concurrent writers still serialize
//! through the collection locks of the storage service.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use orderflow_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use std::path::PathBuf;
use tokio::fs;

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
}

impl FileStorage {
	/// Creates a new FileStorage instance with the specified base path.
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Converts a storage key to a filesystem path.
	///
	/// Keys have the form `collection:id`; the collection becomes a
	/// directory and the id a sanitized file stem, keeping the mapping
	/// reversible for `list_keys`.
	fn file_path(&self, key: &str) -> PathBuf {
		let (collection, id) = key.split_once(':').unwrap_or(("misc", key));
		let safe_id = id.replace(['/', ':', '\\'], "_");
		self.base_path
			.join(collection)
			.join(format!("{}.json", safe_id))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_path(key);
		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.file_path(key);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		// Write atomically by writing to temp file then renaming
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.file_path(key);
		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.file_path(key).exists())
	}

	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let collection = prefix.trim_end_matches(':');
		let dir = self.base_path.join(collection);
		if !dir.exists() {
			return Ok(Vec::new());
		}

		let mut keys = Vec::new();
		let mut entries = fs::read_dir(&dir)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new("json")) {
				continue;
			}
			if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
				keys.push(format!("{}:{}", collection, stem));
			}
		}
		Ok(keys)
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
			vec![], // No required fields
			vec![Field::new("storage_path", FieldType::String)],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/storage")
		.to_string();

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn storage() -> (tempfile::TempDir, FileStorage) {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path().to_path_buf());
		(dir, storage)
	}

	#[tokio::test]
	async fn round_trips_bytes() {
		let (_dir, storage) = storage();
		storage
			.set_bytes("orders:0001", b"{\"id\":\"0001\"}".to_vec())
			.await
			.unwrap();
		let data = storage.get_bytes("orders:0001").await.unwrap();
		assert_eq!(data, b"{\"id\":\"0001\"}");
	}

	#[tokio::test]
	async fn missing_key_is_not_found() {
		let (_dir, storage) = storage();
		assert!(matches!(
			storage.get_bytes("orders:none").await,
			Err(StorageError::NotFound)
		));
		assert!(!storage.exists("orders:none").await.unwrap());
	}

	#[tokio::test]
	async fn overwrite_replaces_previous_value() {
		let (_dir, storage) = storage();
		storage
			.set_bytes("ledgers:+998", b"old".to_vec())
			.await
			.unwrap();
		storage
			.set_bytes("ledgers:+998", b"new".to_vec())
			.await
			.unwrap();
		assert_eq!(storage.get_bytes("ledgers:+998").await.unwrap(), b"new");
	}

	#[tokio::test]
	async fn no_temp_files_remain_after_write() {
		let (dir, storage) = storage();
		storage
			.set_bytes("orders:0001", b"data".to_vec())
			.await
			.unwrap();
		let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("orders"))
			.unwrap()
			.filter_map(|e| e.ok())
			.filter(|e| e.path().extension() == Some(std::ffi::OsStr::new("tmp")))
			.collect();
		assert!(leftovers.is_empty());
	}

	#[tokio::test]
	async fn list_keys_is_scoped_to_the_collection() {
		let (_dir, storage) = storage();
		storage.set_bytes("orders:0001", b"a".to_vec()).await.unwrap();
		storage.set_bytes("orders:0002", b"b".to_vec()).await.unwrap();
		storage.set_bytes("users:+998", b"c".to_vec()).await.unwrap();

		let mut keys = storage.list_keys("orders:").await.unwrap();
		keys.sort();
		assert_eq!(keys, vec!["orders:0001", "orders:0002"]);
	}

	#[tokio::test]
	async fn delete_is_idempotent() {
		let (_dir, storage) = storage();
		storage.set_bytes("otp:+998", b"x".to_vec()).await.unwrap();
		storage.delete("otp:+998").await.unwrap();
		storage.delete("otp:+998").await.unwrap();
		assert!(!storage.exists("otp:+998").await.unwrap());
	}
}
