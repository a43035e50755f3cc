//! File-based storage backend implementation.
//!
//! Stores each record as a JSON file under `<base>/<namespace>/<id>.json`,
//! providing simple persistence without external dependencies. Writes go
//! through a temp-file rename; compare-and-swap sequences are serialized by
//! a process-wide mutex, which is sufficient for the single-process model.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
	/// Serializes compare-and-swap sequences.
	cas_lock: Mutex<()>,
}

impl FileStorage {
	/// Creates a new FileStorage instance rooted at the given path.
	pub fn new(base_path: PathBuf) -> Self {
		Self {
			base_path,
			cas_lock: Mutex::new(()),
		}
	}

	/// Converts a `namespace:id` key to a filesystem path.
	///
	/// The id is sanitized so provider-assigned identifiers cannot escape
	/// the namespace directory.
	fn file_path(&self, key: &str) -> PathBuf {
		let (namespace, id) = key.split_once(':').unwrap_or(("", key));
		let safe_id = id.replace(['/', ':', '\\'], "_");
		self.base_path
			.join(namespace)
			.join(format!("{}.json", safe_id))
	}

	async fn read_current(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
		match fs::read(self.file_path(key)).await {
			Ok(data) => Ok(Some(data)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn write_atomic(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
		let path = self.file_path(key);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		// Write to a temp file then rename so readers never see a torn file.
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.read_current(key).await?.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let _guard = self.cas_lock.lock().await;
		self.write_atomic(key, &value).await
	}

	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<&[u8]>,
		value: Vec<u8>,
	) -> Result<bool, StorageError> {
		let _guard = self.cas_lock.lock().await;
		let current = self.read_current(key).await?;
		let matches = match (&current, expected) {
			(Some(current), Some(expected)) => current.as_slice() == expected,
			(None, None) => true,
			_ => false,
		};
		if matches {
			self.write_atomic(key, &value).await?;
		}
		Ok(matches)
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let _guard = self.cas_lock.lock().await;
		match fs::remove_file(self.file_path(key)).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.file_path(key).exists())
	}

	async fn list_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		let dir = self.base_path.join(namespace);
		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let mut keys = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() == Some(std::ffi::OsStr::new("json")) {
				if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
					keys.push(format!("{}:{}", namespace, stem));
				}
			}
		}
		keys.sort();
		Ok(keys)
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

	#[tokio::test]
	async fn test_round_trip_and_list() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path().to_path_buf());

		storage
			.set_bytes("orders:101", b"{\"a\":1}".to_vec())
			.await
			.unwrap();
		storage
			.set_bytes("orders:102", b"{\"a\":2}".to_vec())
			.await
			.unwrap();

		assert_eq!(
			storage.get_bytes("orders:101").await.unwrap(),
			b"{\"a\":1}".to_vec()
		);
		assert_eq!(
			storage.list_keys("orders").await.unwrap(),
			vec!["orders:101".to_string(), "orders:102".to_string()]
		);
		assert!(storage.list_keys("users").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_compare_and_swap_detects_conflict() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path().to_path_buf());

		assert!(storage
			.compare_and_swap("users:7", None, b"v1".to_vec())
			.await
			.unwrap());
		assert!(!storage
			.compare_and_swap("users:7", Some(b"other"), b"v2".to_vec())
			.await
			.unwrap());
		assert!(storage
			.compare_and_swap("users:7", Some(b"v1"), b"v2".to_vec())
			.await
			.unwrap());
		assert_eq!(storage.get_bytes("users:7").await.unwrap(), b"v2".to_vec());
	}

	#[tokio::test]
	async fn test_delete_is_idempotent() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path().to_path_buf());

		storage.set_bytes("users:9", b"x".to_vec()).await.unwrap();
		storage.delete("users:9").await.unwrap();
		storage.delete("users:9").await.unwrap();
		assert!(!storage.exists("users:9").await.unwrap());
	}
}
