//! Storage module for the boost storefront.
//!
//! This module provides abstractions for persistent storage of storefront
//! data, supporting different backend implementations such as in-memory or
//! file-based storage. The store is the only shared mutable resource in the
//! system, so the interface exposes a compare-and-swap primitive that lets
//! callers serialize per-record read-modify-write sequences without locks.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Maximum compare-and-swap retries before a read-modify-write gives up.
const MAX_CAS_RETRIES: usize = 8;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs when inserting a record that already exists.
	#[error("Already exists")]
	AlreadyExists,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// This trait must be implemented by any storage backend that wants to
/// integrate with the storefront. It provides basic key-value operations
/// plus per-namespace listing and an atomic compare-and-swap.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes unconditionally.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Atomically replaces the value for `key` only if the current value
	/// equals `expected`. `None` means "key must be absent", which makes
	/// this double as insert-if-absent.
	///
	/// Returns `Ok(false)` when the current value does not match; the
	/// caller re-reads and retries.
	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<&[u8]>,
		value: Vec<u8>,
	) -> Result<bool, StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Lists all keys under the given namespace.
	async fn list_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError>;
}

/// Type alias for storage factory functions.
///
/// This is the function signature that all storage implementations must
/// provide to create instances of their storage interface.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level storage backend and provides
/// convenient methods for storing and retrieving typed data with automatic
/// JSON serialization, plus conditional read-modify-write built on the
/// backend's compare-and-swap.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	fn encode<T: Serialize>(data: &T) -> Result<Vec<u8>, StorageError> {
		serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
		serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Stores a serializable value, creating or overwriting.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.backend
			.set_bytes(&Self::key(namespace, id), Self::encode(data)?)
			.await
	}

	/// Inserts a serializable value, failing if the key already exists.
	pub async fn insert<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let swapped = self
			.backend
			.compare_and_swap(&Self::key(namespace, id), None, Self::encode(data)?)
			.await?;
		if swapped {
			Ok(())
		} else {
			Err(StorageError::AlreadyExists)
		}
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		Self::decode(&bytes)
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	/// Retrieves every record in a namespace.
	///
	/// Records deleted between listing and retrieval are skipped rather
	/// than surfaced as errors.
	pub async fn list<T: DeserializeOwned>(
		&self,
		namespace: &str,
	) -> Result<Vec<T>, StorageError> {
		let mut out = Vec::new();
		for key in self.backend.list_keys(namespace).await? {
			match self.backend.get_bytes(&key).await {
				Ok(bytes) => out.push(Self::decode(&bytes)?),
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(out)
	}

	/// Conditionally mutates a record as one atomic read-modify-write.
	///
	/// `updater` receives the current value; returning `None` leaves the
	/// record untouched and yields `Ok(None)`. Returning `Some(next)`
	/// commits `next` only if the record was not concurrently changed,
	/// retrying the whole sequence on a lost race.
	pub async fn modify_if<T, F>(
		&self,
		namespace: &str,
		id: &str,
		updater: F,
	) -> Result<Option<T>, StorageError>
	where
		T: Serialize + DeserializeOwned,
		F: Fn(&T) -> Option<T>,
	{
		let key = Self::key(namespace, id);
		for _ in 0..MAX_CAS_RETRIES {
			let current_bytes = self.backend.get_bytes(&key).await?;
			let current: T = Self::decode(&current_bytes)?;
			let next = match updater(&current) {
				Some(next) => next,
				None => return Ok(None),
			};
			let swapped = self
				.backend
				.compare_and_swap(&key, Some(&current_bytes), Self::encode(&next)?)
				.await?;
			if swapped {
				return Ok(Some(next));
			}
			// Lost the race; re-read and try again.
		}
		Err(StorageError::Backend(format!(
			"compare-and-swap contention on {}",
			key
		)))
	}

	/// Unconditionally mutates a record as one atomic read-modify-write.
	pub async fn modify<T, F>(&self, namespace: &str, id: &str, updater: F) -> Result<T, StorageError>
	where
		T: Serialize + DeserializeOwned + Clone,
		F: Fn(&mut T),
	{
		let updated = self
			.modify_if(namespace, id, |current: &T| {
				let mut next = current.clone();
				updater(&mut next);
				Some(next)
			})
			.await?;
		// modify_if only returns None when the updater declines, which the
		// closure above never does.
		updated.ok_or_else(|| StorageError::Backend("unconditional modify yielded none".into()))
	}
}
