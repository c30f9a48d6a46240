//! Storage module for the storefront order system.
//!
//! This module provides abstractions for persistent storage of orders,
//! supporting different backend implementations such as in-memory or
//! file-based storage. Backends expose a compare-and-swap primitive so that
//! status changes can be conditioned on the value the caller last read.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use storefront_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// A compare-and-swap found a different value than expected.
	#[error("Conflict: stored value changed")]
	Conflict,
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

/// Trait defining the low-level interface for storage backends.
///
/// Keys are `namespace:id` strings built by [`StorageService`].
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, overwriting any existing value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Lists the ids stored under a namespace.
	async fn keys(&self, namespace: &str) -> Result<Vec<String>, StorageError>;

	/// Atomically replaces the value at `key` if it currently equals
	/// `expected`. `None` means the key must not exist yet.
	///
	/// Returns [`StorageError::Conflict`] without writing when the stored
	/// value does not match.
	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<&[u8]>,
		value: Vec<u8>,
	) -> Result<(), StorageError>;

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

/// A deserialized value together with the exact bytes it was read from.
///
/// Pass [`Versioned::raw`] back to [`StorageService::compare_and_swap`] to
/// make a write conditional on nothing having changed since the read.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
	pub value: T,
	raw: Vec<u8>,
}

impl<T> Versioned<T> {
	/// The stored bytes this value was decoded from.
	pub fn raw(&self) -> &[u8] {
		&self.raw
	}
}

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level storage backend and provides
/// convenient methods for storing and retrieving typed data with
/// automatic JSON serialization.
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

	/// Stores a serializable value, creating or overwriting it.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes = encode(data)?;
		self.backend.set_bytes(&Self::key(namespace, id), bytes).await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		Ok(self.retrieve_versioned(namespace, id).await?.value)
	}

	/// Retrieves a value along with the raw bytes it was stored as.
	pub async fn retrieve_versioned<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Versioned<T>, StorageError> {
		let raw = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		let value =
			serde_json::from_slice(&raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
		Ok(Versioned { value, raw })
	}

	/// Retrieves every value stored under a namespace as `(id, value)` pairs.
	///
	/// Entries removed between listing and reading are skipped.
	pub async fn retrieve_all<T: DeserializeOwned>(
		&self,
		namespace: &str,
	) -> Result<Vec<(String, T)>, StorageError> {
		let ids = self.backend.keys(namespace).await?;
		let mut values = Vec::with_capacity(ids.len());
		for id in ids {
			match self.retrieve(namespace, &id).await {
				Ok(value) => values.push((id, value)),
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(values)
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Writes `data` only if the stored bytes still equal `expected`
	/// (`None`: only if nothing is stored yet).
	pub async fn compare_and_swap<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		expected: Option<&[u8]>,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes = encode(data)?;
		self.backend
			.compare_and_swap(&Self::key(namespace, id), expected, bytes)
			.await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}
}

fn encode<T: Serialize>(data: &T) -> Result<Vec<u8>, StorageError> {
	serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))
}
