//! In-memory storage backend.
//!
//! Useful for tests and development where persistence across restarts is
//! not required.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use storefront_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage implementation.
///
/// Compare-and-swap holds the write lock across the comparison and the
/// write, so it is atomic with respect to every other operation.
pub struct MemoryStorage {
	/// The in-memory store protected by a read-write lock.
	store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
	/// Creates a new MemoryStorage instance.
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store.get(key).cloned().ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store.contains_key(key))
	}

	async fn keys(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		let prefix = format!("{}:", namespace);
		let store = self.store.read().await;
		Ok(store
			.keys()
			.filter_map(|key| key.strip_prefix(&prefix))
			.map(str::to_string)
			.collect())
	}

	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<&[u8]>,
		value: Vec<u8>,
	) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		let matches = match (store.get(key), expected) {
			(Some(current), Some(expected)) => current.as_slice() == expected,
			(None, None) => true,
			_ => false,
		};
		if !matches {
			return Err(StorageError::Conflict);
		}
		store.insert(key.to_string(), value);
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
		// No settings.
		Schema::default().validate(config)
	}
}

/// Factory function to create a memory storage backend from configuration.
pub fn create_storage(_config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	Ok(Box::new(MemoryStorage::new()))
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::new();

		let key = "orders:1";
		let value = b"test_value".to_vec();
		storage.set_bytes(key, value.clone()).await.unwrap();

		let retrieved = storage.get_bytes(key).await.unwrap();
		assert_eq!(retrieved, value);
		assert!(storage.exists(key).await.unwrap());

		storage.delete(key).await.unwrap();
		assert!(!storage.exists(key).await.unwrap());

		let result = storage.get_bytes(key).await;
		assert!(matches!(result, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_compare_and_swap() {
		let storage = MemoryStorage::new();
		let key = "orders:1";

		storage
			.compare_and_swap(key, None, b"v1".to_vec())
			.await
			.unwrap();
		assert!(matches!(
			storage.compare_and_swap(key, None, b"v2".to_vec()).await,
			Err(StorageError::Conflict)
		));
		assert!(matches!(
			storage
				.compare_and_swap(key, Some(&b"v0"[..]), b"v2".to_vec())
				.await,
			Err(StorageError::Conflict)
		));
		assert_eq!(storage.get_bytes(key).await.unwrap(), b"v1".to_vec());

		storage
			.compare_and_swap(key, Some(&b"v1"[..]), b"v2".to_vec())
			.await
			.unwrap();
		assert_eq!(storage.get_bytes(key).await.unwrap(), b"v2".to_vec());

		// Expecting a value on a missing key is a conflict, not a create.
		assert!(matches!(
			storage
				.compare_and_swap("orders:2", Some(&b"v1"[..]), b"v2".to_vec())
				.await,
			Err(StorageError::Conflict)
		));
	}

	#[tokio::test]
	async fn test_concurrent_swaps_have_one_winner() {
		let storage = Arc::new(MemoryStorage::new());
		storage.set_bytes("orders:1", b"pending".to_vec()).await.unwrap();

		let mut handles = Vec::new();
		for i in 0..8u8 {
			let storage = Arc::clone(&storage);
			handles.push(tokio::spawn(async move {
				storage
					.compare_and_swap("orders:1", Some(&b"pending"[..]), vec![i])
					.await
					.is_ok()
			}));
		}

		let mut winners = 0;
		for handle in handles {
			if handle.await.unwrap() {
				winners += 1;
			}
		}
		assert_eq!(winners, 1);
	}

	#[tokio::test]
	async fn test_keys_by_namespace() {
		let storage = MemoryStorage::new();
		storage.set_bytes("orders:1", vec![1]).await.unwrap();
		storage.set_bytes("orders:2", vec![2]).await.unwrap();
		storage.set_bytes("sequences:orders", vec![3]).await.unwrap();

		let mut keys = storage.keys("orders").await.unwrap();
		keys.sort();
		assert_eq!(keys, vec!["1".to_string(), "2".to_string()]);
	}

	#[test]
	fn test_schema_rejects_settings() {
		let config: toml::Value = toml::from_str("storage_path = \"/tmp\"").unwrap();
		assert!(MemoryStorageSchema.validate(&config).is_err());
		let empty = toml::Value::Table(toml::map::Map::new());
		assert!(MemoryStorageSchema.validate(&empty).is_ok());
	}
}
