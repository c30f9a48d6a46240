//! File-based storage backend.
//!
//! Each key is stored as its own file under a base directory. Writes go to a
//! temporary file that is renamed into place, and every mutation holds an
//! exclusive `fs2` lock on `<base>/.lock`, which makes compare-and-swap
//! atomic across tasks and across processes sharing the directory.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use storefront_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use tokio::fs;

const FILE_EXTENSION: &str = "bin";
const LOCK_FILE: &str = ".lock";

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
}

impl FileStorage {
	/// Creates a new FileStorage instance rooted at `base_path`.
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Converts a storage key to a filesystem-safe file path.
	///
	/// `orders:12` is stored as `orders_12.bin`.
	fn get_file_path(&self, key: &str) -> PathBuf {
		file_path(&self.base_path, key)
	}

	/// Runs a blocking mutation while holding the directory lock.
	async fn locked<F, T>(&self, op: F) -> Result<T, StorageError>
	where
		F: FnOnce(&Path) -> Result<T, StorageError> + Send + 'static,
		T: Send + 'static,
	{
		let base_path = self.base_path.clone();
		tokio::task::spawn_blocking(move || {
			std::fs::create_dir_all(&base_path).map_err(backend)?;
			let lock = OpenOptions::new()
				.create(true)
				.truncate(false)
				.write(true)
				.open(base_path.join(LOCK_FILE))
				.map_err(backend)?;
			lock.lock_exclusive().map_err(backend)?;
			let result = op(&base_path);
			if let Err(e) = FileExt::unlock(&lock) {
				tracing::warn!("Failed to release storage lock: {}", e);
			}
			result
		})
		.await
		.map_err(|e| StorageError::Backend(e.to_string()))?
	}
}

fn backend(e: std::io::Error) -> StorageError {
	StorageError::Backend(e.to_string())
}

fn file_path(base_path: &Path, key: &str) -> PathBuf {
	let safe_key = key.replace(['/', ':'], "_");
	base_path.join(format!("{}.{}", safe_key, FILE_EXTENSION))
}

/// Reads a file, mapping a missing file to `None`.
fn read_existing(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
	match std::fs::read(path) {
		Ok(data) => Ok(Some(data)),
		Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
		Err(e) => Err(backend(e)),
	}
}

/// Writes via a temp file and rename so readers never see a partial value.
fn write_atomic(path: &Path, value: &[u8]) -> Result<(), StorageError> {
	let temp_path = path.with_extension("tmp");
	std::fs::write(&temp_path, value).map_err(backend)?;
	// Flush before the rename so a crash cannot leave an empty file behind.
	File::open(&temp_path)
		.and_then(|f| f.sync_all())
		.map_err(backend)?;
	std::fs::rename(&temp_path, path).map_err(backend)
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);

		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(backend(e)),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let key = key.to_string();
		self.locked(move |base| write_atomic(&file_path(base, &key), &value))
			.await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let key = key.to_string();
		self.locked(move |base| match std::fs::remove_file(file_path(base, &key)) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(backend(e)),
		})
		.await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		fs::try_exists(self.get_file_path(key))
			.await
			.map_err(backend)
	}

	async fn keys(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		let prefix = format!("{}_", namespace.replace(['/', ':'], "_"));
		let suffix = format!(".{}", FILE_EXTENSION);

		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(backend(e)),
		};

		let mut ids = Vec::new();
		while let Some(entry) = entries.next_entry().await.map_err(backend)? {
			let file_name = entry.file_name();
			let Some(name) = file_name.to_str() else {
				tracing::debug!("Skipping non UTF-8 file name {:?}", file_name);
				continue;
			};
			if let Some(id) = name
				.strip_prefix(&prefix)
				.and_then(|rest| rest.strip_suffix(&suffix))
			{
				ids.push(id.to_string());
			}
		}
		Ok(ids)
	}

	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<&[u8]>,
		value: Vec<u8>,
	) -> Result<(), StorageError> {
		let key = key.to_string();
		let expected = expected.map(<[u8]>::to_vec);
		self.locked(move |base| {
			let path = file_path(base, &key);
			if read_existing(&path)? != expected {
				return Err(StorageError::Conflict);
			}
			write_atomic(&path, &value)
		})
		.await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(&["storage_path"]).validate(config)
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
		.unwrap_or("./data/storage");

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
