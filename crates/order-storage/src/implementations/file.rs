//! File-based storage backend.
//!
//! Each key is stored as one JSON file under a base directory. Writes go to
//! a uniquely named temporary file which is then renamed over the target, so
//! a reader never observes a half-written record.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use order_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

/// Default directory used when `storage_path` is not configured.
pub const DEFAULT_STORAGE_PATH: &str = "./data/orders";

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
	/// Suffix counter for temporary files.
	write_seq: AtomicU64,
}

impl FileStorage {
	/// Creates a new FileStorage rooted at `base_path`.
	pub fn new(base_path: PathBuf) -> Self {
		Self {
			base_path,
			write_seq: AtomicU64::new(0),
		}
	}

	/// Converts a storage key to a filesystem-safe file path.
	fn get_file_path(&self, key: &str) -> PathBuf {
		self.base_path.join(format!("{}.json", encode_key(key)))
	}
}

/// Escapes every byte outside `[A-Za-z0-9-]` as `_XX` (upper-case hex).
///
/// `_` is escaped too, so distinct keys always map to distinct file names.
fn encode_key(key: &str) -> String {
	let mut encoded = String::with_capacity(key.len());
	for byte in key.bytes() {
		if byte.is_ascii_alphanumeric() || byte == b'-' {
			encoded.push(byte as char);
		} else {
			encoded.push_str(&format!("_{:02X}", byte));
		}
	}
	encoded
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);

		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		fs::create_dir_all(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
		let temp_path = path.with_extension(format!("{}.{}.tmp", std::process::id(), seq));
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		if let Err(e) = fs::rename(&temp_path, &path).await {
			if let Err(cleanup) = fs::remove_file(&temp_path).await {
				tracing::warn!("Failed to remove temporary file {:?}: {}", temp_path, cleanup);
			}
			return Err(StorageError::Backend(e.to_string()));
		}

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		fs::try_exists(self.get_file_path(key))
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("storage_path", FieldType::String).with_validator(|v| {
					match v.as_str() {
						Some(s) if s.trim().is_empty() => Err("path cannot be empty".into()),
						_ => Ok(()),
					}
				}),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for order files (default: "./data/orders")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	tracing::debug!(path = %storage_path, "Using file storage");
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
