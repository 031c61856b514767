//! Configuration builder for tests and local development.

use crate::{Config, DispatcherConfig, MachineConfig, StorageConfig, DEFAULT_MACHINE_ID};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to in-memory storage so tests never touch the filesystem unless
/// they ask for it.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	machine_id: String,
	storage_primary: String,
	storage_implementations: HashMap<String, toml::Value>,
	timeout_seconds: u64,
	event_bus_capacity: usize,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` with default values suitable for testing.
	pub fn new() -> Self {
		let mut storage_implementations = HashMap::new();
		storage_implementations.insert(
			"memory".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);

		Self {
			machine_id: DEFAULT_MACHINE_ID.to_string(),
			storage_primary: "memory".to_string(),
			storage_implementations,
			timeout_seconds: 5,
			event_bus_capacity: 64,
		}
	}

	/// Sets the machine id.
	pub fn machine_id(mut self, id: impl Into<String>) -> Self {
		self.machine_id = id.into();
		self
	}

	/// Uses file storage rooted at `path` as the primary backend.
	pub fn file_storage(mut self, path: impl Into<String>) -> Self {
		let mut table = toml::map::Map::new();
		table.insert("storage_path".to_string(), toml::Value::String(path.into()));
		self.storage_implementations
			.insert("file".to_string(), toml::Value::Table(table));
		self.storage_primary = "file".to_string();
		self
	}

	/// Sets the dispatch timeout in seconds.
	pub fn timeout_seconds(mut self, timeout: u64) -> Self {
		self.timeout_seconds = timeout;
		self
	}

	/// Sets the event bus capacity.
	pub fn event_bus_capacity(mut self, capacity: usize) -> Self {
		self.event_bus_capacity = capacity;
		self
	}

	/// Builds the `Config`. No validation is performed.
	pub fn build(self) -> Config {
		Config {
			machine: MachineConfig {
				id: self.machine_id,
			},
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations: self.storage_implementations,
			},
			dispatcher: DispatcherConfig {
				timeout_seconds: self.timeout_seconds,
				event_bus_capacity: self.event_bus_capacity,
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builder_defaults() {
		let config = ConfigBuilder::new().build();
		assert_eq!(config.machine.id, DEFAULT_MACHINE_ID);
		assert_eq!(config.storage.primary, "memory");
		assert!(config.storage.implementations.contains_key("memory"));
	}

	#[test]
	fn test_builder_file_storage() {
		let config = ConfigBuilder::new()
			.machine_id("checkout")
			.file_storage("/tmp/orders")
			.build();
		assert_eq!(config.machine.id, "checkout");
		assert_eq!(config.storage.primary, "file");
		assert_eq!(
			config.storage.implementations["file"]
				.get("storage_path")
				.and_then(|v| v.as_str()),
			Some("/tmp/orders")
		);
	}
}
