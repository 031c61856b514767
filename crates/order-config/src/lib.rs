//! Configuration module for the order lifecycle service.
//!
//! Configuration is read from a TOML file. `${VAR}` and `${VAR:-default}`
//! references are substituted from the environment before parsing, and the
//! parsed configuration is validated before it is handed out.

#[cfg(any(test, feature = "testing"))]
pub mod builders {
	pub mod config;
}

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Machine id used when the configuration does not set one.
pub const DEFAULT_MACHINE_ID: &str = "orderStateMachine";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// State machine identity.
	#[serde(default)]
	pub machine: MachineConfig,
	/// Configuration for the storage backend holding order records.
	pub storage: StorageConfig,
	/// Dispatcher behaviour.
	#[serde(default)]
	pub dispatcher: DispatcherConfig,
}

/// State machine identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MachineConfig {
	/// Identifier stamped on every machine instance and its log records.
	#[serde(default = "default_machine_id")]
	pub id: String,
}

impl Default for MachineConfig {
	fn default() -> Self {
		Self {
			id: default_machine_id(),
		}
	}
}

fn default_machine_id() -> String {
	DEFAULT_MACHINE_ID.to_string()
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Dispatcher behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatcherConfig {
	/// Deadline the host applies around a single dispatch.
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
	/// Capacity of the lifecycle event bus.
	#[serde(default = "default_event_bus_capacity")]
	pub event_bus_capacity: usize,
}

impl Default for DispatcherConfig {
	fn default() -> Self {
		Self {
			timeout_seconds: default_timeout_seconds(),
			event_bus_capacity: default_event_bus_capacity(),
		}
	}
}

fn default_timeout_seconds() -> u64 {
	30
}

fn default_event_bus_capacity() -> usize {
	1024
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	// Limit input size to prevent ReDoS attacks
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads and validates configuration from a file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		content.parse()
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.machine.id.trim().is_empty() {
			return Err(ConfigError::Validation("Machine id cannot be empty".into()));
		}

		// Validate storage config
		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		// Validate dispatcher config
		if self.dispatcher.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"Dispatcher timeout_seconds must be greater than 0".into(),
			));
		}
		if self.dispatcher.timeout_seconds > 3600 {
			return Err(ConfigError::Validation(
				"Dispatcher timeout_seconds cannot exceed 3600 (1 hour)".into(),
			));
		}
		if self.dispatcher.event_bus_capacity == 0 || self.dispatcher.event_bus_capacity > 65536 {
			return Err(ConfigError::Validation(
				"Dispatcher event_bus_capacity must be between 1 and 65536".into(),
			));
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("ORDER_TEST_DIR", "/var/lib/orders");
		std::env::set_var("ORDER_TEST_SUFFIX", "v1");

		let input = "path = \"${ORDER_TEST_DIR}/${ORDER_TEST_SUFFIX}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "path = \"/var/lib/orders/v1\"");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${ORDER_TEST_UNSET_VAR:-fallback}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${ORDER_TEST_MISSING_VAR}\"";
		assert!(matches!(
			resolve_env_vars(input),
			Err(ConfigError::Validation(msg)) if msg.contains("ORDER_TEST_MISSING_VAR")
		));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.machine.id, DEFAULT_MACHINE_ID);
		assert_eq!(config.dispatcher.timeout_seconds, 30);
		assert_eq!(config.dispatcher.event_bus_capacity, 1024);
		assert_eq!(config.storage.primary, "memory");
	}

	#[test]
	fn test_full_config_with_env_vars() {
		std::env::set_var("ORDER_TEST_STORAGE_PATH", "/tmp/orders");
		let config_str = r#"
[machine]
id = "checkout"

[storage]
primary = "file"
[storage.implementations.memory]
[storage.implementations.file]
storage_path = "${ORDER_TEST_STORAGE_PATH}"

[dispatcher]
timeout_seconds = 5
event_bus_capacity = 16
"#;
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.machine.id, "checkout");
		assert_eq!(config.dispatcher.timeout_seconds, 5);
		assert_eq!(config.dispatcher.event_bus_capacity, 16);
		assert_eq!(
			config.storage.implementations["file"]
				.get("storage_path")
				.and_then(|v| v.as_str()),
			Some("/tmp/orders")
		);
	}

	#[test]
	fn test_primary_storage_must_exist() {
		let config_str = r#"
[storage]
primary = "file"
[storage.implementations.memory]
"#;
		let result: Result<Config, _> = config_str.parse();
		assert!(matches!(
			result,
			Err(ConfigError::Validation(msg)) if msg.contains("Primary storage 'file'")
		));
	}

	#[test]
	fn test_dispatcher_bounds() {
		let zero_timeout = format!("{}\n[dispatcher]\ntimeout_seconds = 0\n", MINIMAL);
		assert!(matches!(
			zero_timeout.parse::<Config>(),
			Err(ConfigError::Validation(_))
		));

		let huge_bus = format!("{}\n[dispatcher]\nevent_bus_capacity = 100000\n", MINIMAL);
		assert!(matches!(
			huge_bus.parse::<Config>(),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_empty_machine_id_rejected() {
		let config_str = format!("[machine]\nid = \"  \"\n{}", MINIMAL);
		assert!(matches!(
			config_str.parse::<Config>(),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_parse_error_message() {
		let result: Result<Config, _> = "[storage\nprimary = 1".parse();
		assert!(matches!(result, Err(ConfigError::Parse(_))));
	}

	#[tokio::test]
	async fn test_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, MINIMAL).unwrap();

		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.storage.primary, "memory");

		let missing = Config::from_file(dir.path().join("nope.toml")).await;
		assert!(matches!(missing, Err(ConfigError::Io(_))));
	}
}
