//! Builder for assembling a dispatcher from configuration.
//!
//! Storage backends are created through factory functions keyed by
//! implementation name, so the binary decides which backends exist and the
//! configuration decides which one is primary.

use crate::event_bus::EventBus;
use crate::persistence::{PersistenceAdapter, StorageStatusStore};
use crate::state::{ActionRegistry, ActionRegistryBuilder, RegistryError, TransitionTable};
use crate::Dispatcher;
use order_config::Config;
use order_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during dispatcher construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error(transparent)]
	Registry(#[from] RegistryError),
}

/// Builder for constructing a [`Dispatcher`] with pluggable storage.
pub struct DispatcherBuilder {
	config: Config,
	actions: ActionRegistryBuilder,
}

impl DispatcherBuilder {
	/// Creates a builder using the default logging actions.
	pub fn new(config: Config) -> Self {
		Self {
			config,
			actions: ActionRegistry::logging_builder(),
		}
	}

	/// Replaces the action bindings. Every action of the order lifecycle must
	/// be bound or [`build`](Self::build) fails.
	pub fn with_actions(mut self, actions: ActionRegistryBuilder) -> Self {
		self.actions = actions;
		self
	}

	/// Creates the primary storage backend named by the configuration.
	///
	/// The returned service is shared with the dispatcher built from it, so
	/// order records written through it are visible to dispatches.
	pub fn build_storage<SF>(
		&self,
		storage_factories: &HashMap<String, SF>,
	) -> Result<Arc<StorageService>, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let primary = &self.config.storage.primary;
		let storage_config = self
			.config
			.storage
			.implementations
			.get(primary)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary storage '{}' not found in implementations",
					primary
				))
			})?;
		let factory = storage_factories.get(primary).ok_or_else(|| {
			BuilderError::Config(format!("Unknown storage implementation '{}'", primary))
		})?;

		match factory(storage_config) {
			Ok(backend) => {
				tracing::info!(component = "storage", implementation = %primary, "Loaded");
				Ok(Arc::new(StorageService::new(backend)))
			},
			Err(e) => {
				tracing::error!(
					component = "storage",
					implementation = %primary,
					error = %e,
					"Failed to create storage implementation"
				);
				Err(BuilderError::Config(format!(
					"Failed to create storage implementation '{}': {}",
					primary, e
				)))
			},
		}
	}

	/// Builds the dispatcher over `storage`.
	pub fn build(self, storage: Arc<StorageService>) -> Result<Dispatcher, BuilderError> {
		let table = TransitionTable::order_lifecycle();
		let actions = self.actions.build(table).map_err(|e| {
			tracing::error!(error = %e, "Incomplete action registry");
			e
		})?;

		let persistence = PersistenceAdapter::new(Arc::new(StorageStatusStore::new(storage)));

		Ok(Dispatcher::new(
			self.config.machine.id.clone(),
			Arc::new(table.clone()),
			Arc::new(actions),
			persistence,
			EventBus::new(self.config.dispatcher.event_bus_capacity),
		))
	}
}
