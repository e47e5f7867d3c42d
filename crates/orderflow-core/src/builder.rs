//! Builder for constructing an Engine with pluggable implementations.
//!
//! The builder uses the factory pattern so different implementations of
//! each seam (storage backend, messenger channel, update source) can be
//! plugged in based on configuration. Every implementation validates its
//! own TOML section through its config schema before it is wired in.

use crate::engine::{Engine, EngineError};
use orderflow_bot::{UpdateFactory, UpdateService};
use orderflow_config::Config;
use orderflow_notify::{ChannelFactory, NotificationService};
use orderflow_storage::{StorageFactory, StorageService};
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for constructing an [`Engine`].
pub struct EngineBuilder {
	config: Config,
	storage_factories: HashMap<String, StorageFactory>,
	channel_factories: HashMap<String, ChannelFactory>,
	update_factories: HashMap<String, UpdateFactory>,
}

impl EngineBuilder {
	/// Creates a new EngineBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self {
			config,
			storage_factories: HashMap::new(),
			channel_factories: HashMap::new(),
			update_factories: HashMap::new(),
		}
	}

	/// Registers a factory for a storage backend implementation.
	///
	/// The name must match the implementation name in the configuration.
	pub fn with_storage_factory(mut self, name: &str, factory: StorageFactory) -> Self {
		self.storage_factories.insert(name.to_string(), factory);
		self
	}

	/// Registers a factory for a messenger channel implementation.
	pub fn with_channel_factory(mut self, name: &str, factory: ChannelFactory) -> Self {
		self.channel_factories.insert(name.to_string(), factory);
		self
	}

	/// Registers a factory for an update source implementation.
	pub fn with_update_factory(mut self, name: &str, factory: UpdateFactory) -> Self {
		self.update_factories.insert(name.to_string(), factory);
		self
	}

	/// Builds the Engine using the configured factories.
	///
	/// Creates each service from its primary implementation, validates the
	/// implementation's configuration section against its schema, and wires
	/// everything into a ready-to-run engine.
	pub fn build(self) -> Result<Engine, EngineError> {
		let token = self.config.telegram.bot_token.clone();

		// Storage backend
		let storage_name = self.config.storage.primary.clone();
		let storage_config = self
			.config
			.storage
			.implementations
			.get(&storage_name)
			.cloned()
			.ok_or_else(|| {
				EngineError::Config(format!("No configuration for storage '{}'", storage_name))
			})?;
		let storage_factory = self.storage_factories.get(&storage_name).ok_or_else(|| {
			EngineError::Config(format!("Storage factory '{}' not registered", storage_name))
		})?;
		let storage_backend = storage_factory(&storage_config).map_err(|e| {
			EngineError::Config(format!("Failed to create storage '{}': {}", storage_name, e))
		})?;
		storage_backend
			.config_schema()
			.validate(&storage_config)
			.map_err(|e| {
				EngineError::Config(format!(
					"Invalid configuration for storage '{}': {}",
					storage_name, e
				))
			})?;
		let storage = Arc::new(StorageService::new(storage_backend));
		tracing::info!(component = "storage", implementation = %storage_name, "Loaded");

		// Messenger channel
		let channel_name = self.config.channel.primary.clone();
		let channel_config = self
			.config
			.channel
			.implementations
			.get(&channel_name)
			.cloned()
			.ok_or_else(|| {
				EngineError::Config(format!("No configuration for channel '{}'", channel_name))
			})?;
		let channel_factory = self.channel_factories.get(&channel_name).ok_or_else(|| {
			EngineError::Config(format!("Channel factory '{}' not registered", channel_name))
		})?;
		let channel = channel_factory(&channel_config, &token).map_err(|e| {
			EngineError::Config(format!("Failed to create channel '{}': {}", channel_name, e))
		})?;
		channel
			.config_schema()
			.validate(&channel_config)
			.map_err(|e| {
				EngineError::Config(format!(
					"Invalid configuration for channel '{}': {}",
					channel_name, e
				))
			})?;
		let notifier = Arc::new(NotificationService::new(
			channel,
			storage.clone(),
			self.config.telegram.admin_chat_id,
			self.config.telegram.courier_chat_id,
		));
		tracing::info!(component = "channel", implementation = %channel_name, "Loaded");

		// Update source
		let updates_name = self.config.updates.primary.clone();
		let updates_config = self
			.config
			.updates
			.implementations
			.get(&updates_name)
			.cloned()
			.ok_or_else(|| {
				EngineError::Config(format!(
					"No configuration for update source '{}'",
					updates_name
				))
			})?;
		let update_factory = self.update_factories.get(&updates_name).ok_or_else(|| {
			EngineError::Config(format!(
				"Update source factory '{}' not registered",
				updates_name
			))
		})?;
		let source = update_factory(&updates_config, &token).map_err(|e| {
			EngineError::Config(format!(
				"Failed to create update source '{}': {}",
				updates_name, e
			))
		})?;
		source
			.config_schema()
			.validate(&updates_config)
			.map_err(|e| {
				EngineError::Config(format!(
					"Invalid configuration for update source '{}': {}",
					updates_name, e
				))
			})?;
		let updates = UpdateService::new(vec![source]);
		tracing::info!(component = "updates", implementation = %updates_name, "Loaded");

		Ok(Engine::new(self.config, storage, notifier, updates))
	}
}
