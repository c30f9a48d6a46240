//! Builder pattern for constructing shop engines.
//!
//! The storage backend is chosen by name from the configuration and created
//! through a factory, so backends can be added without touching the engine.

use crate::engine::ShopEngine;
use std::collections::HashMap;
use std::sync::Arc;
use storefront_config::Config;
use storefront_storage::{StorageError, StorageInterface, StorageService};
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions available to the builder, keyed by implementation name.
pub struct ShopFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

/// Builder for constructing a ShopEngine with a pluggable storage backend.
pub struct ShopBuilder {
	config: Config,
}

impl ShopBuilder {
	/// Creates a new ShopBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the ShopEngine using the factory registered for the primary
	/// storage implementation.
	pub fn build<SF>(self, factories: ShopFactories<SF>) -> Result<ShopEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let primary = &self.config.storage.primary;
		let settings = self
			.config
			.storage
			.implementations
			.get(primary)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary storage '{}' has no configuration",
					primary
				))
			})?;
		let factory = factories.storage_factories.get(primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!("storage implementation '{}'", primary))
		})?;

		let backend = factory(settings).map_err(|e| {
			tracing::error!(
				component = "storage",
				implementation = %primary,
				error = %e,
				"Failed to create storage implementation"
			);
			BuilderError::Config(format!(
				"Failed to create storage implementation '{}': {}",
				primary, e
			))
		})?;
		backend.config_schema().validate(settings).map_err(|e| {
			BuilderError::Config(format!("Invalid configuration for storage '{}': {}", primary, e))
		})?;
		tracing::info!(component = "storage", implementation = %primary, "Loaded");

		let storage = Arc::new(StorageService::new(backend));
		Ok(ShopEngine::new(self.config, storage))
	}
}
