//! Factory registry for pluggable implementations.
//!
//! Every backend a storage crate exports is registered once, and the
//! configuration then picks among them by name.

use std::collections::HashMap;
use std::sync::OnceLock;
use storefront_config::Config;
use storefront_core::{ShopBuilder, ShopEngine, ShopFactories};
use storefront_storage::StorageFactory;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
}

impl FactoryRegistry {
	/// Create a new empty registry
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
		}
	}

	/// Register a storage implementation
	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Get the global factory registry, initializing it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();
		for (name, factory) in storefront_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}
		registry
	})
}

/// Build the shop engine using the registry and config.
///
/// Every configured storage implementation must be known to the registry,
/// even the ones that are not primary, so a typo is caught at startup.
pub fn build_shop_from_config(config: Config) -> Result<ShopEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let mut storage_factories = HashMap::new();
	for name in config.storage.implementations.keys() {
		match registry.storage.get(name) {
			Some(factory) => {
				storage_factories.insert(name.clone(), *factory);
			},
			None => {
				let mut available: Vec<_> = registry.storage.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown storage implementation '{}'. Available: [{}]",
					name,
					available.join(", ")
				)
				.into());
			},
		}
	}

	Ok(ShopBuilder::new(config).build(ShopFactories { storage_factories })?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use storefront_config::ConfigBuilder;

	#[test]
	fn test_registry_knows_builtin_backends() {
		let registry = get_registry();
		assert!(registry.storage.contains_key("memory"));
		assert!(registry.storage.contains_key("file"));
	}

	#[test]
	fn test_unknown_implementation_lists_available() {
		let config = ConfigBuilder::new()
			.storage("postgres", toml::Value::Table(toml::map::Map::new()))
			.build();
		let err = build_shop_from_config(config).err().unwrap().to_string();
		assert!(err.contains("Unknown storage implementation 'postgres'"));
		assert!(err.contains("file, memory"));
	}
}
