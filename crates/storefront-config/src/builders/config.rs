//! Configuration builder for creating test and development configurations.

use crate::{ApiConfig, Config, ShopConfig, StorageConfig};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to in-memory storage and no API server.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	shop_id: String,
	order_number_prefix: String,
	max_update_retries: u32,
	storage_primary: String,
	storage_config: toml::Value,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` with default values suitable for testing.
	pub fn new() -> Self {
		Self {
			shop_id: "test-shop".to_string(),
			order_number_prefix: "ORD".to_string(),
			max_update_retries: 3,
			storage_primary: "memory".to_string(),
			storage_config: toml::Value::Table(toml::map::Map::new()),
			api: None,
		}
	}

	/// Sets the shop ID.
	pub fn shop_id(mut self, id: impl Into<String>) -> Self {
		self.shop_id = id.into();
		self
	}

	/// Sets the order number prefix.
	pub fn order_number_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.order_number_prefix = prefix.into();
		self
	}

	/// Sets the compare-and-swap retry budget for status updates.
	pub fn max_update_retries(mut self, retries: u32) -> Self {
		self.max_update_retries = retries;
		self
	}

	/// Sets the primary storage implementation and its settings.
	pub fn storage(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.storage_primary = primary.into();
		self.storage_config = config;
		self
	}

	/// Sets the API configuration.
	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	/// Builds the `Config` with the configured values.
	pub fn build(self) -> Config {
		let mut implementations = HashMap::new();
		implementations.insert(self.storage_primary.clone(), self.storage_config);

		Config {
			shop: ShopConfig {
				id: self.shop_id,
				order_number_prefix: self.order_number_prefix,
				max_update_retries: self.max_update_retries,
			},
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations,
			},
			api: self.api,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = ConfigBuilder::new().build();
		assert_eq!(config.shop.id, "test-shop");
		assert_eq!(config.storage.primary, "memory");
		assert!(config.storage.implementations.contains_key("memory"));
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_overrides() {
		let config = ConfigBuilder::new()
			.shop_id("admin")
			.order_number_prefix("WEB")
			.max_update_retries(5)
			.build();
		assert_eq!(config.shop.id, "admin");
		assert_eq!(config.shop.order_number_prefix, "WEB");
		assert_eq!(config.shop.max_update_retries, 5);
	}
}
