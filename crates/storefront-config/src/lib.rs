//! Configuration module for the storefront order service.
//!
//! This module provides structures and utilities for managing service
//! configuration. It supports loading configuration from TOML files and
//! validates that required values are set and consistent.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

/// Builders for constructing configurations in code.
pub mod builders {
	pub mod config;
}

pub use builders::config::ConfigBuilder;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

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
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the storefront service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Settings for this service instance and its order workflow.
	pub shop: ShopConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShopConfig {
	/// Identifier for this instance, used in logs.
	pub id: String,
	/// Prefix of generated order numbers (`<prefix>-000001`).
	#[serde(default = "default_order_number_prefix")]
	pub order_number_prefix: String,
	/// How many times a status update re-reads and retries after losing a
	/// compare-and-swap race to an unrelated write.
	#[serde(default = "default_max_update_retries")]
	pub max_update_retries: u32,
}

fn default_order_number_prefix() -> String {
	"ORD".to_string()
}

fn default_max_update_retries() -> u32 {
	3
}

/// Upper bound for `max_update_retries`.
const MAX_UPDATE_RETRIES_LIMIT: u32 = 16;

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// CORS configuration. Permissive when absent.
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	/// Allowed origins for CORS.
	pub allowed_origins: Vec<String>,
}

/// Returns the default API host.
fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

/// Returns the default API port.
fn default_api_port() -> u16 {
	3000
}

/// Returns the default API timeout in seconds.
fn default_api_timeout() -> u64 {
	30
}

/// Returns the default maximum request size in bytes.
fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
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
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}

	result.push_str(&input[last_end..]);
	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// - Ensures the instance id is not empty
	/// - Checks the order number prefix is a short alphanumeric tag
	/// - Bounds the status update retry count
	/// - Validates the primary storage backend is configured
	/// - Checks API bind settings when the API is enabled
	fn validate(&self) -> Result<(), ConfigError> {
		if self.shop.id.is_empty() {
			return Err(ConfigError::Validation("Shop ID cannot be empty".into()));
		}

		let prefix = &self.shop.order_number_prefix;
		if prefix.is_empty()
			|| prefix.len() > 8
			|| !prefix.chars().all(|c| c.is_ascii_alphanumeric())
		{
			return Err(ConfigError::Validation(format!(
				"Order number prefix '{}' must be 1-8 ASCII letters or digits",
				prefix
			)));
		}

		if self.shop.max_update_retries == 0
			|| self.shop.max_update_retries > MAX_UPDATE_RETRIES_LIMIT
		{
			return Err(ConfigError::Validation(format!(
				"max_update_retries must be between 1 and {}",
				MAX_UPDATE_RETRIES_LIMIT
			)));
		}

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

		if let Some(api) = self.api.as_ref().filter(|api| api.enabled) {
			if api.port == 0 {
				return Err(ConfigError::Validation("API port cannot be 0".into()));
			}
			if api.timeout_seconds == 0 {
				return Err(ConfigError::Validation(
					"API timeout_seconds must be greater than 0".into(),
				));
			}
			if api.max_request_size == 0 {
				return Err(ConfigError::Validation(
					"API max_request_size must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
