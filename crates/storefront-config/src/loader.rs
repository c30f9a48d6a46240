//! Loader for configurations split across several files.
//!
//! The entry file may name other files with `include`. Every top-level
//! section must come from exactly one file, so merging never has to decide
//! which definition wins.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Configuration loader that handles multi-file configurations with includes.
pub struct ConfigLoader {
	/// Base path for resolving relative includes
	base_path: PathBuf,
	/// Files already read, to catch circular includes
	loaded_files: HashSet<PathBuf>,
	/// Section name to the file that defined it, for error reporting
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	/// Creates a new ConfigLoader with the given base path.
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			loaded_files: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads a configuration file and all its includes, then validates the
	/// merged result.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let config_path = self.resolve_path(config_path)?;
		let main_content = self.load_file(&config_path).await?;
		let mut main_toml: toml::Value = toml::from_str(&main_content)?;

		let includes = Self::take_includes(&mut main_toml)?;
		if includes.is_empty() {
			return main_content.parse();
		}

		self.record_sections(&main_toml, &config_path)?;
		for include_path in includes {
			let resolved_path = self.resolve_path(&include_path)?;
			let include_content = self.load_file(&resolved_path).await?;
			let include_toml: toml::Value = toml::from_str(&include_content)?;
			self.record_sections(&include_toml, &resolved_path)?;

			if let (Some(main_table), Some(include_table)) =
				(main_toml.as_table_mut(), include_toml.as_table())
			{
				for (key, value) in include_table {
					main_table.insert(key.clone(), value.clone());
				}
			}
		}

		let combined = toml::to_string(&main_toml).map_err(|e| {
			ConfigError::Parse(format!("Failed to serialize combined config: {}", e))
		})?;
		combined.parse()
	}

	/// Reads a file and resolves environment variables in it.
	async fn load_file(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical_path = path.canonicalize().map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.loaded_files.insert(canonical_path.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical_path.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		resolve_env_vars(&content)
	}

	/// Removes the `include` key and returns the paths it listed.
	fn take_includes(toml: &mut toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
		let Some(include) = toml.as_table_mut().and_then(|t| t.remove("include")) else {
			return Ok(Vec::new());
		};

		match include {
			toml::Value::String(path) => Ok(vec![PathBuf::from(path)]),
			toml::Value::Array(items) => items
				.into_iter()
				.map(|item| match item {
					toml::Value::String(path) => Ok(PathBuf::from(path)),
					_ => Err(ConfigError::Validation(
						"Include array must contain only strings".into(),
					)),
				})
				.collect(),
			_ => Err(ConfigError::Validation(
				"Include must be a string or array of strings".into(),
			)),
		}
	}

	/// Records which file each top-level section came from, rejecting
	/// a section defined twice.
	fn record_sections(&mut self, toml: &toml::Value, source: &Path) -> Result<(), ConfigError> {
		let Some(table) = toml.as_table() else {
			return Ok(());
		};

		for key in table.keys() {
			if let Some(existing) = self.section_sources.get(key) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}. \
					Each top-level section must be unique across all configuration files.",
					key,
					existing.display(),
					source.display()
				)));
			}
			self.section_sources.insert(key.clone(), source.to_path_buf());
		}

		Ok(())
	}

	/// Resolves a path relative to the base path.
	fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();

		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}

		Ok(resolved)
	}
}
