//! Schema checks for backend-specific TOML configuration.
//!
//! Pluggable backends receive their settings as raw `toml::Value` tables.
//! A backend lists the keys it understands in a [`Schema`] and the builder
//! runs it before constructing the backend, so a typo in `storage_path` is
//! reported at startup instead of silently ignored.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A key holds a value of the wrong TOML type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	/// A key the schema does not know about.
	#[error("Unknown field: {0}")]
	UnknownField(String),
}

/// Optional string settings of a backend configuration table.
///
/// Keys not listed are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Schema {
	string_fields: &'static [&'static str],
}

impl Schema {
	/// Creates a schema accepting the given optional string keys.
	pub const fn new(string_fields: &'static [&'static str]) -> Self {
		Self { string_fields }
	}

	/// Validates a TOML table against this schema.
	///
	/// # Errors
	///
	/// Returns the first mistyped or unknown key.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for (key, value) in table {
			if !self.string_fields.contains(&key.as_str()) {
				return Err(ValidationError::UnknownField(key.clone()));
			}
			if !value.is_str() {
				return Err(ValidationError::TypeMismatch {
					field: key.clone(),
					expected: "string".to_string(),
					actual: value.type_str().to_string(),
				});
			}
		}

		Ok(())
	}
}

/// A configuration schema that can validate TOML values.
///
/// Implemented by each backend so the builder can check its settings
/// without knowing the concrete type.
pub trait ConfigSchema: Send + Sync {
	/// Validates a TOML configuration value against this schema.
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}
