//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each pluggable backend module provides a `Registry` struct implementing
/// this trait, declaring the name it is configured under and its factory.
pub trait ImplementationRegistry {
	/// Name used in configuration files, e.g. `"memory"` for
	/// `[storage.implementations.memory]`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
