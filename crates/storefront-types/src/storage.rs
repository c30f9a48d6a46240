//! Storage-related types for the storefront.

/// Storage namespaces for the different data collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Order records, keyed by order id.
	Orders,
	/// Monotonic counters used to allocate ids.
	Sequences,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::Sequences => "sequences",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Orders, Self::Sequences].into_iter()
	}
}
