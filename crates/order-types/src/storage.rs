//! Storage-related types for the order lifecycle system.

/// Storage keys for different data collections.
///
/// Used as the namespace half of every storage key so that callers never
/// spell collection names as string literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Order records, keyed by order id
	Orders,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
		}
	}
}
