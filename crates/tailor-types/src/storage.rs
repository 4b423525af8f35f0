//! Storage-related types for the workflow.

use std::str::FromStr;

/// Storage keys for the persisted collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Key for storing order records
	Orders,
	/// Key for storing bid records
	Bids,
	/// Key for the (order, factory) -> latest bid id index
	BidIndex,
	/// Key for storing progress entries
	Progress,
	/// Key for the per-order progress sequence counter
	ProgressSequence,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::Bids => "bids",
			StorageKey::BidIndex => "bid_index",
			StorageKey::Progress => "progress",
			StorageKey::ProgressSequence => "progress_sequence",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::Bids,
			Self::BidIndex,
			Self::Progress,
			Self::ProgressSequence,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|key| key.as_str() == s).ok_or(())
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}

/// Builds the id of the bid index record for an (order, factory) pair.
pub fn bid_index_id(order_id: &str, factory_id: &str) -> String {
	format!("{}:{}", order_id, factory_id)
}
