//! State management for orders, bids and progress entries.
//!
//! Each component owns one entity type and every mutation it performs is a
//! single atomic storage commit guarded by compare-and-swap preconditions on
//! the rows it read. Cross-entity rules (one accepted bid per order, progress
//! only from the assigned factory) are enforced inside those commits.

pub mod bid;
pub mod order;
pub mod progress;

pub use bid::{BidAcceptance, BidError, BidLedger};
pub use order::{OrderStore, OrderStoreError};
pub use progress::{ProgressError, ProgressLedger};

use tailor_storage::StorageError;
use tailor_types::ErrorKind;

/// Classifies a storage failure that reached the workflow layer.
pub(crate) fn storage_error_kind(error: &StorageError) -> ErrorKind {
	match error {
		StorageError::NotFound => ErrorKind::NotFound,
		StorageError::Conflict(_) => ErrorKind::Conflict,
		StorageError::Serialization(_)
		| StorageError::Backend(_)
		| StorageError::Configuration(_) => ErrorKind::Infrastructure,
	}
}

/// Newest first, ties broken by id so listings are stable.
pub(crate) fn newest_first(a: (u64, &str), b: (u64, &str)) -> std::cmp::Ordering {
	b.0.cmp(&a.0).then_with(|| b.1.cmp(a.1))
}
