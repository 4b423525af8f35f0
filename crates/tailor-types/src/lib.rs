//! Common types module for the tailor order fulfillment system.
//!
//! This module defines the records, enums and request shapes shared by the
//! storage gateway, the workflow core and the HTTP service. Keeping them in
//! one crate lets every layer agree on the persisted JSON layout.

/// API error types for HTTP endpoints.
pub mod api;
/// Bid (take-order) records and statuses.
pub mod bid;
/// Error classification shared by all workflow components.
pub mod error;
/// Authenticated identities and roles.
pub mod identity;
/// Order records, statuses and request shapes.
pub mod order;
/// Pagination request and result types.
pub mod page;
/// Progress ledger records and enums.
pub mod progress;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Storage keys for the persisted collections.
pub mod storage;
/// Utility functions for timestamps and display formatting.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use bid::*;
pub use error::ErrorKind;
pub use identity::*;
pub use order::*;
pub use page::*;
pub use progress::*;
pub use registry::ImplementationRegistry;
pub use storage::*;
pub use utils::{current_timestamp, truncate_id};
pub use validation::*;
