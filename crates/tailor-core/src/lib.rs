//! Core workflow for the tailor order fulfillment system.
//!
//! This crate holds the business rules of the marketplace: the order state
//! machine, the bid ledger with its single-acceptance protocol, the progress
//! ledger for accepted orders, and the capability checks that every mutation
//! passes through. All state lives behind `tailor_storage::StorageService`,
//! and every mutation is one atomic commit guarded by compare-and-swap
//! preconditions on the rows it read.

pub mod auth;
pub mod builder;
pub mod engine;
pub mod state;
pub mod utils;

pub use auth::{authorize, AccessDenied, Action};
pub use builder::{BuilderError, WorkflowBuilder, WorkflowFactories};
pub use engine::WorkflowEngine;
pub use state::{
	BidAcceptance, BidError, BidLedger, OrderStore, OrderStoreError, ProgressError, ProgressLedger,
};
