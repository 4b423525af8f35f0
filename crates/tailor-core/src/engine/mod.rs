//! Workflow engine that ties the order, bid and progress components together.
//!
//! The engine owns no behavior of its own. It holds the configuration and one
//! shared storage service, and hands out the three state components built on
//! top of it so the HTTP layer and tests reach the same instances.

use crate::state::{BidLedger, OrderStore, ProgressLedger};
use std::sync::Arc;
use tailor_config::Config;
use tailor_storage::StorageService;

/// Entry point to the fulfillment workflow.
#[derive(Clone)]
pub struct WorkflowEngine {
	/// Service configuration.
	pub(crate) config: Config,
	/// Storage gateway shared by every component.
	pub(crate) storage: Arc<StorageService>,
	pub(crate) orders: Arc<OrderStore>,
	pub(crate) bids: Arc<BidLedger>,
	pub(crate) progress: Arc<ProgressLedger>,
}

impl WorkflowEngine {
	/// Creates the components over an already constructed storage service.
	pub fn new(config: Config, storage: Arc<StorageService>) -> Self {
		let workflow = config.workflow.clone();
		Self {
			orders: Arc::new(OrderStore::new(storage.clone(), workflow.clone())),
			bids: Arc::new(BidLedger::new(storage.clone(), workflow.clone())),
			progress: Arc::new(ProgressLedger::new(storage.clone(), workflow)),
			config,
			storage,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	pub fn orders(&self) -> &Arc<OrderStore> {
		&self.orders
	}

	pub fn bids(&self) -> &Arc<BidLedger> {
		&self.bids
	}

	pub fn progress(&self) -> &Arc<ProgressLedger> {
		&self.progress
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::state::{BidError, OrderStoreError, ProgressError};
	use tailor_config::builders::ConfigBuilder;
	use tailor_storage::implementations::memory::MemoryStorage;
	use tailor_types::{
		BidStatus, ErrorKind, Identity, NewOrder, NewProgressEntry, OrderStatus, PageRequest,
		ProgressStage, ProgressStatus, ProgressUpdate, SUPERSEDED_REASON,
	};

	fn engine() -> WorkflowEngine {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		WorkflowEngine::new(ConfigBuilder::new().build(), storage)
	}

	fn shirts(publish: bool) -> NewOrder {
		NewOrder {
			title: "Oxford shirts".to_string(),
			description: "White, button-down collar".to_string(),
			quantity: 300,
			publish,
			..NewOrder::default()
		}
	}

	fn progress(order_id: &str, factory_id: &str, stage: ProgressStage) -> NewProgressEntry {
		NewProgressEntry {
			order_id: order_id.to_string(),
			factory_id: factory_id.to_string(),
			stage,
			status: ProgressStatus::InProgress,
			description: String::new(),
			percentage: None,
			started_at: None,
			completed_at: None,
			images: vec![],
		}
	}

	#[tokio::test]
	async fn test_full_fulfillment_flow() {
		let engine = engine();
		let designer = Identity::designer("d-1");
		let f1 = Identity::factory("f-1");
		let f2 = Identity::factory("f-2");

		let order = engine
			.orders()
			.create_order(&designer, shirts(true))
			.await
			.unwrap();
		let b1 = engine
			.bids()
			.submit_bid(&f1, &order.id, "f-1", None)
			.await
			.unwrap();
		let b2 = engine
			.bids()
			.submit_bid(&f2, &order.id, "f-2", None)
			.await
			.unwrap();

		let acceptance = engine.bids().accept_bid(&b2.id, &designer).await.unwrap();
		assert_eq!(acceptance.order.assigned_factory.as_deref(), Some("f-2"));
		let b1 = engine.bids().get_bid(&b1.id).await.unwrap();
		assert_eq!(b1.status, BidStatus::Rejected);
		assert_eq!(b1.rejection_reason.as_deref(), Some(SUPERSEDED_REASON));

		let err = engine
			.progress()
			.create_entry(&f1, progress(&order.id, "f-1", ProgressStage::Production))
			.await
			.unwrap_err();
		assert!(matches!(err, ProgressError::NotAssignedFactory { .. }));

		engine
			.orders()
			.transition(&order.id, &f2, OrderStatus::InProgress)
			.await
			.unwrap();
		for stage in [ProgressStage::Material, ProgressStage::Production] {
			engine
				.progress()
				.create_entry(&f2, progress(&order.id, "f-2", stage))
				.await
				.unwrap();
		}
		let order = engine
			.orders()
			.transition(&order.id, &f2, OrderStatus::Completed)
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::Completed);
		assert_eq!(order.assigned_factory.as_deref(), Some("f-2"));

		let entries = engine
			.progress()
			.list_entries_for_order(&order.id)
			.await
			.unwrap();
		assert_eq!(entries.len(), 2);

		let assigned = engine
			.orders()
			.list_by_factory("f-2", PageRequest::new(1, 10))
			.await
			.unwrap();
		assert_eq!(assigned.total, 1);
	}

	#[tokio::test]
	async fn test_completed_stage_keeps_creation_order() {
		let engine = engine();
		let designer = Identity::designer("d-1");
		let f2 = Identity::factory("f-2");

		let order = engine
			.orders()
			.create_order(&designer, shirts(true))
			.await
			.unwrap();
		let bid = engine
			.bids()
			.submit_bid(&f2, &order.id, "f-2", None)
			.await
			.unwrap();
		engine.bids().accept_bid(&bid.id, &designer).await.unwrap();

		let material = engine
			.progress()
			.create_entry(&f2, progress(&order.id, "f-2", ProgressStage::Material))
			.await
			.unwrap();
		let production = engine
			.progress()
			.create_entry(&f2, progress(&order.id, "f-2", ProgressStage::Production))
			.await
			.unwrap();
		assert_eq!(production.status, ProgressStatus::InProgress);
		assert!(production.completed_at.is_none());

		let completed_at = 1_750_000_000;
		let amended = engine
			.progress()
			.update_entry(
				&production.id,
				&f2,
				ProgressUpdate {
					status: Some(ProgressStatus::Completed),
					completed_at: Some(completed_at),
					..ProgressUpdate::default()
				},
			)
			.await
			.unwrap();
		assert_eq!(amended.status, ProgressStatus::Completed);
		assert_eq!(amended.completed_at, Some(completed_at));
		assert_eq!(amended.sequence, production.sequence);
		assert_eq!(amended.stage, ProgressStage::Production);

		let entries = engine
			.progress()
			.list_entries_for_order(&order.id)
			.await
			.unwrap();
		let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
		assert_eq!(ids, vec![material.id.as_str(), production.id.as_str()]);
		assert!(entries[0].sequence < entries[1].sequence);
		assert_eq!(entries[1], amended);

		let again = engine
			.progress()
			.list_entries_for_order(&order.id)
			.await
			.unwrap();
		assert_eq!(entries, again);
	}

	#[tokio::test]
	async fn test_bidding_closed_outside_published() {
		let engine = engine();
		let designer = Identity::designer("d-1");
		let factory = Identity::factory("f-1");

		let draft = engine
			.orders()
			.create_order(&designer, shirts(false))
			.await
			.unwrap();
		let err = engine
			.bids()
			.submit_bid(&factory, &draft.id, "f-1", None)
			.await
			.unwrap_err();
		assert!(matches!(err, BidError::OrderNotBiddable { .. }));

		engine
			.orders()
			.transition(&draft.id, &designer, OrderStatus::Published)
			.await
			.unwrap();
		let bid = engine
			.bids()
			.submit_bid(&factory, &draft.id, "f-1", None)
			.await
			.unwrap();
		engine
			.orders()
			.transition(&draft.id, &designer, OrderStatus::Cancelled)
			.await
			.unwrap();

		let err = engine.bids().accept_bid(&bid.id, &designer).await.unwrap_err();
		assert!(matches!(err, BidError::OrderNotBiddable { .. }));
		// The pending bid is left inert, not rewritten.
		assert_eq!(
			engine.bids().get_bid(&bid.id).await.unwrap().status,
			BidStatus::Pending
		);
	}

	#[tokio::test]
	async fn test_accepted_is_only_reachable_through_bids() {
		let engine = engine();
		let designer = Identity::designer("d-1");
		let order = engine
			.orders()
			.create_order(&designer, shirts(true))
			.await
			.unwrap();

		let err = engine
			.orders()
			.transition(&order.id, &designer, OrderStatus::Accepted)
			.await
			.unwrap_err();
		assert!(matches!(err, OrderStoreError::InvalidTransition { .. }));
		assert_eq!(err.kind(), ErrorKind::InvalidTransition);
	}

	#[tokio::test]
	async fn test_reads_do_not_change_state() {
		let engine = engine();
		let designer = Identity::designer("d-1");
		let order = engine
			.orders()
			.create_order(&designer, shirts(true))
			.await
			.unwrap();

		let first = engine.orders().get_order(&order.id).await.unwrap();
		engine
			.orders()
			.list_marketplace(Some("OXFORD"), PageRequest::new(1, 5))
			.await
			.unwrap();
		engine.orders().statistics("d-1").await.unwrap();
		engine.bids().list_bids_for_order(&order.id).await.unwrap();
		let second = engine.orders().get_order(&order.id).await.unwrap();
		assert_eq!(first, second);
	}
}
