//! Progress ledger for production updates on accepted orders.
//!
//! Only the factory whose bid was accepted may file entries for an order.
//! Each entry receives the next per-order sequence number, allocated from a
//! counter row in the same commit that inserts the entry, so listings in
//! sequence order match creation order even under concurrent writers.

use crate::auth::{ensure, AccessDenied, Action};
use crate::state::{newest_first, storage_error_kind};
use crate::utils::{normalize_page, retry_on_conflict, truncate_id, Contention};
use std::sync::Arc;
use tailor_config::WorkflowConfig;
use tailor_storage::{Snapshot, StorageError, StorageService, Transaction};
use tailor_types::{
	bid_index_id, current_timestamp, Bid, BidStatus, ErrorKind, Identity, NewProgressEntry, Order,
	Page, PageRequest, ProgressEntry, ProgressStatistics, ProgressUpdate, StorageKey,
};
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur in the progress ledger.
#[derive(Debug, Error)]
pub enum ProgressError {
	#[error("Order not found: {0}")]
	OrderNotFound(String),
	#[error("Progress entry not found: {0}")]
	EntryNotFound(String),
	#[error("Factory {factory_id} is not the assigned factory of order {order_id}")]
	NotAssignedFactory { order_id: String, factory_id: String },
	#[error(transparent)]
	Unauthorized(#[from] AccessDenied),
	#[error("Progress entry {entry_id} belongs to order {expected}, not {supplied}")]
	OrderMismatch {
		entry_id: String,
		expected: String,
		supplied: String,
	},
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	#[error("Progress changed concurrently {0} times; refresh and retry")]
	Contended(u32),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

impl ProgressError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			ProgressError::OrderNotFound(_) | ProgressError::EntryNotFound(_) => {
				ErrorKind::NotFound
			},
			ProgressError::NotAssignedFactory { .. } | ProgressError::Unauthorized(_) => {
				ErrorKind::Unauthorized
			},
			ProgressError::OrderMismatch { .. } | ProgressError::InvalidInput(_) => {
				ErrorKind::InvalidInput
			},
			ProgressError::Contended(_) => ErrorKind::Conflict,
			ProgressError::Storage(e) => storage_error_kind(e),
		}
	}

	pub fn code(&self) -> &'static str {
		match self {
			ProgressError::OrderNotFound(_) => "ORDER_NOT_FOUND",
			ProgressError::EntryNotFound(_) => "ENTRY_NOT_FOUND",
			ProgressError::NotAssignedFactory { .. } => "NOT_ASSIGNED_FACTORY",
			ProgressError::Unauthorized(_) => "UNAUTHORIZED",
			ProgressError::OrderMismatch { .. } => "ORDER_MISMATCH",
			ProgressError::InvalidInput(_) => "INVALID_INPUT",
			ProgressError::Contended(_) => "CONTENDED",
			ProgressError::Storage(_) => "STORAGE_ERROR",
		}
	}
}

impl Contention for ProgressError {
	fn is_write_conflict(&self) -> bool {
		matches!(self, ProgressError::Storage(StorageError::Conflict(_)))
	}

	fn contended(attempts: u32) -> Self {
		ProgressError::Contended(attempts)
	}
}

fn validate_entry(entry: &ProgressEntry) -> Result<(), ProgressError> {
	if entry.percentage.is_some_and(|p| p > 100) {
		return Err(ProgressError::InvalidInput(
			"percentage must be between 0 and 100".into(),
		));
	}
	if let (Some(started), Some(completed)) = (entry.started_at, entry.completed_at) {
		if completed < started {
			return Err(ProgressError::InvalidInput(
				"completed_at cannot precede started_at".into(),
			));
		}
	}
	Ok(())
}

/// Owns progress entries and their per-order sequence counters.
pub struct ProgressLedger {
	storage: Arc<StorageService>,
	workflow: WorkflowConfig,
}

impl ProgressLedger {
	pub fn new(storage: Arc<StorageService>, workflow: WorkflowConfig) -> Self {
		Self { storage, workflow }
	}

	async fn load_order(&self, order_id: &str) -> Result<Snapshot<Order>, ProgressError> {
		match self
			.storage
			.try_snapshot::<Order>(StorageKey::Orders.as_str(), order_id)
			.await?
		{
			Some(snapshot) if !snapshot.value.deleted => Ok(snapshot),
			_ => Err(ProgressError::OrderNotFound(order_id.to_string())),
		}
	}

	async fn load_entry(&self, entry_id: &str) -> Result<Snapshot<ProgressEntry>, ProgressError> {
		match self
			.storage
			.try_snapshot::<ProgressEntry>(StorageKey::Progress.as_str(), entry_id)
			.await?
		{
			Some(snapshot) if !snapshot.value.deleted => Ok(snapshot),
			_ => Err(ProgressError::EntryNotFound(entry_id.to_string())),
		}
	}

	/// Finds the accepted bid linking `factory_id` to `order`.
	async fn accepted_bid(
		&self,
		order: &Order,
		factory_id: &str,
	) -> Result<Snapshot<Bid>, ProgressError> {
		let not_assigned = || ProgressError::NotAssignedFactory {
			order_id: order.id.clone(),
			factory_id: factory_id.to_string(),
		};
		if order.assigned_factory.as_deref() != Some(factory_id) {
			return Err(not_assigned());
		}
		let index = self
			.storage
			.try_snapshot::<String>(
				StorageKey::BidIndex.as_str(),
				&bid_index_id(&order.id, factory_id),
			)
			.await?
			.ok_or_else(not_assigned)?;
		let bid = self
			.storage
			.try_snapshot::<Bid>(StorageKey::Bids.as_str(), &index.value)
			.await?
			.ok_or_else(not_assigned)?;
		if bid.value.deleted || bid.value.status != BidStatus::Accepted {
			return Err(not_assigned());
		}
		Ok(bid)
	}

	/// Appends a progress entry for the assigned factory of an order.
	#[instrument(skip_all, fields(order_id = %truncate_id(&new_entry.order_id), factory = %new_entry.factory_id))]
	pub async fn create_entry(
		&self,
		identity: &Identity,
		new_entry: NewProgressEntry,
	) -> Result<ProgressEntry, ProgressError> {
		retry_on_conflict(self.workflow.max_conflict_retries, || {
			self.try_create(identity, &new_entry)
		})
		.await
	}

	async fn try_create(
		&self,
		identity: &Identity,
		new_entry: &NewProgressEntry,
	) -> Result<ProgressEntry, ProgressError> {
		let order = self.load_order(&new_entry.order_id).await?;
		ensure(identity, Action::RecordProgress, &new_entry.factory_id)?;
		let bid = self.accepted_bid(&order.value, &new_entry.factory_id).await?;

		let now = current_timestamp();
		let mut entry = ProgressEntry {
			id: uuid::Uuid::new_v4().to_string(),
			order_id: new_entry.order_id.clone(),
			factory_id: new_entry.factory_id.clone(),
			sequence: 0,
			stage: new_entry.stage,
			status: new_entry.status,
			description: new_entry.description.clone(),
			percentage: new_entry.percentage,
			started_at: new_entry.started_at,
			completed_at: new_entry.completed_at,
			images: new_entry.images.clone(),
			creator_id: identity.user_id.clone(),
			created_at: now,
			updated_at: now,
			deleted: false,
		};
		validate_entry(&entry)?;

		let counter = self
			.storage
			.try_snapshot::<u64>(StorageKey::ProgressSequence.as_str(), &entry.order_id)
			.await?;
		entry.sequence = counter.as_ref().map_or(0, |c| c.value) + 1;

		let mut tx = Transaction::new();
		tx.guard(&order);
		tx.guard(&bid);
		tx.upsert(
			StorageKey::ProgressSequence.as_str(),
			&entry.order_id,
			counter.as_ref(),
			&entry.sequence,
		)?;
		tx.insert(StorageKey::Progress.as_str(), &entry.id, &entry)?;
		self.storage.commit(tx).await?;

		tracing::info!(
			entry_id = %truncate_id(&entry.id),
			sequence = entry.sequence,
			stage = entry.stage.as_str(),
			"Progress recorded"
		);
		Ok(entry)
	}

	/// Loads an entry the caller may amend, checking the optional order hint.
	async fn owned_entry(
		&self,
		entry_id: &str,
		identity: &Identity,
		order_id: Option<&str>,
	) -> Result<Snapshot<ProgressEntry>, ProgressError> {
		let snapshot = self.load_entry(entry_id).await?;
		ensure(identity, Action::AmendProgress, &snapshot.value.factory_id)?;
		if let Some(supplied) = order_id {
			if supplied != snapshot.value.order_id {
				return Err(ProgressError::OrderMismatch {
					entry_id: entry_id.to_string(),
					expected: snapshot.value.order_id.clone(),
					supplied: supplied.to_string(),
				});
			}
		}
		Ok(snapshot)
	}

	/// Applies a partial update to an entry owned by the calling factory.
	#[instrument(skip_all, fields(entry_id = %truncate_id(entry_id)))]
	pub async fn update_entry(
		&self,
		entry_id: &str,
		identity: &Identity,
		update: ProgressUpdate,
	) -> Result<ProgressEntry, ProgressError> {
		let update = &update;
		retry_on_conflict(self.workflow.max_conflict_retries, || async move {
			let snapshot = self
				.owned_entry(entry_id, identity, update.order_id.as_deref())
				.await?;
			let mut entry = snapshot.value.clone();
			if let Some(stage) = update.stage {
				entry.stage = stage;
			}
			if let Some(status) = update.status {
				entry.status = status;
			}
			if let Some(description) = &update.description {
				entry.description = description.clone();
			}
			if update.percentage.is_some() {
				entry.percentage = update.percentage;
			}
			if update.started_at.is_some() {
				entry.started_at = update.started_at;
			}
			if update.completed_at.is_some() {
				entry.completed_at = update.completed_at;
			}
			if let Some(images) = &update.images {
				entry.images = images.clone();
			}
			validate_entry(&entry)?;
			entry.updated_at = current_timestamp();

			let mut tx = Transaction::new();
			tx.replace(&snapshot, &entry)?;
			self.storage.commit(tx).await?;

			tracing::info!("Progress amended");
			Ok(entry)
		})
		.await
	}

	/// Tombstones an entry owned by the calling factory.
	#[instrument(skip_all, fields(entry_id = %truncate_id(entry_id)))]
	pub async fn delete_entry(
		&self,
		entry_id: &str,
		identity: &Identity,
		order_id: Option<&str>,
	) -> Result<(), ProgressError> {
		retry_on_conflict(self.workflow.max_conflict_retries, || async move {
			let snapshot = self.owned_entry(entry_id, identity, order_id).await?;
			let mut entry = snapshot.value.clone();
			entry.deleted = true;
			entry.updated_at = current_timestamp();

			let mut tx = Transaction::new();
			tx.replace(&snapshot, &entry)?;
			self.storage.commit(tx).await?;

			tracing::info!("Progress entry deleted");
			Ok(())
		})
		.await
	}

	pub async fn get_entry(&self, entry_id: &str) -> Result<ProgressEntry, ProgressError> {
		Ok(self.load_entry(entry_id).await?.value)
	}

	async fn live_records(&self) -> Result<Vec<ProgressEntry>, ProgressError> {
		Ok(self
			.storage
			.scan::<ProgressEntry>(StorageKey::Progress.as_str())
			.await?
			.into_iter()
			.filter(|entry| !entry.deleted)
			.collect())
	}

	/// Entries of an order in creation order.
	pub async fn list_entries_for_order(
		&self,
		order_id: &str,
	) -> Result<Vec<ProgressEntry>, ProgressError> {
		self.load_order(order_id).await?;
		let mut entries: Vec<ProgressEntry> = self
			.live_records()
			.await?
			.into_iter()
			.filter(|entry| entry.order_id == order_id)
			.collect();
		entries.sort_by_key(|entry| entry.sequence);
		Ok(entries)
	}

	/// A factory's entries across all orders, newest first.
	pub async fn list_entries_for_factory(
		&self,
		factory_id: &str,
		page: PageRequest,
	) -> Result<Page<ProgressEntry>, ProgressError> {
		let page = normalize_page(page, &self.workflow).map_err(ProgressError::InvalidInput)?;
		let mut entries: Vec<ProgressEntry> = self
			.live_records()
			.await?
			.into_iter()
			.filter(|entry| entry.factory_id == factory_id)
			.collect();
		entries.sort_by(|a, b| {
			newest_first((a.created_at, &a.id), (b.created_at, &b.id))
				.then_with(|| b.sequence.cmp(&a.sequence))
		});
		Ok(Page::from_sorted(entries, page))
	}

	/// Counts a factory's entries per status.
	pub async fn statistics(&self, factory_id: &str) -> Result<ProgressStatistics, ProgressError> {
		let mut stats = ProgressStatistics::default();
		for entry in self.live_records().await? {
			if entry.factory_id == factory_id {
				stats.record(entry.status);
			}
		}
		Ok(stats)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::state::{BidLedger, OrderStore};
	use tailor_storage::implementations::memory::MemoryStorage;
	use tailor_types::{NewOrder, OrderStatus, ProgressStage, ProgressStatus};

	struct Fixture {
		orders: OrderStore,
		bids: BidLedger,
		progress: Arc<ProgressLedger>,
		designer: Identity,
		factory: Identity,
	}

	fn fixture() -> Fixture {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let workflow = WorkflowConfig::default();
		Fixture {
			orders: OrderStore::new(storage.clone(), workflow.clone()),
			bids: BidLedger::new(storage.clone(), workflow.clone()),
			progress: Arc::new(ProgressLedger::new(storage, workflow)),
			designer: Identity::designer("d-1"),
			factory: Identity::factory("f-1"),
		}
	}

	/// Publishes an order, has f-1 and f-2 bid, and accepts f-1.
	async fn assigned_order(fx: &Fixture) -> Order {
		let order = fx
			.orders
			.create_order(
				&fx.designer,
				NewOrder {
					title: "Linen trousers".to_string(),
					quantity: 200,
					publish: true,
					..NewOrder::default()
				},
			)
			.await
			.unwrap();
		let winner = fx
			.bids
			.submit_bid(&fx.factory, &order.id, "f-1", None)
			.await
			.unwrap();
		fx.bids
			.submit_bid(&Identity::factory("f-2"), &order.id, "f-2", None)
			.await
			.unwrap();
		fx.bids.accept_bid(&winner.id, &fx.designer).await.unwrap().order
	}

	fn new_entry(order_id: &str, factory_id: &str, stage: ProgressStage) -> NewProgressEntry {
		NewProgressEntry {
			order_id: order_id.to_string(),
			factory_id: factory_id.to_string(),
			stage,
			status: ProgressStatus::InProgress,
			description: String::new(),
			percentage: Some(10),
			started_at: None,
			completed_at: None,
			images: vec![],
		}
	}

	#[tokio::test]
	async fn test_entries_are_sequenced_per_order() {
		let fx = fixture();
		let order = assigned_order(&fx).await;

		for stage in [
			ProgressStage::Material,
			ProgressStage::Design,
			ProgressStage::Production,
		] {
			fx.progress
				.create_entry(&fx.factory, new_entry(&order.id, "f-1", stage))
				.await
				.unwrap();
		}

		let entries = fx.progress.list_entries_for_order(&order.id).await.unwrap();
		let sequences: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
		assert_eq!(sequences, vec![1, 2, 3]);
		// Stage order is not enforced.
		assert_eq!(entries[0].stage, ProgressStage::Material);
		assert!(entries.iter().all(|e| e.creator_id == "f-1"));
	}

	#[tokio::test]
	async fn test_only_assigned_factory_records_progress() {
		let fx = fixture();
		let order = assigned_order(&fx).await;

		let err = fx
			.progress
			.create_entry(
				&Identity::factory("f-2"),
				new_entry(&order.id, "f-2", ProgressStage::Design),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, ProgressError::NotAssignedFactory { .. }));
		assert_eq!(err.kind(), ErrorKind::Unauthorized);

		let err = fx
			.progress
			.create_entry(
				&Identity::factory("f-2"),
				new_entry(&order.id, "f-1", ProgressStage::Design),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, ProgressError::Unauthorized(_)));

		let err = fx
			.progress
			.create_entry(&Identity::admin("ops"), new_entry(&order.id, "f-1", ProgressStage::Design))
			.await
			.unwrap_err();
		assert!(matches!(err, ProgressError::Unauthorized(_)));

		assert!(matches!(
			fx.progress
				.create_entry(&fx.factory, new_entry("missing", "f-1", ProgressStage::Design))
				.await,
			Err(ProgressError::OrderNotFound(_))
		));
	}

	#[tokio::test]
	async fn test_unassigned_after_cancel() {
		let fx = fixture();
		let order = assigned_order(&fx).await;
		fx.orders
			.transition(&order.id, &fx.designer, OrderStatus::Cancelled)
			.await
			.unwrap();

		assert!(matches!(
			fx.progress
				.create_entry(&fx.factory, new_entry(&order.id, "f-1", ProgressStage::Design))
				.await,
			Err(ProgressError::NotAssignedFactory { .. })
		));
	}

	#[tokio::test]
	async fn test_input_validation() {
		let fx = fixture();
		let order = assigned_order(&fx).await;

		let mut entry = new_entry(&order.id, "f-1", ProgressStage::Quality);
		entry.percentage = Some(101);
		assert!(matches!(
			fx.progress.create_entry(&fx.factory, entry).await,
			Err(ProgressError::InvalidInput(_))
		));

		let mut entry = new_entry(&order.id, "f-1", ProgressStage::Quality);
		entry.started_at = Some(200);
		entry.completed_at = Some(100);
		assert!(matches!(
			fx.progress.create_entry(&fx.factory, entry).await,
			Err(ProgressError::InvalidInput(_))
		));
	}

	#[tokio::test]
	async fn test_update_and_delete_check_owner_and_order() {
		let fx = fixture();
		let order = assigned_order(&fx).await;
		let entry = fx
			.progress
			.create_entry(&fx.factory, new_entry(&order.id, "f-1", ProgressStage::Production))
			.await
			.unwrap();

		let updated = fx
			.progress
			.update_entry(
				&entry.id,
				&fx.factory,
				ProgressUpdate {
					status: Some(ProgressStatus::Completed),
					percentage: Some(100),
					..ProgressUpdate::default()
				},
			)
			.await
			.unwrap();
		assert_eq!(updated.status, ProgressStatus::Completed);
		assert_eq!(updated.percentage, Some(100));
		assert_eq!(updated.sequence, entry.sequence);

		let err = fx
			.progress
			.update_entry(
				&entry.id,
				&fx.factory,
				ProgressUpdate {
					order_id: Some("other".to_string()),
					..ProgressUpdate::default()
				},
			)
			.await
			.unwrap_err();
		assert!(matches!(err, ProgressError::OrderMismatch { .. }));
		assert_eq!(err.kind(), ErrorKind::InvalidInput);

		assert!(matches!(
			fx.progress
				.delete_entry(&entry.id, &Identity::factory("f-2"), None)
				.await,
			Err(ProgressError::Unauthorized(_))
		));
		assert!(matches!(
			fx.progress
				.delete_entry(&entry.id, &fx.factory, Some("other"))
				.await,
			Err(ProgressError::OrderMismatch { .. })
		));

		fx.progress
			.delete_entry(&entry.id, &fx.factory, Some(&order.id))
			.await
			.unwrap();
		assert!(matches!(
			fx.progress.get_entry(&entry.id).await,
			Err(ProgressError::EntryNotFound(_))
		));
		assert!(matches!(
			fx.progress
				.update_entry(&entry.id, &fx.factory, ProgressUpdate::default())
				.await,
			Err(ProgressError::EntryNotFound(_))
		));

		// Deleting an entry leaves the order untouched.
		let stored = fx.orders.get_order(&order.id).await.unwrap();
		assert_eq!(stored, order);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_entries_get_distinct_sequences() {
		let fx = fixture();
		let order = assigned_order(&fx).await;

		let writers = (0..4).map(|_| {
			let progress = fx.progress.clone();
			let factory = fx.factory.clone();
			let entry = new_entry(&order.id, "f-1", ProgressStage::Production);
			tokio::spawn(async move { progress.create_entry(&factory, entry).await })
		});
		let mut sequences = Vec::new();
		for result in futures::future::join_all(writers).await {
			match result.unwrap() {
				Ok(entry) => sequences.push(entry.sequence),
				Err(e) => assert!(matches!(e, ProgressError::Contended(_)), "{}", e),
			}
		}
		sequences.sort_unstable();
		sequences.dedup();

		let stored = fx.progress.list_entries_for_order(&order.id).await.unwrap();
		assert_eq!(stored.len(), sequences.len());
		assert!(!stored.is_empty());
	}

	#[tokio::test]
	async fn test_factory_listing_and_statistics() {
		let fx = fixture();
		let order = assigned_order(&fx).await;
		for status in [ProgressStatus::Completed, ProgressStatus::Delayed] {
			let mut entry = new_entry(&order.id, "f-1", ProgressStage::Shipping);
			entry.status = status;
			fx.progress.create_entry(&fx.factory, entry).await.unwrap();
		}

		let page = fx
			.progress
			.list_entries_for_factory("f-1", PageRequest::new(1, 1))
			.await
			.unwrap();
		assert_eq!(page.total, 2);
		assert_eq!(page.items.len(), 1);
		assert_eq!(page.total_pages, 2);
		assert!(fx
			.progress
			.list_entries_for_factory("f-1", PageRequest::new(0, 1))
			.await
			.is_err());

		let stats = fx.progress.statistics("f-1").await.unwrap();
		assert_eq!(stats.completed, 1);
		assert_eq!(stats.delayed, 1);
		assert_eq!(stats.total, 2);
		assert_eq!(fx.progress.statistics("f-2").await.unwrap().total, 0);
	}
}
