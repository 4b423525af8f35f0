//! Order store and lifecycle state machine.
//!
//! Orders move `draft -> published -> accepted -> in_progress -> completed`,
//! and can be cancelled from any non-terminal state. The `accepted` step is
//! only taken by bid acceptance, which commits it together with the bid
//! decisions; every other move goes through [`OrderStore::transition`].

use crate::auth::{ensure, AccessDenied, Action};
use crate::state::{newest_first, storage_error_kind};
use crate::utils::{normalize_page, retry_on_conflict, truncate_id, Contention};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tailor_config::WorkflowConfig;
use tailor_storage::{Snapshot, StorageError, StorageService, Transaction};
use tailor_types::{
	current_timestamp, ErrorKind, Identity, NewOrder, Order, OrderStatistics, OrderStatus,
	OrderUpdate, Page, PageRequest, StorageKey,
};
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur during order management.
#[derive(Debug, Error)]
pub enum OrderStoreError {
	#[error("Order not found: {0}")]
	OrderNotFound(String),
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error(transparent)]
	Unauthorized(#[from] AccessDenied),
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	#[error("Order {order_id} cannot be modified while {status}")]
	NotEditable { order_id: String, status: OrderStatus },
	#[error("Order changed concurrently {0} times; refresh and retry")]
	Contended(u32),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

impl OrderStoreError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			OrderStoreError::OrderNotFound(_) => ErrorKind::NotFound,
			OrderStoreError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
			OrderStoreError::Unauthorized(_) => ErrorKind::Unauthorized,
			OrderStoreError::InvalidInput(_) => ErrorKind::InvalidInput,
			OrderStoreError::NotEditable { .. } | OrderStoreError::Contended(_) => {
				ErrorKind::Conflict
			},
			OrderStoreError::Storage(e) => storage_error_kind(e),
		}
	}

	/// Stable machine-readable code for API responses.
	pub fn code(&self) -> &'static str {
		match self {
			OrderStoreError::OrderNotFound(_) => "ORDER_NOT_FOUND",
			OrderStoreError::InvalidTransition { .. } => "INVALID_TRANSITION",
			OrderStoreError::Unauthorized(_) => "UNAUTHORIZED",
			OrderStoreError::InvalidInput(_) => "INVALID_INPUT",
			OrderStoreError::NotEditable { .. } => "ORDER_NOT_EDITABLE",
			OrderStoreError::Contended(_) => "CONTENDED",
			OrderStoreError::Storage(_) => "STORAGE_ERROR",
		}
	}
}

impl Contention for OrderStoreError {
	fn is_write_conflict(&self) -> bool {
		matches!(self, OrderStoreError::Storage(StorageError::Conflict(_)))
	}

	fn contended(attempts: u32) -> Self {
		OrderStoreError::Contended(attempts)
	}
}

/// Allowed moves between order states.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		OrderStatus::Draft,
		HashSet::from([OrderStatus::Published, OrderStatus::Cancelled]),
	);
	m.insert(
		OrderStatus::Published,
		HashSet::from([OrderStatus::Accepted, OrderStatus::Cancelled]),
	);
	m.insert(
		OrderStatus::Accepted,
		HashSet::from([OrderStatus::InProgress, OrderStatus::Cancelled]),
	);
	m.insert(
		OrderStatus::InProgress,
		HashSet::from([OrderStatus::Completed, OrderStatus::Cancelled]),
	);
	m.insert(OrderStatus::Completed, HashSet::new()); // terminal
	m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
	m
});

/// Checks a move against the transition table.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
	TRANSITIONS
		.get(&from)
		.is_some_and(|targets| targets.contains(&to))
}

/// Who may drive an order into `target`, and on whose behalf.
fn transition_action(order: &Order, target: OrderStatus) -> (Action, &str) {
	let factory = order.assigned_factory.as_deref().unwrap_or("");
	match target {
		OrderStatus::InProgress => (Action::StartProduction, factory),
		OrderStatus::Completed => (Action::CompleteOrder, factory),
		OrderStatus::Cancelled => (Action::CancelOrder, &order.designer_id),
		OrderStatus::Draft | OrderStatus::Published | OrderStatus::Accepted => {
			(Action::PublishOrder, &order.designer_id)
		},
	}
}

fn validate_fields(
	title: &str,
	quantity: u32,
	unit_price: Option<Decimal>,
	total_price: Option<Decimal>,
) -> Result<(), OrderStoreError> {
	if title.trim().is_empty() {
		return Err(OrderStoreError::InvalidInput("title is required".into()));
	}
	if quantity == 0 {
		return Err(OrderStoreError::InvalidInput(
			"quantity must be at least 1".into(),
		));
	}
	if unit_price.is_some_and(|p| p.is_sign_negative()) {
		return Err(OrderStoreError::InvalidInput(
			"unit_price cannot be negative".into(),
		));
	}
	if total_price.is_some_and(|p| p.is_sign_negative()) {
		return Err(OrderStoreError::InvalidInput(
			"total_price cannot be negative".into(),
		));
	}
	Ok(())
}

fn derive_total(
	unit_price: Option<Decimal>,
	quantity: u32,
) -> Result<Option<Decimal>, OrderStoreError> {
	unit_price
		.map(|price| {
			price
				.checked_mul(Decimal::from(quantity))
				.ok_or_else(|| OrderStoreError::InvalidInput("total price overflows".into()))
		})
		.transpose()
}

/// Owns order records and their lifecycle.
pub struct OrderStore {
	storage: Arc<StorageService>,
	workflow: WorkflowConfig,
}

impl OrderStore {
	pub fn new(storage: Arc<StorageService>, workflow: WorkflowConfig) -> Self {
		Self { storage, workflow }
	}

	/// Reads a live order with its compare-and-swap token.
	async fn load(&self, order_id: &str) -> Result<Snapshot<Order>, OrderStoreError> {
		match self
			.storage
			.try_snapshot::<Order>(StorageKey::Orders.as_str(), order_id)
			.await?
		{
			Some(snapshot) if !snapshot.value.deleted => Ok(snapshot),
			_ => Err(OrderStoreError::OrderNotFound(order_id.to_string())),
		}
	}

	/// Creates an order owned by the calling designer.
	#[instrument(skip_all, fields(designer = %identity.user_id))]
	pub async fn create_order(
		&self,
		identity: &Identity,
		new_order: NewOrder,
	) -> Result<Order, OrderStoreError> {
		ensure(identity, Action::CreateOrder, &identity.user_id)?;
		validate_fields(
			&new_order.title,
			new_order.quantity,
			new_order.unit_price,
			new_order.total_price,
		)?;

		let total_price = match new_order.total_price {
			Some(total) => Some(total),
			None => derive_total(new_order.unit_price, new_order.quantity)?,
		};

		let now = current_timestamp();
		let order = Order {
			id: uuid::Uuid::new_v4().to_string(),
			title: new_order.title.trim().to_string(),
			description: new_order.description,
			quantity: new_order.quantity,
			unit_price: new_order.unit_price,
			total_price,
			designer_id: identity.user_id.clone(),
			assigned_factory: None,
			status: if new_order.publish {
				OrderStatus::Published
			} else {
				OrderStatus::Draft
			},
			bid_count: 0,
			attachments: new_order.attachments,
			special_requirements: new_order.special_requirements,
			delivery_date: new_order.delivery_date,
			created_at: now,
			updated_at: now,
			deleted: false,
		};

		let mut tx = Transaction::new();
		tx.insert(StorageKey::Orders.as_str(), &order.id, &order)?;
		self.storage.commit(tx).await?;

		tracing::info!(order_id = %truncate_id(&order.id), status = %order.status, "Order created");
		Ok(order)
	}

	/// Fetches a live order.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderStoreError> {
		Ok(self.load(order_id).await?.value)
	}

	/// Edits descriptive fields of a draft or published order.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn update_order(
		&self,
		order_id: &str,
		identity: &Identity,
		update: OrderUpdate,
	) -> Result<Order, OrderStoreError> {
		retry_on_conflict(self.workflow.max_conflict_retries, || {
			self.try_update(order_id, identity, &update)
		})
		.await
	}

	async fn try_update(
		&self,
		order_id: &str,
		identity: &Identity,
		update: &OrderUpdate,
	) -> Result<Order, OrderStoreError> {
		let snapshot = self.load(order_id).await?;
		let mut order = snapshot.value.clone();
		ensure(identity, Action::EditOrder, &order.designer_id)?;
		if !matches!(order.status, OrderStatus::Draft | OrderStatus::Published) {
			return Err(OrderStoreError::NotEditable {
				order_id: order.id,
				status: order.status,
			});
		}

		if let Some(title) = &update.title {
			order.title = title.trim().to_string();
		}
		if let Some(description) = &update.description {
			order.description = description.clone();
		}
		if let Some(quantity) = update.quantity {
			order.quantity = quantity;
		}
		if let Some(unit_price) = update.unit_price {
			order.unit_price = Some(unit_price);
		}
		match update.total_price {
			Some(total_price) => order.total_price = Some(total_price),
			None if update.unit_price.is_some() || update.quantity.is_some() => {
				if let Some(total) = derive_total(order.unit_price, order.quantity)? {
					order.total_price = Some(total);
				}
			},
			None => {},
		}
		if let Some(attachments) = &update.attachments {
			order.attachments = attachments.clone();
		}
		if let Some(requirements) = &update.special_requirements {
			order.special_requirements = requirements.clone();
		}
		if let Some(delivery_date) = update.delivery_date {
			order.delivery_date = Some(delivery_date);
		}
		validate_fields(
			&order.title,
			order.quantity,
			order.unit_price,
			order.total_price,
		)?;
		order.updated_at = current_timestamp();

		let mut tx = Transaction::new();
		tx.replace(&snapshot, &order)?;
		self.storage.commit(tx).await?;

		tracing::info!("Order updated");
		Ok(order)
	}

	/// Moves an order to `target` if the transition table and the caller allow it.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), target = %target))]
	pub async fn transition(
		&self,
		order_id: &str,
		identity: &Identity,
		target: OrderStatus,
	) -> Result<Order, OrderStoreError> {
		retry_on_conflict(self.workflow.max_conflict_retries, || {
			self.try_transition(order_id, identity, target)
		})
		.await
	}

	async fn try_transition(
		&self,
		order_id: &str,
		identity: &Identity,
		target: OrderStatus,
	) -> Result<Order, OrderStoreError> {
		let snapshot = self.load(order_id).await?;
		let mut order = snapshot.value.clone();
		let from = order.status;

		let (action, owner) = transition_action(&order, target);
		ensure(identity, action, owner)?;

		// Acceptance is committed together with the bid decisions.
		if target == OrderStatus::Accepted || !is_valid_transition(from, target) {
			tracing::warn!(from = %from, "Rejected invalid transition");
			return Err(OrderStoreError::InvalidTransition { from, to: target });
		}

		order.status = target;
		if target == OrderStatus::Cancelled {
			order.assigned_factory = None;
		}
		order.updated_at = current_timestamp();

		let mut tx = Transaction::new();
		tx.replace(&snapshot, &order)?;
		self.storage.commit(tx).await?;

		tracing::info!(from = %from, to = %target, "Order status changed");
		Ok(order)
	}

	/// Tombstones a draft or cancelled order.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn delete_order(
		&self,
		order_id: &str,
		identity: &Identity,
	) -> Result<Order, OrderStoreError> {
		retry_on_conflict(self.workflow.max_conflict_retries, || async move {
			let snapshot = self.load(order_id).await?;
			let mut order = snapshot.value.clone();
			ensure(identity, Action::DeleteOrder, &order.designer_id)?;
			if !matches!(order.status, OrderStatus::Draft | OrderStatus::Cancelled) {
				return Err(OrderStoreError::NotEditable {
					order_id: order.id,
					status: order.status,
				});
			}

			order.deleted = true;
			order.updated_at = current_timestamp();
			let mut tx = Transaction::new();
			tx.replace(&snapshot, &order)?;
			self.storage.commit(tx).await?;

			tracing::info!("Order deleted");
			Ok(order)
		})
		.await
	}

	/// Pages through live orders matching `filter`, newest first.
	async fn list_where<F>(
		&self,
		page: PageRequest,
		filter: F,
	) -> Result<Page<Order>, OrderStoreError>
	where
		F: Fn(&Order) -> bool,
	{
		let page = normalize_page(page, &self.workflow).map_err(OrderStoreError::InvalidInput)?;
		let mut orders: Vec<Order> = self
			.storage
			.scan::<Order>(StorageKey::Orders.as_str())
			.await?
			.into_iter()
			.filter(|order| !order.deleted && filter(order))
			.collect();
		orders.sort_by(|a, b| newest_first((a.created_at, &a.id), (b.created_at, &b.id)));
		Ok(Page::from_sorted(orders, page))
	}

	/// Orders owned by a designer, optionally restricted to one status.
	pub async fn list_by_designer(
		&self,
		designer_id: &str,
		status: Option<OrderStatus>,
		page: PageRequest,
	) -> Result<Page<Order>, OrderStoreError> {
		self.list_where(page, |order| {
			order.designer_id == designer_id && status.is_none_or(|s| order.status == s)
		})
		.await
	}

	/// Orders assigned to a factory.
	pub async fn list_by_factory(
		&self,
		factory_id: &str,
		page: PageRequest,
	) -> Result<Page<Order>, OrderStoreError> {
		self.list_where(page, |order| {
			order.assigned_factory.as_deref() == Some(factory_id)
		})
		.await
	}

	/// Published orders open for bidding, optionally filtered by a keyword
	/// found in the title or description (case-insensitive).
	pub async fn list_marketplace(
		&self,
		keyword: Option<&str>,
		page: PageRequest,
	) -> Result<Page<Order>, OrderStoreError> {
		let keyword = keyword
			.map(|k| k.trim().to_lowercase())
			.filter(|k| !k.is_empty());
		self.list_where(page, |order| {
			order.status == OrderStatus::Published
				&& keyword.as_deref().is_none_or(|k| {
					order.title.to_lowercase().contains(k)
						|| order.description.to_lowercase().contains(k)
				})
		})
		.await
	}

	/// Counts a designer's live orders per status.
	pub async fn statistics(&self, designer_id: &str) -> Result<OrderStatistics, OrderStoreError> {
		let mut stats = OrderStatistics::default();
		for order in self
			.storage
			.scan::<Order>(StorageKey::Orders.as_str())
			.await?
		{
			if !order.deleted && order.designer_id == designer_id {
				stats.record(order.status);
			}
		}
		Ok(stats)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tailor_storage::implementations::memory::MemoryStorage;

	fn store() -> OrderStore {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		OrderStore::new(storage, WorkflowConfig::default())
	}

	fn new_order(title: &str, publish: bool) -> NewOrder {
		NewOrder {
			title: title.to_string(),
			description: "Organic cotton, screen printed".to_string(),
			quantity: 200,
			unit_price: Some(Decimal::new(1250, 2)),
			publish,
			..NewOrder::default()
		}
	}

	/// Forces an order into an assigned state the way bid acceptance would.
	async fn assign(store: &OrderStore, order_id: &str, factory: &str) {
		let snapshot = store.load(order_id).await.unwrap();
		let mut order = snapshot.value.clone();
		order.status = OrderStatus::Accepted;
		order.assigned_factory = Some(factory.to_string());
		let mut tx = Transaction::new();
		tx.replace(&snapshot, &order).unwrap();
		store.storage.commit(tx).await.unwrap();
	}

	#[test]
	fn test_transition_table() {
		assert!(is_valid_transition(OrderStatus::Draft, OrderStatus::Published));
		assert!(is_valid_transition(OrderStatus::Published, OrderStatus::Accepted));
		assert!(is_valid_transition(OrderStatus::InProgress, OrderStatus::Cancelled));
		assert!(!is_valid_transition(OrderStatus::Draft, OrderStatus::InProgress));
		assert!(!is_valid_transition(OrderStatus::Published, OrderStatus::Draft));
		for target in OrderStatus::all() {
			assert!(!is_valid_transition(OrderStatus::Completed, target));
			assert!(!is_valid_transition(OrderStatus::Cancelled, target));
		}
	}

	#[tokio::test]
	async fn test_create_derives_total_and_status() {
		let store = store();
		let designer = Identity::designer("d-1");

		let order = store
			.create_order(&designer, new_order("Hoodies", true))
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::Published);
		assert_eq!(order.designer_id, "d-1");
		assert_eq!(order.total_price, Some(Decimal::new(250000, 2)));
		assert_eq!(store.get_order(&order.id).await.unwrap(), order);

		let draft = store
			.create_order(&designer, new_order("Scarves", false))
			.await
			.unwrap();
		assert_eq!(draft.status, OrderStatus::Draft);
	}

	#[tokio::test]
	async fn test_create_validates_input_and_role() {
		let store = store();

		let err = store
			.create_order(&Identity::factory("f-1"), new_order("Hoodies", true))
			.await
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Unauthorized);

		let mut blank = new_order("  ", true);
		let err = store
			.create_order(&Identity::designer("d-1"), blank.clone())
			.await
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::InvalidInput);

		blank.title = "Caps".into();
		blank.quantity = 0;
		assert!(matches!(
			store.create_order(&Identity::designer("d-1"), blank).await,
			Err(OrderStoreError::InvalidInput(_))
		));

		let mut negative = new_order("Caps", true);
		negative.unit_price = Some(Decimal::new(-1, 0));
		assert!(matches!(
			store.create_order(&Identity::designer("d-1"), negative).await,
			Err(OrderStoreError::InvalidInput(_))
		));
	}

	#[tokio::test]
	async fn test_total_price_overflow_is_rejected() {
		let store = store();
		let designer = Identity::designer("d-1");

		let mut huge = new_order("Coats", true);
		huge.quantity = 2;
		huge.unit_price = Some(Decimal::MAX);
		huge.total_price = None;
		let err = store.create_order(&designer, huge).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::InvalidInput);
		assert!(err.to_string().contains("total price overflows"));

		let order = store
			.create_order(&designer, new_order("Coats", false))
			.await
			.unwrap();
		let update = OrderUpdate {
			unit_price: Some(Decimal::MAX),
			quantity: Some(3),
			..Default::default()
		};
		assert!(matches!(
			store.update_order(&order.id, &designer, update).await,
			Err(OrderStoreError::InvalidInput(_))
		));
		let unchanged = store.get_order(&order.id).await.unwrap();
		assert_eq!(unchanged.unit_price, order.unit_price);
		assert_eq!(unchanged.quantity, order.quantity);
	}

	#[tokio::test]
	async fn test_update_only_by_owner_while_editable() {
		let store = store();
		let designer = Identity::designer("d-1");
		let order = store
			.create_order(&designer, new_order("Hoodies", false))
			.await
			.unwrap();

		let update = OrderUpdate {
			quantity: Some(10),
			..OrderUpdate::default()
		};
		let updated = store
			.update_order(&order.id, &designer, update.clone())
			.await
			.unwrap();
		assert_eq!(updated.quantity, 10);
		assert_eq!(updated.total_price, Some(Decimal::new(12500, 2)));

		let err = store
			.update_order(&order.id, &Identity::designer("d-2"), update.clone())
			.await
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Unauthorized);

		store
			.transition(&order.id, &designer, OrderStatus::Published)
			.await
			.unwrap();
		assign(&store, &order.id, "f-1").await;
		let err = store
			.update_order(&order.id, &designer, update)
			.await
			.unwrap_err();
		assert!(matches!(err, OrderStoreError::NotEditable { .. }));
		assert_eq!(err.kind(), ErrorKind::Conflict);
	}

	#[tokio::test]
	async fn test_full_lifecycle_through_transitions() {
		let store = store();
		let designer = Identity::designer("d-1");
		let factory = Identity::factory("f-1");
		let order = store
			.create_order(&designer, new_order("Hoodies", false))
			.await
			.unwrap();

		store
			.transition(&order.id, &designer, OrderStatus::Published)
			.await
			.unwrap();

		let err = store
			.transition(&order.id, &designer, OrderStatus::Accepted)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			OrderStoreError::InvalidTransition {
				from: OrderStatus::Published,
				to: OrderStatus::Accepted
			}
		));

		assign(&store, &order.id, "f-1").await;

		// Only the assigned factory drives production.
		let err = store
			.transition(&order.id, &Identity::factory("f-2"), OrderStatus::InProgress)
			.await
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Unauthorized);

		let started = store
			.transition(&order.id, &factory, OrderStatus::InProgress)
			.await
			.unwrap();
		assert_eq!(started.status, OrderStatus::InProgress);
		assert!(started.assignment_is_consistent());

		let done = store
			.transition(&order.id, &factory, OrderStatus::Completed)
			.await
			.unwrap();
		assert_eq!(done.status, OrderStatus::Completed);

		let err = store
			.transition(&order.id, &designer, OrderStatus::Cancelled)
			.await
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::InvalidTransition);
	}

	#[tokio::test]
	async fn test_cancel_clears_assignment() {
		let store = store();
		let designer = Identity::designer("d-1");
		let order = store
			.create_order(&designer, new_order("Hoodies", true))
			.await
			.unwrap();
		assign(&store, &order.id, "f-1").await;

		let cancelled = store
			.transition(&order.id, &Identity::admin("ops"), OrderStatus::Cancelled)
			.await
			.unwrap();
		assert_eq!(cancelled.status, OrderStatus::Cancelled);
		assert_eq!(cancelled.assigned_factory, None);
		assert!(cancelled.assignment_is_consistent());
	}

	#[tokio::test]
	async fn test_delete_is_a_tombstone_for_drafts_only() {
		let store = store();
		let designer = Identity::designer("d-1");
		let published = store
			.create_order(&designer, new_order("Hoodies", true))
			.await
			.unwrap();
		assert!(matches!(
			store.delete_order(&published.id, &designer).await,
			Err(OrderStoreError::NotEditable { .. })
		));

		let draft = store
			.create_order(&designer, new_order("Scarves", false))
			.await
			.unwrap();
		let deleted = store.delete_order(&draft.id, &designer).await.unwrap();
		assert!(deleted.deleted);
		assert!(matches!(
			store.get_order(&draft.id).await,
			Err(OrderStoreError::OrderNotFound(_))
		));

		let stats = store.statistics("d-1").await.unwrap();
		assert_eq!(stats.total, 1);
		assert_eq!(stats.published, 1);
	}

	#[tokio::test]
	async fn test_listings_filter_and_paginate() {
		let store = store();
		let d1 = Identity::designer("d-1");
		let d2 = Identity::designer("d-2");
		for i in 0..5 {
			store
				.create_order(&d1, new_order(&format!("Denim jacket {}", i), true))
				.await
				.unwrap();
		}
		store
			.create_order(&d1, new_order("Linen shirt", false))
			.await
			.unwrap();
		store
			.create_order(&d2, new_order("Wool coat", true))
			.await
			.unwrap();

		let page = store
			.list_by_designer("d-1", None, PageRequest::new(1, 4))
			.await
			.unwrap();
		assert_eq!(page.total, 6);
		assert_eq!(page.items.len(), 4);
		assert_eq!(page.total_pages, 2);

		let drafts = store
			.list_by_designer("d-1", Some(OrderStatus::Draft), PageRequest::new(1, 10))
			.await
			.unwrap();
		assert_eq!(drafts.total, 1);

		let market = store
			.list_marketplace(Some("DENIM"), PageRequest::new(2, 3))
			.await
			.unwrap();
		assert_eq!(market.total, 5);
		assert_eq!(market.items.len(), 2);

		let everything = store
			.list_marketplace(None, PageRequest::new(1, 50))
			.await
			.unwrap();
		assert_eq!(everything.total, 6);

		assert!(matches!(
			store.list_marketplace(None, PageRequest::new(0, 10)).await,
			Err(OrderStoreError::InvalidInput(_))
		));
	}

	#[tokio::test]
	async fn test_list_by_factory_sees_assigned_orders() {
		let store = store();
		let designer = Identity::designer("d-1");
		let order = store
			.create_order(&designer, new_order("Hoodies", true))
			.await
			.unwrap();
		assign(&store, &order.id, "f-1").await;

		let page = store
			.list_by_factory("f-1", PageRequest::new(1, 10))
			.await
			.unwrap();
		assert_eq!(page.items.len(), 1);
		assert_eq!(page.items[0].id, order.id);
		assert!(store
			.list_by_factory("f-2", PageRequest::new(1, 10))
			.await
			.unwrap()
			.items
			.is_empty());
	}
}
