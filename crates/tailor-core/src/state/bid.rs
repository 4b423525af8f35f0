//! Bid ledger for factory offers on published orders.
//!
//! A factory holds at most one live bid (not withdrawn, not rejected) per
//! order, tracked through the `bid_index` record for the pair. Submitting a
//! bid also bumps the order's `bid_count`, so a submission and an acceptance
//! on the same order always touch a common row and cannot both commit
//! against stale state.
//!
//! Acceptance is one atomic unit: the chosen bid becomes `accepted`, every
//! other pending bid of the order becomes `rejected` as superseded, and the
//! order becomes `accepted` with the winning factory assigned. Concurrent
//! acceptances race on the order row; the loser re-reads, finds the order no
//! longer published and reports `OrderNotBiddable`.

use crate::auth::{ensure, AccessDenied, Action};
use crate::state::order::is_valid_transition;
use crate::state::{newest_first, storage_error_kind};
use crate::utils::{normalize_page, retry_on_conflict, truncate_id, Contention};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tailor_config::WorkflowConfig;
use tailor_storage::{Snapshot, StorageError, StorageService, Transaction};
use tailor_types::{
	bid_index_id, current_timestamp, Bid, BidStatistics, BidStatus, ErrorKind, Identity, Order,
	OrderStatus, Page, PageRequest, StorageKey, SUPERSEDED_REASON,
};
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur in the bid ledger.
#[derive(Debug, Error)]
pub enum BidError {
	#[error("Order not found: {0}")]
	OrderNotFound(String),
	#[error("Bid not found: {0}")]
	BidNotFound(String),
	#[error("Factory {factory_id} already has a live bid on order {order_id}")]
	DuplicateBid { order_id: String, factory_id: String },
	#[error("Order {order_id} is {status} and no longer open for bids; refresh and retry")]
	OrderNotBiddable { order_id: String, status: OrderStatus },
	#[error("Bid {bid_id} is already {status}")]
	BidNotPending { bid_id: String, status: BidStatus },
	#[error(transparent)]
	Unauthorized(#[from] AccessDenied),
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	#[error("Bids changed concurrently {0} times; refresh and retry")]
	Contended(u32),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

impl BidError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			BidError::OrderNotFound(_) | BidError::BidNotFound(_) => ErrorKind::NotFound,
			BidError::DuplicateBid { .. }
			| BidError::OrderNotBiddable { .. }
			| BidError::BidNotPending { .. }
			| BidError::Contended(_) => ErrorKind::Conflict,
			BidError::Unauthorized(_) => ErrorKind::Unauthorized,
			BidError::InvalidInput(_) => ErrorKind::InvalidInput,
			BidError::Storage(e) => storage_error_kind(e),
		}
	}

	/// Stable machine-readable code for API responses.
	pub fn code(&self) -> &'static str {
		match self {
			BidError::OrderNotFound(_) => "ORDER_NOT_FOUND",
			BidError::BidNotFound(_) => "BID_NOT_FOUND",
			BidError::DuplicateBid { .. } => "DUPLICATE_BID",
			BidError::OrderNotBiddable { .. } => "ORDER_NOT_BIDDABLE",
			BidError::BidNotPending { .. } => "BID_NOT_PENDING",
			BidError::Unauthorized(_) => "UNAUTHORIZED",
			BidError::InvalidInput(_) => "INVALID_INPUT",
			BidError::Contended(_) => "CONTENDED",
			BidError::Storage(_) => "STORAGE_ERROR",
		}
	}
}

impl Contention for BidError {
	fn is_write_conflict(&self) -> bool {
		matches!(self, BidError::Storage(StorageError::Conflict(_)))
	}

	fn contended(attempts: u32) -> Self {
		BidError::Contended(attempts)
	}
}

/// Result of a successful acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidAcceptance {
	pub bid: Bid,
	pub order: Order,
	/// Ids of the pending bids rejected as superseded.
	pub superseded: Vec<String>,
}

fn validate_price(price: Option<Decimal>) -> Result<(), BidError> {
	if price.is_some_and(|p| p.is_sign_negative()) {
		return Err(BidError::InvalidInput("price cannot be negative".into()));
	}
	Ok(())
}

/// Owns bid records and the acceptance protocol.
pub struct BidLedger {
	storage: Arc<StorageService>,
	workflow: WorkflowConfig,
}

impl BidLedger {
	pub fn new(storage: Arc<StorageService>, workflow: WorkflowConfig) -> Self {
		Self { storage, workflow }
	}

	async fn load_order(&self, order_id: &str) -> Result<Snapshot<Order>, BidError> {
		match self
			.storage
			.try_snapshot::<Order>(StorageKey::Orders.as_str(), order_id)
			.await?
		{
			Some(snapshot) if !snapshot.value.deleted => Ok(snapshot),
			_ => Err(BidError::OrderNotFound(order_id.to_string())),
		}
	}

	async fn load_bid(&self, bid_id: &str) -> Result<Snapshot<Bid>, BidError> {
		match self
			.storage
			.try_snapshot::<Bid>(StorageKey::Bids.as_str(), bid_id)
			.await?
		{
			Some(snapshot) if !snapshot.value.deleted => Ok(snapshot),
			_ => Err(BidError::BidNotFound(bid_id.to_string())),
		}
	}

	/// Places a pending bid from `factory_id` on a published order.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), factory = %factory_id))]
	pub async fn submit_bid(
		&self,
		identity: &Identity,
		order_id: &str,
		factory_id: &str,
		price: Option<Decimal>,
	) -> Result<Bid, BidError> {
		ensure(identity, Action::SubmitBid, factory_id)?;
		validate_price(price)?;

		retry_on_conflict(self.workflow.max_conflict_retries, || {
			self.try_submit(order_id, factory_id, price)
		})
		.await
	}

	async fn try_submit(
		&self,
		order_id: &str,
		factory_id: &str,
		price: Option<Decimal>,
	) -> Result<Bid, BidError> {
		let order_snapshot = self.load_order(order_id).await?;
		let mut order = order_snapshot.value.clone();
		if order.status != OrderStatus::Published {
			return Err(BidError::OrderNotBiddable {
				order_id: order.id,
				status: order.status,
			});
		}

		let index_id = bid_index_id(order_id, factory_id);
		let index = self
			.storage
			.try_snapshot::<String>(StorageKey::BidIndex.as_str(), &index_id)
			.await?;
		if let Some(index) = &index {
			let previous = self
				.storage
				.try_snapshot::<Bid>(StorageKey::Bids.as_str(), &index.value)
				.await?;
			if previous.is_some_and(|bid| bid.value.is_live()) {
				tracing::warn!("Rejected duplicate bid");
				return Err(BidError::DuplicateBid {
					order_id: order_id.to_string(),
					factory_id: factory_id.to_string(),
				});
			}
		}

		let now = current_timestamp();
		let bid = Bid {
			id: uuid::Uuid::new_v4().to_string(),
			order_id: order_id.to_string(),
			factory_id: factory_id.to_string(),
			status: BidStatus::Pending,
			price,
			submitted_at: now,
			accepted_at: None,
			accepted_by: None,
			decided_at: None,
			rejection_reason: None,
			created_at: now,
			updated_at: now,
			deleted: false,
		};
		order.bid_count += 1;
		order.updated_at = now;

		let mut tx = Transaction::new();
		tx.insert(StorageKey::Bids.as_str(), &bid.id, &bid)?;
		tx.upsert(
			StorageKey::BidIndex.as_str(),
			&index_id,
			index.as_ref(),
			&bid.id,
		)?;
		tx.replace(&order_snapshot, &order)?;
		self.storage.commit(tx).await?;

		tracing::info!(bid_id = %truncate_id(&bid.id), "Bid submitted");
		Ok(bid)
	}

	/// Accepts a pending bid, superseding every other pending bid on the order.
	#[instrument(skip_all, fields(bid_id = %truncate_id(bid_id)))]
	pub async fn accept_bid(
		&self,
		bid_id: &str,
		identity: &Identity,
	) -> Result<BidAcceptance, BidError> {
		retry_on_conflict(self.workflow.max_conflict_retries, || {
			self.try_accept(bid_id, identity)
		})
		.await
	}

	async fn try_accept(&self, bid_id: &str, identity: &Identity) -> Result<BidAcceptance, BidError> {
		let bid_snapshot = self.load_bid(bid_id).await?;
		let order_snapshot = self.load_order(&bid_snapshot.value.order_id).await?;
		let mut bid = bid_snapshot.value.clone();
		let mut order = order_snapshot.value.clone();
		ensure(identity, Action::DecideBid, &order.designer_id)?;

		if bid.status == BidStatus::Accepted {
			return Err(BidError::BidNotPending {
				bid_id: bid.id,
				status: bid.status,
			});
		}
		if order.status != OrderStatus::Published
			|| !is_valid_transition(order.status, OrderStatus::Accepted)
		{
			tracing::warn!(order_id = %truncate_id(&order.id), status = %order.status, "Order no longer accepting bids");
			return Err(BidError::OrderNotBiddable {
				order_id: order.id,
				status: order.status,
			});
		}
		if bid.status != BidStatus::Pending {
			return Err(BidError::BidNotPending {
				bid_id: bid.id,
				status: bid.status,
			});
		}

		let competitors: Vec<Snapshot<Bid>> = self
			.storage
			.scan_snapshots::<Bid>(StorageKey::Bids.as_str())
			.await?
			.into_iter()
			.filter(|s| {
				s.value.order_id == order.id
					&& s.value.id != bid.id
					&& !s.value.deleted
					&& s.value.status == BidStatus::Pending
			})
			.collect();

		let now = current_timestamp();
		bid.status = BidStatus::Accepted;
		bid.accepted_at = Some(now);
		bid.accepted_by = Some(identity.user_id.clone());
		bid.decided_at = Some(now);
		bid.updated_at = now;

		order.status = OrderStatus::Accepted;
		order.assigned_factory = Some(bid.factory_id.clone());
		order.updated_at = now;

		let mut tx = Transaction::new();
		tx.replace(&order_snapshot, &order)?;
		tx.replace(&bid_snapshot, &bid)?;
		let mut superseded = Vec::with_capacity(competitors.len());
		for competitor in &competitors {
			let mut rejected = competitor.value.clone();
			rejected.status = BidStatus::Rejected;
			rejected.rejection_reason = Some(SUPERSEDED_REASON.to_string());
			rejected.decided_at = Some(now);
			rejected.updated_at = now;
			tx.replace(competitor, &rejected)?;
			superseded.push(rejected.id);
		}
		self.storage.commit(tx).await?;

		tracing::info!(
			order_id = %truncate_id(&order.id),
			factory = %bid.factory_id,
			superseded = superseded.len(),
			"Bid accepted"
		);
		Ok(BidAcceptance {
			bid,
			order,
			superseded,
		})
	}

	/// Rejects a pending bid without touching its order.
	#[instrument(skip_all, fields(bid_id = %truncate_id(bid_id)))]
	pub async fn reject_bid(
		&self,
		bid_id: &str,
		identity: &Identity,
		reason: Option<String>,
	) -> Result<Bid, BidError> {
		retry_on_conflict(self.workflow.max_conflict_retries, || {
			self.try_reject(bid_id, identity, reason.as_deref())
		})
		.await
	}

	async fn try_reject(
		&self,
		bid_id: &str,
		identity: &Identity,
		reason: Option<&str>,
	) -> Result<Bid, BidError> {
		let snapshot = self.load_bid(bid_id).await?;
		let order = self.load_order(&snapshot.value.order_id).await?;
		ensure(identity, Action::DecideBid, &order.value.designer_id)?;

		let mut bid = snapshot.value.clone();
		if bid.status != BidStatus::Pending {
			return Err(BidError::BidNotPending {
				bid_id: bid.id,
				status: bid.status,
			});
		}

		let now = current_timestamp();
		bid.status = BidStatus::Rejected;
		bid.rejection_reason = reason.map(str::to_string);
		bid.decided_at = Some(now);
		bid.updated_at = now;

		let mut tx = Transaction::new();
		tx.replace(&snapshot, &bid)?;
		self.storage.commit(tx).await?;

		tracing::info!("Bid rejected");
		Ok(bid)
	}

	/// Lets the owning factory take back a pending bid.
	#[instrument(skip_all, fields(bid_id = %truncate_id(bid_id)))]
	pub async fn withdraw_bid(&self, bid_id: &str, identity: &Identity) -> Result<Bid, BidError> {
		retry_on_conflict(self.workflow.max_conflict_retries, || async move {
			let snapshot = self.load_bid(bid_id).await?;
			let mut bid = snapshot.value.clone();
			ensure(identity, Action::WithdrawBid, &bid.factory_id)?;
			if bid.status != BidStatus::Pending {
				return Err(BidError::BidNotPending {
					bid_id: bid.id,
					status: bid.status,
				});
			}

			bid.deleted = true;
			bid.updated_at = current_timestamp();
			let mut tx = Transaction::new();
			tx.replace(&snapshot, &bid)?;
			self.storage.commit(tx).await?;

			tracing::info!("Bid withdrawn");
			Ok(bid)
		})
		.await
	}

	/// Changes the price of a pending bid while its order is still published.
	#[instrument(skip_all, fields(bid_id = %truncate_id(bid_id)))]
	pub async fn revise_bid(
		&self,
		bid_id: &str,
		identity: &Identity,
		price: Decimal,
	) -> Result<Bid, BidError> {
		validate_price(Some(price))?;
		retry_on_conflict(self.workflow.max_conflict_retries, || async move {
			let snapshot = self.load_bid(bid_id).await?;
			let mut bid = snapshot.value.clone();
			ensure(identity, Action::ReviseBid, &bid.factory_id)?;
			if bid.status != BidStatus::Pending {
				return Err(BidError::BidNotPending {
					bid_id: bid.id,
					status: bid.status,
				});
			}
			let order = self.load_order(&bid.order_id).await?;
			if order.value.status != OrderStatus::Published {
				return Err(BidError::OrderNotBiddable {
					order_id: order.value.id.clone(),
					status: order.value.status,
				});
			}

			bid.price = Some(price);
			bid.updated_at = current_timestamp();
			let mut tx = Transaction::new();
			tx.guard(&order);
			tx.replace(&snapshot, &bid)?;
			self.storage.commit(tx).await?;

			tracing::info!(price = %price, "Bid revised");
			Ok(bid)
		})
		.await
	}

	/// Fetches a bid that has not been withdrawn.
	pub async fn get_bid(&self, bid_id: &str) -> Result<Bid, BidError> {
		Ok(self.load_bid(bid_id).await?.value)
	}

	async fn live_records(&self) -> Result<Vec<Bid>, BidError> {
		Ok(self
			.storage
			.scan::<Bid>(StorageKey::Bids.as_str())
			.await?
			.into_iter()
			.filter(|bid| !bid.deleted)
			.collect())
	}

	/// All bids on an order in submission order.
	pub async fn list_bids_for_order(&self, order_id: &str) -> Result<Vec<Bid>, BidError> {
		self.load_order(order_id).await?;
		let mut bids: Vec<Bid> = self
			.live_records()
			.await?
			.into_iter()
			.filter(|bid| bid.order_id == order_id)
			.collect();
		bids.sort_by(|a, b| {
			a.submitted_at
				.cmp(&b.submitted_at)
				.then_with(|| a.id.cmp(&b.id))
		});
		Ok(bids)
	}

	/// A factory's bids, newest first.
	pub async fn list_bids_for_factory(
		&self,
		factory_id: &str,
		page: PageRequest,
	) -> Result<Page<Bid>, BidError> {
		let page = normalize_page(page, &self.workflow).map_err(BidError::InvalidInput)?;
		let mut bids: Vec<Bid> = self
			.live_records()
			.await?
			.into_iter()
			.filter(|bid| bid.factory_id == factory_id)
			.collect();
		bids.sort_by(|a, b| newest_first((a.submitted_at, &a.id), (b.submitted_at, &b.id)));
		Ok(Page::from_sorted(bids, page))
	}

	/// Counts a factory's bids per status.
	pub async fn statistics(&self, factory_id: &str) -> Result<BidStatistics, BidError> {
		let mut stats = BidStatistics::default();
		for bid in self.live_records().await? {
			if bid.factory_id == factory_id {
				stats.record(bid.status);
			}
		}
		Ok(stats)
	}
}
