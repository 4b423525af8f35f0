//! Bid ("take order") records.
//!
//! A bid is one factory's offer to fulfill one order. At most one bid per
//! order is ever accepted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reason recorded on pending bids rejected by another bid's acceptance.
pub const SUPERSEDED_REASON: &str = "superseded";

/// A factory's offer to fulfill an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
	/// Unique identifier for this bid.
	pub id: String,
	/// Order the bid targets.
	pub order_id: String,
	/// Factory that submitted (and owns) the bid.
	pub factory_id: String,
	/// Current status of the bid.
	pub status: BidStatus,
	/// Price offered by the factory, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub price: Option<Decimal>,
	/// Timestamp when the bid was submitted.
	pub submitted_at: u64,
	/// Timestamp when the bid was accepted.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub accepted_at: Option<u64>,
	/// Identity that accepted the bid.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub accepted_by: Option<String>,
	/// Timestamp of the accept/reject decision.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub decided_at: Option<u64>,
	/// Reason given when the bid was rejected.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rejection_reason: Option<String>,
	pub created_at: u64,
	pub updated_at: u64,
	/// Tombstone marker set when the factory withdraws the bid.
	#[serde(default)]
	pub deleted: bool,
}

impl Bid {
	/// A live bid blocks further submissions for the same (order, factory).
	pub fn is_live(&self) -> bool {
		!self.deleted && self.status != BidStatus::Rejected
	}
}

/// Status of a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
	/// Awaiting the order owner's decision.
	Pending,
	/// Chosen by the order owner; binds the factory to the work.
	Accepted,
	/// Declined, either explicitly or because another bid was accepted.
	Rejected,
}

impl BidStatus {
	/// Returns the string representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			BidStatus::Pending => "pending",
			BidStatus::Accepted => "accepted",
			BidStatus::Rejected => "rejected",
		}
	}

	/// Returns an iterator over all statuses.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Pending, Self::Accepted, Self::Rejected].into_iter()
	}
}

impl fmt::Display for BidStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for BidStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| format!("unknown bid status '{}'", s))
	}
}

/// Bid counts per status for one factory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidStatistics {
	pub pending: u64,
	pub accepted: u64,
	pub rejected: u64,
	pub total: u64,
}

impl BidStatistics {
	/// Counts one bid in the bucket for its status.
	pub fn record(&mut self, status: BidStatus) {
		match status {
			BidStatus::Pending => self.pending += 1,
			BidStatus::Accepted => self.accepted += 1,
			BidStatus::Rejected => self.rejected += 1,
		}
		self.total += 1;
	}
}
