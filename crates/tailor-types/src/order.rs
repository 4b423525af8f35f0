//! Order records for the fulfillment workflow.
//!
//! An order is a unit of manufacturing work published by a designer. Its
//! status is advanced by the order store and by bid acceptance; the record is
//! never physically removed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Represents a unit of manufacturing work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier for this order.
	pub id: String,
	/// Short title shown in listings.
	pub title: String,
	/// Free-text description of the garment and the work.
	#[serde(default)]
	pub description: String,
	/// Number of pieces to manufacture.
	pub quantity: u32,
	/// Price per piece offered by the designer.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub unit_price: Option<Decimal>,
	/// Total price for the whole order.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub total_price: Option<Decimal>,
	/// Identifier of the designer who owns the order.
	pub designer_id: String,
	/// Factory bound to the work once a bid has been accepted.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub assigned_factory: Option<String>,
	/// Current status of the order.
	pub status: OrderStatus,
	/// Number of bids ever submitted against this order.
	#[serde(default)]
	pub bid_count: u32,
	/// Opaque file-store references attached by the designer.
	#[serde(default)]
	pub attachments: Vec<String>,
	/// Additional manufacturing requirements.
	#[serde(default)]
	pub special_requirements: String,
	/// Requested delivery date (UNIX seconds).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub delivery_date: Option<u64>,
	/// Timestamp when this order was created.
	pub created_at: u64,
	/// Timestamp when this order was last updated.
	pub updated_at: u64,
	/// Tombstone marker; deleted orders are hidden from every read.
	#[serde(default)]
	pub deleted: bool,
}

impl Order {
	/// Returns true when the status/assignment pairing is consistent.
	pub fn assignment_is_consistent(&self) -> bool {
		self.status.requires_assignment() == self.assigned_factory.is_some()
	}
}

/// Status of an order in the fulfillment workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Being prepared by the designer, not visible to factories.
	Draft,
	/// Open for bids.
	Published,
	/// A bid has been accepted and a factory is assigned.
	Accepted,
	/// The assigned factory has started production.
	InProgress,
	/// Work has been delivered.
	Completed,
	/// Withdrawn before completion.
	Cancelled,
}

impl OrderStatus {
	/// Returns the string representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Draft => "draft",
			OrderStatus::Published => "published",
			OrderStatus::Accepted => "accepted",
			OrderStatus::InProgress => "in_progress",
			OrderStatus::Completed => "completed",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Returns an iterator over all statuses.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Draft,
			Self::Published,
			Self::Accepted,
			Self::InProgress,
			Self::Completed,
			Self::Cancelled,
		]
		.into_iter()
	}

	/// Terminal statuses accept no further transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
	}

	/// Statuses in which the order must have an assigned factory.
	pub fn requires_assignment(&self) -> bool {
		matches!(
			self,
			OrderStatus::Accepted | OrderStatus::InProgress | OrderStatus::Completed
		)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| format!("unknown order status '{}'", s))
	}
}

/// Fields supplied by a designer when creating an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrder {
	pub title: String,
	#[serde(default)]
	pub description: String,
	pub quantity: u32,
	#[serde(default)]
	pub unit_price: Option<Decimal>,
	#[serde(default)]
	pub total_price: Option<Decimal>,
	#[serde(default)]
	pub attachments: Vec<String>,
	#[serde(default)]
	pub special_requirements: String,
	#[serde(default)]
	pub delivery_date: Option<u64>,
	/// Create directly in `published` instead of `draft`.
	#[serde(default)]
	pub publish: bool,
}

/// Partial edit of an order's descriptive fields.
///
/// Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderUpdate {
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub quantity: Option<u32>,
	#[serde(default)]
	pub unit_price: Option<Decimal>,
	#[serde(default)]
	pub total_price: Option<Decimal>,
	#[serde(default)]
	pub attachments: Option<Vec<String>>,
	#[serde(default)]
	pub special_requirements: Option<String>,
	#[serde(default)]
	pub delivery_date: Option<u64>,
}

/// Order counts per status for one designer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatistics {
	pub draft: u64,
	pub published: u64,
	pub accepted: u64,
	pub in_progress: u64,
	pub completed: u64,
	pub cancelled: u64,
	pub total: u64,
}

impl OrderStatistics {
	/// Counts one order in the bucket for its status.
	pub fn record(&mut self, status: OrderStatus) {
		match status {
			OrderStatus::Draft => self.draft += 1,
			OrderStatus::Published => self.published += 1,
			OrderStatus::Accepted => self.accepted += 1,
			OrderStatus::InProgress => self.in_progress += 1,
			OrderStatus::Completed => self.completed += 1,
			OrderStatus::Cancelled => self.cancelled += 1,
		}
		self.total += 1;
	}
}
