//! Progress ledger records.
//!
//! Entries are milestone reports filed by the factory assigned to an order.
//! Stage order is deliberately not enforced: a factory may report stages out
//! of sequence or skip ahead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One reported milestone of an accepted assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
	/// Unique identifier for this entry.
	pub id: String,
	/// Order the entry reports on (lookup only).
	pub order_id: String,
	/// Assigned factory that owns the entry.
	pub factory_id: String,
	/// Position of the entry within its order, in creation order.
	pub sequence: u64,
	pub stage: ProgressStage,
	pub status: ProgressStatus,
	#[serde(default)]
	pub description: String,
	/// Completion percentage (0-100).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub percentage: Option<u8>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub started_at: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub completed_at: Option<u64>,
	/// Ordered opaque references to image evidence.
	#[serde(default)]
	pub images: Vec<String>,
	/// Identity that filed the entry.
	pub creator_id: String,
	pub created_at: u64,
	pub updated_at: u64,
	#[serde(default)]
	pub deleted: bool,
}

/// Production phase a progress entry reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
	Design,
	Material,
	Production,
	Quality,
	Packaging,
	Shipping,
	Custom,
}

impl ProgressStage {
	pub fn as_str(&self) -> &'static str {
		match self {
			ProgressStage::Design => "design",
			ProgressStage::Material => "material",
			ProgressStage::Production => "production",
			ProgressStage::Quality => "quality",
			ProgressStage::Packaging => "packaging",
			ProgressStage::Shipping => "shipping",
			ProgressStage::Custom => "custom",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Design,
			Self::Material,
			Self::Production,
			Self::Quality,
			Self::Packaging,
			Self::Shipping,
			Self::Custom,
		]
		.into_iter()
	}
}

impl fmt::Display for ProgressStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ProgressStage {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|stage| stage.as_str() == s)
			.ok_or_else(|| format!("unknown progress stage '{}'", s))
	}
}

/// Status of a single progress entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
	NotStarted,
	InProgress,
	Completed,
	Delayed,
	OnHold,
}

impl ProgressStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			ProgressStatus::NotStarted => "not_started",
			ProgressStatus::InProgress => "in_progress",
			ProgressStatus::Completed => "completed",
			ProgressStatus::Delayed => "delayed",
			ProgressStatus::OnHold => "on_hold",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::NotStarted,
			Self::InProgress,
			Self::Completed,
			Self::Delayed,
			Self::OnHold,
		]
		.into_iter()
	}
}

impl fmt::Display for ProgressStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ProgressStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| format!("unknown progress status '{}'", s))
	}
}

/// Fields supplied by a factory when filing a progress entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProgressEntry {
	pub order_id: String,
	pub factory_id: String,
	pub stage: ProgressStage,
	pub status: ProgressStatus,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub percentage: Option<u8>,
	#[serde(default)]
	pub started_at: Option<u64>,
	#[serde(default)]
	pub completed_at: Option<u64>,
	#[serde(default)]
	pub images: Vec<String>,
}

/// Partial update of a progress entry.
///
/// `order_id`, when present, must match the entry's stored order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressUpdate {
	#[serde(default)]
	pub order_id: Option<String>,
	#[serde(default)]
	pub stage: Option<ProgressStage>,
	#[serde(default)]
	pub status: Option<ProgressStatus>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub percentage: Option<u8>,
	#[serde(default)]
	pub started_at: Option<u64>,
	#[serde(default)]
	pub completed_at: Option<u64>,
	#[serde(default)]
	pub images: Option<Vec<String>>,
}

/// Progress entry counts per status for one factory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStatistics {
	pub not_started: u64,
	pub in_progress: u64,
	pub completed: u64,
	pub delayed: u64,
	pub on_hold: u64,
	pub total: u64,
}

impl ProgressStatistics {
	pub fn record(&mut self, status: ProgressStatus) {
		match status {
			ProgressStatus::NotStarted => self.not_started += 1,
			ProgressStatus::InProgress => self.in_progress += 1,
			ProgressStatus::Completed => self.completed += 1,
			ProgressStatus::Delayed => self.delayed += 1,
			ProgressStatus::OnHold => self.on_hold += 1,
		}
		self.total += 1;
	}
}
