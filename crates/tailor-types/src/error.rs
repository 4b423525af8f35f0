//! Error classification for workflow failures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse category of a workflow error.
///
/// Every component error reports one of these so the request boundary can tell
/// a client mistake apart from a lost race without matching on each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// The order, bid or progress entry does not exist (or was tombstoned).
	NotFound,
	/// Duplicate bid, bid already decided, order not biddable, or a lost race.
	/// The caller should refresh and re-evaluate.
	Conflict,
	/// Identity, role or ownership mismatch.
	Unauthorized,
	/// Malformed or missing input.
	InvalidInput,
	/// Illegal state machine move.
	InvalidTransition,
	/// Persistence connectivity failure.
	Infrastructure,
}

impl ErrorKind {
	/// Stable machine-readable code for the category.
	pub fn code(&self) -> &'static str {
		match self {
			ErrorKind::NotFound => "NOT_FOUND",
			ErrorKind::Conflict => "CONFLICT",
			ErrorKind::Unauthorized => "UNAUTHORIZED",
			ErrorKind::InvalidInput => "INVALID_INPUT",
			ErrorKind::InvalidTransition => "INVALID_TRANSITION",
			ErrorKind::Infrastructure => "INFRASTRUCTURE",
		}
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.code())
	}
}
