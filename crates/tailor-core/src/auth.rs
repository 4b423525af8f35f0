//! Capability checks for workflow mutations.
//!
//! Every mutating operation in the order, bid and progress components asks
//! [`authorize`] whether the acting identity may perform an [`Action`] on a
//! resource owned by a given user. The rules live here and nowhere else.

use serde::{Deserialize, Serialize};
use std::fmt;
use tailor_types::{Identity, Role};
use thiserror::Error;

/// Operations that require a capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
	CreateOrder,
	EditOrder,
	PublishOrder,
	CancelOrder,
	DeleteOrder,
	/// Move an accepted order into production.
	StartProduction,
	CompleteOrder,
	SubmitBid,
	ReviseBid,
	WithdrawBid,
	/// Accept or reject a bid.
	DecideBid,
	RecordProgress,
	AmendProgress,
}

impl Action {
	pub fn as_str(&self) -> &'static str {
		match self {
			Action::CreateOrder => "create order",
			Action::EditOrder => "edit order",
			Action::PublishOrder => "publish order",
			Action::CancelOrder => "cancel order",
			Action::DeleteOrder => "delete order",
			Action::StartProduction => "start production",
			Action::CompleteOrder => "complete order",
			Action::SubmitBid => "submit bid",
			Action::ReviseBid => "revise bid",
			Action::WithdrawBid => "withdraw bid",
			Action::DecideBid => "decide bid",
			Action::RecordProgress => "record progress",
			Action::AmendProgress => "amend progress",
		}
	}

	/// Role whose members may perform this action on resources they own.
	fn owner_role(&self) -> Role {
		match self {
			Action::CreateOrder
			| Action::EditOrder
			| Action::PublishOrder
			| Action::CancelOrder
			| Action::DeleteOrder
			| Action::DecideBid => Role::Designer,
			Action::StartProduction
			| Action::CompleteOrder
			| Action::SubmitBid
			| Action::ReviseBid
			| Action::WithdrawBid
			| Action::RecordProgress
			| Action::AmendProgress => Role::Factory,
		}
	}

	/// Whether an admin may perform this action regardless of ownership.
	fn admin_may_override(&self) -> bool {
		match self {
			Action::EditOrder
			| Action::PublishOrder
			| Action::CancelOrder
			| Action::DeleteOrder
			| Action::DecideBid
			| Action::StartProduction
			| Action::CompleteOrder => true,
			// Orders are created for their designer, and bids and progress
			// belong to a factory; admins never act in either capacity.
			Action::CreateOrder
			| Action::SubmitBid
			| Action::ReviseBid
			| Action::WithdrawBid
			| Action::RecordProgress
			| Action::AmendProgress => false,
		}
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Returns whether `identity` may perform `action` on a resource owned by `owner_id`.
///
/// `owner_id` is the designer for order-side actions and the factory for
/// bid, progress and production actions.
pub fn authorize(identity: &Identity, action: Action, owner_id: &str) -> bool {
	if identity.role == Role::Admin {
		return action.admin_may_override();
	}
	identity.role == action.owner_role() && !owner_id.is_empty() && identity.user_id == owner_id
}

/// A failed capability check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{role} '{user_id}' is not allowed to {action}")]
pub struct AccessDenied {
	pub user_id: String,
	pub role: Role,
	pub action: Action,
}

/// [`authorize`] as a `Result`, for `?` in workflow code.
pub fn ensure(identity: &Identity, action: Action, owner_id: &str) -> Result<(), AccessDenied> {
	if authorize(identity, action, owner_id) {
		return Ok(());
	}
	tracing::warn!(
		user = %identity.user_id,
		role = %identity.role,
		action = %action,
		"Rejected unauthorized request"
	);
	Err(AccessDenied {
		user_id: identity.user_id.clone(),
		role: identity.role,
		action,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_designer_acts_only_on_own_orders() {
		let designer = Identity::designer("d-1");
		assert!(authorize(&designer, Action::PublishOrder, "d-1"));
		assert!(authorize(&designer, Action::DecideBid, "d-1"));
		assert!(!authorize(&designer, Action::PublishOrder, "d-2"));
		assert!(!authorize(&designer, Action::SubmitBid, "d-1"));
		assert!(!authorize(&designer, Action::StartProduction, "d-1"));
	}

	#[test]
	fn test_factory_acts_only_as_itself() {
		let factory = Identity::factory("f-1");
		assert!(authorize(&factory, Action::SubmitBid, "f-1"));
		assert!(authorize(&factory, Action::RecordProgress, "f-1"));
		assert!(authorize(&factory, Action::CompleteOrder, "f-1"));
		assert!(!authorize(&factory, Action::SubmitBid, "f-2"));
		assert!(!authorize(&factory, Action::DecideBid, "f-1"));
		assert!(!authorize(&factory, Action::CreateOrder, "f-1"));
	}

	#[test]
	fn test_admin_overrides_designer_side_but_never_acts_as_factory() {
		let admin = Identity::admin("root");
		assert!(authorize(&admin, Action::DecideBid, "d-1"));
		assert!(authorize(&admin, Action::CancelOrder, "d-1"));
		assert!(authorize(&admin, Action::StartProduction, "f-1"));
		assert!(!authorize(&admin, Action::SubmitBid, "root"));
		assert!(!authorize(&admin, Action::RecordProgress, "f-1"));
		assert!(!authorize(&admin, Action::CreateOrder, "root"));
	}

	#[test]
	fn test_empty_owner_never_matches() {
		let factory = Identity::factory("");
		assert!(!authorize(&factory, Action::StartProduction, ""));
	}

	#[test]
	fn test_denial_names_role_user_and_action() {
		let err = ensure(&Identity::factory("f-9"), Action::DecideBid, "d-1").unwrap_err();
		assert_eq!(err.to_string(), "factory 'f-9' is not allowed to decide bid");
	}
}
