//! Authenticated identities.
//!
//! The identity provider sits outside this system; by the time a request
//! reaches the workflow its `(user_id, role)` pair has been verified and is
//! trusted as-is.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// Publishes orders and chooses which bid to accept.
	Designer,
	/// Bids on orders and reports production progress.
	Factory,
	/// Administrative operator.
	Admin,
}

impl Role {
	/// Returns the string representation of the role.
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Designer => "designer",
			Role::Factory => "factory",
			Role::Admin => "admin",
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"designer" => Ok(Self::Designer),
			"factory" => Ok(Self::Factory),
			"admin" => Ok(Self::Admin),
			other => Err(format!("unknown role '{}'", other)),
		}
	}
}

/// A verified `(user_id, role)` pair supplied per request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
	/// Identifier of the authenticated user.
	pub user_id: String,
	/// Role the user acts in.
	pub role: Role,
}

impl Identity {
	pub fn new(user_id: impl Into<String>, role: Role) -> Self {
		Self {
			user_id: user_id.into(),
			role,
		}
	}

	pub fn designer(user_id: impl Into<String>) -> Self {
		Self::new(user_id, Role::Designer)
	}

	pub fn factory(user_id: impl Into<String>) -> Self {
		Self::new(user_id, Role::Factory)
	}

	pub fn admin(user_id: impl Into<String>) -> Self {
		Self::new(user_id, Role::Admin)
	}
}

impl fmt::Display for Identity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.role, self.user_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_role_parsing_is_case_insensitive() {
		assert_eq!("Factory".parse::<Role>().unwrap(), Role::Factory);
		assert_eq!(" designer ".parse::<Role>().unwrap(), Role::Designer);
		assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
		assert!("customer".parse::<Role>().is_err());
	}
}
