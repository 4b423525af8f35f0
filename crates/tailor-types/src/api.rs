//! API types for the tailor HTTP API.
//!
//! Defines the error body returned by every endpoint and the mapping from
//! workflow error kinds to HTTP status codes.

use crate::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
	/// Suggested retry delay in seconds
	#[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
	pub retry_after: Option<u64>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed request or invalid input (400)
	BadRequest { error_type: String, message: String },
	/// Missing or unreadable identity headers (401)
	Unauthenticated { message: String },
	/// Identity not allowed to perform the action (403)
	Forbidden { error_type: String, message: String },
	/// Entity does not exist (404)
	NotFound { error_type: String, message: String },
	/// Duplicate, already decided, or lost race; the client should refresh (409)
	Conflict { error_type: String, message: String },
	/// Illegal state machine move (422)
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Storage unreachable with optional retry information (503)
	ServiceUnavailable {
		error_type: String,
		message: String,
		retry_after: Option<u64>,
	},
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	/// Builds the API error for a workflow error of the given kind.
	pub fn from_kind(kind: ErrorKind, error_type: impl Into<String>, message: String) -> Self {
		let error_type = error_type.into();
		match kind {
			ErrorKind::NotFound => APIError::NotFound { error_type, message },
			ErrorKind::Conflict => APIError::Conflict { error_type, message },
			ErrorKind::Unauthorized => APIError::Forbidden { error_type, message },
			ErrorKind::InvalidInput => APIError::BadRequest { error_type, message },
			ErrorKind::InvalidTransition => APIError::UnprocessableEntity {
				error_type,
				message,
				details: None,
			},
			ErrorKind::Infrastructure => APIError::ServiceUnavailable {
				error_type,
				message,
				retry_after: Some(5),
			},
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthenticated { .. } => 401,
			APIError::Forbidden { .. } => 403,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let plain = |error: &str, message: &str| ErrorResponse {
			error: error.to_string(),
			message: message.to_string(),
			details: None,
			retry_after: None,
		};

		match self {
			APIError::BadRequest { error_type, message }
			| APIError::Forbidden { error_type, message }
			| APIError::NotFound { error_type, message }
			| APIError::InternalServerError { error_type, message } => plain(error_type, message),
			APIError::Unauthenticated { message } => plain("UNAUTHENTICATED", message),
			APIError::Conflict { error_type, message } => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: Some(serde_json::json!({ "action": "refresh" })),
				retry_after: None,
			},
			APIError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: details.clone(),
				retry_after: None,
			},
			APIError::ServiceUnavailable {
				error_type,
				message,
				retry_after,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: None,
				retry_after: *retry_after,
			},
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::Unauthenticated { message } => write!(f, "Unauthenticated: {}", message),
			APIError::Forbidden { message, .. } => write!(f, "Forbidden: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			APIError::UnprocessableEntity { message, .. } => {
				write!(f, "Unprocessable Entity: {}", message)
			},
			APIError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status =
			StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
