//! HTTP handlers for the tailor API.
//!
//! Handlers translate requests into calls on the workflow engine and map
//! workflow errors onto `APIError` by their kind. The caller's identity comes
//! from headers set by the authenticating proxy in front of the service.

pub mod bid;
pub mod order;
pub mod progress;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Deserialize;
use std::fmt::Display;
use tailor_config::WorkflowConfig;
use tailor_core::{BidError, OrderStoreError, ProgressError};
use tailor_types::{APIError, ErrorKind, Identity, PageRequest, Role};

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Identity of the caller, read from the proxy headers.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl<S> FromRequestParts<S> for Caller
where
	S: Send + Sync,
{
	type Rejection = APIError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let header = |name: &str| {
			parts
				.headers
				.get(name)
				.and_then(|value| value.to_str().ok())
				.map(str::trim)
				.filter(|value| !value.is_empty())
				.ok_or_else(|| APIError::Unauthenticated {
					message: format!("missing or unreadable {} header", name),
				})
		};

		let user_id = header(USER_ID_HEADER)?;
		let role = header(USER_ROLE_HEADER)?
			.parse::<Role>()
			.map_err(|message| APIError::Unauthenticated { message })?;
		Ok(Caller(Identity::new(user_id, role)))
	}
}

/// Optional paging parameters of listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
	pub page: Option<u32>,
	pub page_size: Option<u32>,
}

impl PageQuery {
	pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
		Self { page, page_size }
	}

	/// Fills missing values from the workflow defaults. Zero values are passed
	/// through so the workflow can reject them.
	pub fn to_request(&self, workflow: &WorkflowConfig) -> PageRequest {
		PageRequest::new(
			self.page.unwrap_or(1),
			self.page_size.unwrap_or(workflow.default_page_size),
		)
	}
}

/// Workflow errors that know their kind and stable code.
pub trait WorkflowFailure: Display {
	fn kind(&self) -> ErrorKind;
	fn code(&self) -> &'static str;
}

macro_rules! impl_workflow_failure {
	($($error:ty),* $(,)?) => {
		$(
			impl WorkflowFailure for $error {
				fn kind(&self) -> ErrorKind {
					<$error>::kind(self)
				}

				fn code(&self) -> &'static str {
					<$error>::code(self)
				}
			}
		)*
	};
}

impl_workflow_failure!(OrderStoreError, BidError, ProgressError);

/// Maps a workflow error to its HTTP representation.
pub fn api_error<E: WorkflowFailure>(error: E) -> APIError {
	let kind = error.kind();
	match kind {
		ErrorKind::Infrastructure => tracing::error!(error = %error, "Request failed"),
		_ => tracing::debug!(error = %error, kind = %kind, "Request refused"),
	}
	APIError::from_kind(kind, error.code(), error.to_string())
}
