//! Progress endpoints for the factory working on an accepted order.

use super::{api_error, Caller, PageQuery};
use crate::server::AppState;
use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::Json,
};
use serde::Deserialize;
use tailor_types::{
	APIError, NewProgressEntry, Page, ProgressEntry, ProgressStage, ProgressStatistics,
	ProgressStatus, ProgressUpdate,
};

/// Body of `POST /api/orders/{id}/progress`.
#[derive(Debug, Deserialize)]
pub struct RecordProgressRequest {
	/// Factory filing the entry; defaults to the caller.
	#[serde(default)]
	pub factory_id: Option<String>,
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

/// Query of `DELETE /api/progress/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteProgressQuery {
	pub order_id: Option<String>,
}

/// Handles POST /api/orders/{id}/progress.
pub async fn record_progress(
	State(state): State<AppState>,
	Caller(identity): Caller,
	Path(order_id): Path<String>,
	Json(request): Json<RecordProgressRequest>,
) -> Result<(StatusCode, Json<ProgressEntry>), APIError> {
	let entry = NewProgressEntry {
		order_id,
		factory_id: request
			.factory_id
			.unwrap_or_else(|| identity.user_id.clone()),
		stage: request.stage,
		status: request.status,
		description: request.description,
		percentage: request.percentage,
		started_at: request.started_at,
		completed_at: request.completed_at,
		images: request.images,
	};
	let entry = state
		.engine
		.progress()
		.create_entry(&identity, entry)
		.await
		.map_err(api_error)?;
	Ok((StatusCode::CREATED, Json(entry)))
}

/// Handles GET /api/orders/{id}/progress.
pub async fn list_order_progress(
	State(state): State<AppState>,
	Path(order_id): Path<String>,
) -> Result<Json<Vec<ProgressEntry>>, APIError> {
	let entries = state
		.engine
		.progress()
		.list_entries_for_order(&order_id)
		.await
		.map_err(api_error)?;
	Ok(Json(entries))
}

/// Handles GET /api/progress/{id}.
pub async fn get_progress(
	State(state): State<AppState>,
	Path(entry_id): Path<String>,
) -> Result<Json<ProgressEntry>, APIError> {
	let entry = state
		.engine
		.progress()
		.get_entry(&entry_id)
		.await
		.map_err(api_error)?;
	Ok(Json(entry))
}

/// Handles PATCH /api/progress/{id}.
pub async fn update_progress(
	State(state): State<AppState>,
	Caller(identity): Caller,
	Path(entry_id): Path<String>,
	Json(update): Json<ProgressUpdate>,
) -> Result<Json<ProgressEntry>, APIError> {
	let entry = state
		.engine
		.progress()
		.update_entry(&entry_id, &identity, update)
		.await
		.map_err(api_error)?;
	Ok(Json(entry))
}

/// Handles DELETE /api/progress/{id}.
pub async fn delete_progress(
	State(state): State<AppState>,
	Caller(identity): Caller,
	Path(entry_id): Path<String>,
	Query(query): Query<DeleteProgressQuery>,
) -> Result<StatusCode, APIError> {
	state
		.engine
		.progress()
		.delete_entry(&entry_id, &identity, query.order_id.as_deref())
		.await
		.map_err(api_error)?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles GET /api/factories/{id}/progress.
pub async fn list_factory_progress(
	State(state): State<AppState>,
	Path(factory_id): Path<String>,
	Query(query): Query<PageQuery>,
) -> Result<Json<Page<ProgressEntry>>, APIError> {
	let page = query.to_request(&state.engine.config().workflow);
	let entries = state
		.engine
		.progress()
		.list_entries_for_factory(&factory_id, page)
		.await
		.map_err(api_error)?;
	Ok(Json(entries))
}

/// Handles GET /api/factories/{id}/progress/statistics.
pub async fn factory_progress_statistics(
	State(state): State<AppState>,
	Path(factory_id): Path<String>,
) -> Result<Json<ProgressStatistics>, APIError> {
	let stats = state
		.engine
		.progress()
		.statistics(&factory_id)
		.await
		.map_err(api_error)?;
	Ok(Json(stats))
}
