//! Bid endpoints: submission, decisions and listings.

use super::{api_error, Caller, PageQuery};
use crate::server::AppState;
use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tailor_core::BidAcceptance;
use tailor_types::{APIError, Bid, BidStatistics, Page};
use tracing::info;

/// Body of `POST /api/orders/{id}/bids`.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitBidRequest {
	/// Factory the bid is placed for; defaults to the caller.
	#[serde(default)]
	pub factory_id: Option<String>,
	#[serde(default)]
	pub price: Option<Decimal>,
}

/// Body of `POST /api/bids/{id}/reject`.
#[derive(Debug, Default, Deserialize)]
pub struct RejectBidRequest {
	#[serde(default)]
	pub reason: Option<String>,
}

/// Body of `PATCH /api/bids/{id}`.
#[derive(Debug, Deserialize)]
pub struct ReviseBidRequest {
	pub price: Decimal,
}

/// Handles POST /api/orders/{id}/bids.
pub async fn submit_bid(
	State(state): State<AppState>,
	Caller(identity): Caller,
	Path(order_id): Path<String>,
	Json(request): Json<SubmitBidRequest>,
) -> Result<(StatusCode, Json<Bid>), APIError> {
	let factory_id = request
		.factory_id
		.unwrap_or_else(|| identity.user_id.clone());
	let bid = state
		.engine
		.bids()
		.submit_bid(&identity, &order_id, &factory_id, request.price)
		.await
		.map_err(api_error)?;
	info!(bid_id = %bid.id, order_id = %order_id, "Submitted bid via API");
	Ok((StatusCode::CREATED, Json(bid)))
}

/// Handles GET /api/orders/{id}/bids.
pub async fn list_order_bids(
	State(state): State<AppState>,
	Path(order_id): Path<String>,
) -> Result<Json<Vec<Bid>>, APIError> {
	let bids = state
		.engine
		.bids()
		.list_bids_for_order(&order_id)
		.await
		.map_err(api_error)?;
	Ok(Json(bids))
}

/// Handles GET /api/bids/{id}.
pub async fn get_bid(
	State(state): State<AppState>,
	Path(bid_id): Path<String>,
) -> Result<Json<Bid>, APIError> {
	let bid = state.engine.bids().get_bid(&bid_id).await.map_err(api_error)?;
	Ok(Json(bid))
}

/// Handles POST /api/bids/{id}/accept.
pub async fn accept_bid(
	State(state): State<AppState>,
	Caller(identity): Caller,
	Path(bid_id): Path<String>,
) -> Result<Json<BidAcceptance>, APIError> {
	let acceptance = state
		.engine
		.bids()
		.accept_bid(&bid_id, &identity)
		.await
		.map_err(api_error)?;
	Ok(Json(acceptance))
}

/// Handles POST /api/bids/{id}/reject.
pub async fn reject_bid(
	State(state): State<AppState>,
	Caller(identity): Caller,
	Path(bid_id): Path<String>,
	request: Option<Json<RejectBidRequest>>,
) -> Result<Json<Bid>, APIError> {
	let request = request.map(|Json(request)| request).unwrap_or_default();
	let bid = state
		.engine
		.bids()
		.reject_bid(&bid_id, &identity, request.reason)
		.await
		.map_err(api_error)?;
	Ok(Json(bid))
}

/// Handles POST /api/bids/{id}/withdraw.
pub async fn withdraw_bid(
	State(state): State<AppState>,
	Caller(identity): Caller,
	Path(bid_id): Path<String>,
) -> Result<Json<Bid>, APIError> {
	let bid = state
		.engine
		.bids()
		.withdraw_bid(&bid_id, &identity)
		.await
		.map_err(api_error)?;
	Ok(Json(bid))
}

/// Handles PATCH /api/bids/{id}.
pub async fn revise_bid(
	State(state): State<AppState>,
	Caller(identity): Caller,
	Path(bid_id): Path<String>,
	Json(request): Json<ReviseBidRequest>,
) -> Result<Json<Bid>, APIError> {
	let bid = state
		.engine
		.bids()
		.revise_bid(&bid_id, &identity, request.price)
		.await
		.map_err(api_error)?;
	Ok(Json(bid))
}

/// Handles GET /api/factories/{id}/bids.
pub async fn list_factory_bids(
	State(state): State<AppState>,
	Path(factory_id): Path<String>,
	Query(query): Query<PageQuery>,
) -> Result<Json<Page<Bid>>, APIError> {
	let page = query.to_request(&state.engine.config().workflow);
	let bids = state
		.engine
		.bids()
		.list_bids_for_factory(&factory_id, page)
		.await
		.map_err(api_error)?;
	Ok(Json(bids))
}

/// Handles GET /api/factories/{id}/bids/statistics.
pub async fn factory_bid_statistics(
	State(state): State<AppState>,
	Path(factory_id): Path<String>,
) -> Result<Json<BidStatistics>, APIError> {
	let stats = state
		.engine
		.bids()
		.statistics(&factory_id)
		.await
		.map_err(api_error)?;
	Ok(Json(stats))
}
