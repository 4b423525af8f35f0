//! Order endpoints: creation, editing, lifecycle moves and listings.

use super::{api_error, Caller, PageQuery};
use crate::server::AppState;
use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::Json,
};
use serde::Deserialize;
use tailor_types::{
	APIError, NewOrder, Order, OrderStatistics, OrderStatus, OrderUpdate, Page,
};
use tracing::info;

/// Body of `POST /api/orders/{id}/transition`.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
	pub status: OrderStatus,
}

/// Query of `GET /api/designers/{id}/orders`.
#[derive(Debug, Default, Deserialize)]
pub struct DesignerOrdersQuery {
	pub status: Option<OrderStatus>,
	pub page: Option<u32>,
	pub page_size: Option<u32>,
}

/// Query of `GET /api/marketplace`.
#[derive(Debug, Default, Deserialize)]
pub struct MarketplaceQuery {
	pub keyword: Option<String>,
	pub page: Option<u32>,
	pub page_size: Option<u32>,
}

/// Handles POST /api/orders.
pub async fn create_order(
	State(state): State<AppState>,
	Caller(identity): Caller,
	Json(request): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), APIError> {
	let order = state
		.engine
		.orders()
		.create_order(&identity, request)
		.await
		.map_err(api_error)?;
	info!(order_id = %order.id, "Created order via API");
	Ok((StatusCode::CREATED, Json(order)))
}

/// Handles GET /api/orders/{id}.
pub async fn get_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	let order = state.engine.orders().get_order(&id).await.map_err(api_error)?;
	Ok(Json(order))
}

/// Handles PATCH /api/orders/{id}.
pub async fn update_order(
	State(state): State<AppState>,
	Caller(identity): Caller,
	Path(id): Path<String>,
	Json(update): Json<OrderUpdate>,
) -> Result<Json<Order>, APIError> {
	let order = state
		.engine
		.orders()
		.update_order(&id, &identity, update)
		.await
		.map_err(api_error)?;
	Ok(Json(order))
}

/// Handles POST /api/orders/{id}/transition.
pub async fn transition_order(
	State(state): State<AppState>,
	Caller(identity): Caller,
	Path(id): Path<String>,
	Json(request): Json<TransitionRequest>,
) -> Result<Json<Order>, APIError> {
	let order = state
		.engine
		.orders()
		.transition(&id, &identity, request.status)
		.await
		.map_err(api_error)?;
	Ok(Json(order))
}

/// Handles DELETE /api/orders/{id}.
pub async fn delete_order(
	State(state): State<AppState>,
	Caller(identity): Caller,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	let order = state
		.engine
		.orders()
		.delete_order(&id, &identity)
		.await
		.map_err(api_error)?;
	Ok(Json(order))
}

/// Handles GET /api/marketplace.
pub async fn list_marketplace(
	State(state): State<AppState>,
	Query(query): Query<MarketplaceQuery>,
) -> Result<Json<Page<Order>>, APIError> {
	let page = PageQuery::new(query.page, query.page_size)
		.to_request(&state.engine.config().workflow);
	let orders = state
		.engine
		.orders()
		.list_marketplace(query.keyword.as_deref(), page)
		.await
		.map_err(api_error)?;
	Ok(Json(orders))
}

/// Handles GET /api/designers/{id}/orders.
pub async fn list_designer_orders(
	State(state): State<AppState>,
	Path(designer_id): Path<String>,
	Query(query): Query<DesignerOrdersQuery>,
) -> Result<Json<Page<Order>>, APIError> {
	let page = PageQuery::new(query.page, query.page_size)
		.to_request(&state.engine.config().workflow);
	let orders = state
		.engine
		.orders()
		.list_by_designer(&designer_id, query.status, page)
		.await
		.map_err(api_error)?;
	Ok(Json(orders))
}

/// Handles GET /api/designers/{id}/statistics.
pub async fn designer_statistics(
	State(state): State<AppState>,
	Path(designer_id): Path<String>,
) -> Result<Json<OrderStatistics>, APIError> {
	let stats = state
		.engine
		.orders()
		.statistics(&designer_id)
		.await
		.map_err(api_error)?;
	Ok(Json(stats))
}

/// Handles GET /api/factories/{id}/orders.
pub async fn list_factory_orders(
	State(state): State<AppState>,
	Path(factory_id): Path<String>,
	Query(query): Query<PageQuery>,
) -> Result<Json<Page<Order>>, APIError> {
	let page = query.to_request(&state.engine.config().workflow);
	let orders = state
		.engine
		.orders()
		.list_by_factory(&factory_id, page)
		.await
		.map_err(api_error)?;
	Ok(Json(orders))
}
