//! HTTP server for the tailor API.
//!
//! Every public workflow operation has one route under `/api`. Requests are
//! bounded by the configured timeout and body size, and CORS follows the
//! `[api.cors]` table when present.

use crate::apis::{bid, order, progress};
use axum::{
	extract::DefaultBodyLimit,
	http::{HeaderName, HeaderValue, Method},
	routing::{get, post},
	Router,
};
use std::sync::Arc;
use std::time::Duration;
use tailor_config::{ApiConfig, CorsConfig};
use tailor_core::WorkflowEngine;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
	timeout::TimeoutLayer,
	trace::TraceLayer,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Workflow engine serving every request.
	pub engine: Arc<WorkflowEngine>,
}

/// Builds the CORS layer from configuration; everything is allowed when no
/// `[api.cors]` table is given.
fn cors_layer(cors: Option<&CorsConfig>) -> CorsLayer {
	let Some(cors) = cors else {
		return CorsLayer::permissive();
	};

	let origins = if cors.allowed_origins.iter().any(|o| o == "*") {
		AllowOrigin::from(Any)
	} else {
		AllowOrigin::list(cors.allowed_origins.iter().filter_map(|origin| {
			HeaderValue::from_str(origin)
				.inspect_err(|_| tracing::warn!(origin = %origin, "Ignoring invalid CORS origin"))
				.ok()
		}))
	};
	let methods = if cors.allowed_methods.iter().any(|m| m == "*") {
		AllowMethods::from(Any)
	} else {
		AllowMethods::list(cors.allowed_methods.iter().filter_map(|method| {
			method
				.parse::<Method>()
				.inspect_err(|_| tracing::warn!(method = %method, "Ignoring invalid CORS method"))
				.ok()
		}))
	};
	let headers = if cors.allowed_headers.iter().any(|h| h == "*") {
		AllowHeaders::from(Any)
	} else {
		AllowHeaders::list(cors.allowed_headers.iter().filter_map(|header| {
			header
				.parse::<HeaderName>()
				.inspect_err(|_| tracing::warn!(header = %header, "Ignoring invalid CORS header"))
				.ok()
		}))
	};

	CorsLayer::new()
		.allow_origin(origins)
		.allow_methods(methods)
		.allow_headers(headers)
}

/// Builds the API router with its middleware stack.
pub fn router(engine: Arc<WorkflowEngine>, api_config: &ApiConfig) -> Router {
	let api = Router::new()
		.route("/orders", post(order::create_order))
		.route(
			"/orders/{id}",
			get(order::get_order)
				.patch(order::update_order)
				.delete(order::delete_order),
		)
		.route("/orders/{id}/transition", post(order::transition_order))
		.route(
			"/orders/{id}/bids",
			get(bid::list_order_bids).post(bid::submit_bid),
		)
		.route(
			"/orders/{id}/progress",
			get(progress::list_order_progress).post(progress::record_progress),
		)
		.route("/marketplace", get(order::list_marketplace))
		.route("/designers/{id}/orders", get(order::list_designer_orders))
		.route("/designers/{id}/statistics", get(order::designer_statistics))
		.route("/bids/{id}", get(bid::get_bid).patch(bid::revise_bid))
		.route("/bids/{id}/accept", post(bid::accept_bid))
		.route("/bids/{id}/reject", post(bid::reject_bid))
		.route("/bids/{id}/withdraw", post(bid::withdraw_bid))
		.route(
			"/progress/{id}",
			get(progress::get_progress)
				.patch(progress::update_progress)
				.delete(progress::delete_progress),
		)
		.route("/factories/{id}/orders", get(order::list_factory_orders))
		.route("/factories/{id}/bids", get(bid::list_factory_bids))
		.route(
			"/factories/{id}/bids/statistics",
			get(bid::factory_bid_statistics),
		)
		.route(
			"/factories/{id}/progress",
			get(progress::list_factory_progress),
		)
		.route(
			"/factories/{id}/progress/statistics",
			get(progress::factory_progress_statistics),
		);

	Router::new()
		.nest("/api", api)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(cors_layer(api_config.cors.as_ref()))
				.layer(TimeoutLayer::new(Duration::from_secs(
					api_config.timeout_seconds,
				)))
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(AppState { engine })
}

/// Starts the HTTP server for the API and serves until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<WorkflowEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Tailor API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}
