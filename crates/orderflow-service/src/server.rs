//! HTTP server for the ordering backend API.
//!
//! This module provides a minimal HTTP server infrastructure: routing,
//! permissive CORS and thin handlers delegating to the `apis` modules.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::Json,
	routing::{get, patch, post},
	Router,
};
use chrono::Utc;
use orderflow_core::Engine;
use orderflow_config::ApiConfig;
use orderflow_types::{
	ApiError, CancelOrderResponse, CheckPhoneResponse, CoinsResponse, CreateOrderRequest,
	CreateOrderResponse, HealthResponse, Order, OrdersQuery, OrdersResponse, OtpSendRequest,
	OtpSendResponse, OtpVerifyRequest, OtpVerifyResponse, PhoneQuery, ProfileSaveRequest,
	ProfileSaveResponse,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::apis;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the engine for processing requests.
	pub engine: Arc<Engine>,
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<Engine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app_state = AppState { engine };

	let app = Router::new()
		.route("/health", get(handle_health))
		.nest(
			"/api",
			Router::new()
				.route("/check-phone", get(handle_check_phone))
				.route("/otp/send", post(handle_otp_send))
				.route("/otp/verify", post(handle_otp_verify))
				.route(
					"/users/profile",
					get(handle_profile_get).post(handle_profile_save),
				)
				.route("/orders", post(handle_order_create).get(handle_orders_list))
				.route("/orders/{id}", get(handle_order_get))
				.route("/orders/{id}/cancel", patch(handle_order_cancel))
				.route("/coins", get(handle_coins)),
		)
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(app_state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles GET /health requests.
async fn handle_health() -> Json<HealthResponse> {
	Json(HealthResponse {
		ok: true,
		time: Utc::now(),
	})
}

/// Handles GET /api/check-phone requests.
async fn handle_check_phone(
	State(state): State<AppState>,
	Query(query): Query<PhoneQuery>,
) -> Result<Json<CheckPhoneResponse>, ApiError> {
	apis::profile::check_phone(&state.engine, &query.phone)
		.await
		.map(Json)
}

/// Handles POST /api/otp/send requests.
async fn handle_otp_send(
	State(state): State<AppState>,
	Json(request): Json<OtpSendRequest>,
) -> Result<Json<OtpSendResponse>, ApiError> {
	apis::otp::send(&state.engine, request).await.map(Json)
}

/// Handles POST /api/otp/verify requests.
async fn handle_otp_verify(
	State(state): State<AppState>,
	Json(request): Json<OtpVerifyRequest>,
) -> Result<Json<OtpVerifyResponse>, ApiError> {
	apis::otp::verify(&state.engine, request).await.map(Json)
}

/// Handles GET /api/users/profile requests.
async fn handle_profile_get(
	State(state): State<AppState>,
	Query(query): Query<PhoneQuery>,
) -> Result<Json<orderflow_types::Profile>, ApiError> {
	apis::profile::get(&state.engine, &query.phone).await.map(Json)
}

/// Handles POST /api/users/profile requests.
async fn handle_profile_save(
	State(state): State<AppState>,
	Json(request): Json<ProfileSaveRequest>,
) -> Result<Json<ProfileSaveResponse>, ApiError> {
	apis::profile::save(&state.engine, request).await.map(Json)
}

/// Handles POST /api/orders requests.
async fn handle_order_create(
	State(state): State<AppState>,
	Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
	apis::orders::create(&state.engine, request)
		.await
		.map(|response| (StatusCode::CREATED, Json(response)))
}

/// Handles GET /api/orders requests.
async fn handle_orders_list(
	State(state): State<AppState>,
	Query(query): Query<OrdersQuery>,
) -> Result<Json<OrdersResponse>, ApiError> {
	apis::orders::list(&state.engine, query).await.map(Json)
}

/// Handles GET /api/orders/{id} requests.
async fn handle_order_get(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Order>, ApiError> {
	apis::orders::get(&state.engine, &id).await.map(Json)
}

/// Handles PATCH /api/orders/{id}/cancel requests.
async fn handle_order_cancel(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<CancelOrderResponse>, ApiError> {
	apis::orders::cancel(&state.engine, &id).await.map(Json)
}

/// Handles GET /api/coins requests.
async fn handle_coins(
	State(state): State<AppState>,
	Query(query): Query<PhoneQuery>,
) -> Result<Json<CoinsResponse>, ApiError> {
	apis::coins::balance(&state.engine, &query.phone).await.map(Json)
}
