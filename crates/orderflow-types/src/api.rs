//! API types for the ordering backend HTTP surface.
//!
//! This module defines the request and response types for the HTTP
//! endpoints, together with the structured error type that maps business
//! rejections to status codes and machine-readable error kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::order::{Order, OrderStatus, PaymentMethod};
use crate::otp::OtpMode;
use crate::user::Profile;

/// One position of an order creation request.
///
/// Some frontends send the product name under `fullName`, so both spellings
/// are accepted; at least one must be non-empty.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
	pub name: Option<String>,
	#[serde(rename = "fullName")]
	pub full_name: Option<String>,
	pub quantity: i64,
	pub price: i64,
}

impl OrderItemRequest {
	/// Returns the display name, preferring `fullName` over `name`.
	pub fn display_name(&self) -> Option<&str> {
		self.full_name
			.as_deref()
			.filter(|s| !s.trim().is_empty())
			.or(self.name.as_deref().filter(|s| !s.trim().is_empty()))
	}
}

/// Request body for `POST /api/orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
	pub items: Vec<OrderItemRequest>,
	pub address: String,
	pub total: i64,
	/// Optional client-side creation timestamp; the server clock is used
	/// when absent.
	pub date: Option<DateTime<Utc>>,
	pub phone: Option<String>,
	pub customer_name: Option<String>,
	pub coins_used: Option<i64>,
	#[serde(default)]
	pub payment: PaymentMethod,
	pub extra_phone: Option<String>,
	pub comment: Option<String>,
}

/// Response body for `POST /api/orders`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
	pub success: bool,
	#[serde(rename = "orderId")]
	pub order_id: String,
	pub status: OrderStatus,
}

/// Query parameters for `GET /api/orders`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrdersQuery {
	pub status: Option<OrderStatus>,
	pub phone: Option<String>,
	#[serde(default = "default_list_limit")]
	pub limit: usize,
	#[serde(default)]
	pub offset: usize,
}

fn default_list_limit() -> usize {
	50
}

/// Response body for `GET /api/orders`.
#[derive(Debug, Clone, Serialize)]
pub struct OrdersResponse {
	pub orders: Vec<Order>,
	/// Total matching records before pagination.
	pub total: usize,
}

/// Response body for `PATCH /api/orders/{id}/cancel`.
#[derive(Debug, Clone, Serialize)]
pub struct CancelOrderResponse {
	pub success: bool,
	pub status: OrderStatus,
}

/// Request body for `POST /api/otp/send`.
#[derive(Debug, Clone, Deserialize)]
pub struct OtpSendRequest {
	pub phone: String,
	#[serde(default)]
	pub mode: OtpMode,
}

/// Response body for `POST /api/otp/send`.
#[derive(Debug, Clone, Serialize)]
pub struct OtpSendResponse {
	pub success: bool,
	pub message: String,
}

/// Request body for `POST /api/otp/verify`.
#[derive(Debug, Clone, Deserialize)]
pub struct OtpVerifyRequest {
	pub phone: String,
	pub code: String,
	#[serde(default)]
	pub mode: OtpMode,
}

/// Response body for `POST /api/otp/verify`.
#[derive(Debug, Clone, Serialize)]
pub struct OtpVerifyResponse {
	pub success: bool,
	pub phone: String,
	pub user: Profile,
	pub mode: OtpMode,
}

/// Request body for `POST /api/users/profile`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileSaveRequest {
	pub phone: String,
	#[serde(rename = "firstName")]
	pub first_name: String,
	#[serde(rename = "lastName", default)]
	pub last_name: String,
}

/// Response body for `POST /api/users/profile`.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSaveResponse {
	pub success: bool,
	pub user: Profile,
}

/// Query parameter carrying a phone number.
#[derive(Debug, Clone, Deserialize)]
pub struct PhoneQuery {
	pub phone: String,
}

/// Response body for `GET /api/check-phone`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckPhoneResponse {
	pub exists: bool,
}

/// Response body for `GET /api/coins`.
#[derive(Debug, Clone, Serialize)]
pub struct CoinsResponse {
	pub phone: String,
	pub balance: i64,
	/// Cash equivalent of the balance.
	pub sum_value: i64,
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
	pub ok: bool,
	pub time: DateTime<Utc>,
}

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine-readable error kind.
	pub error: String,
	/// Human-readable description.
	pub message: String,
	/// Additional error context.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
	/// Suggested retry delay in seconds.
	#[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
	pub retry_after: Option<u64>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum ApiError {
	/// Malformed or invalid input (400).
	BadRequest { error: String, message: String },
	/// Referenced entity is absent (404).
	NotFound { error: String, message: String },
	/// State-dependent rejection such as a duplicate id (409).
	Conflict { error: String, message: String },
	/// Rate limited, with an optional retry hint (429).
	TooManyRequests {
		error: String,
		message: String,
		retry_after: Option<u64>,
	},
	/// Unexpected fault (500).
	Internal { error: String, message: String },
}

impl ApiError {
	/// Convenience constructor for 400 responses.
	pub fn bad_request(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self::BadRequest {
			error: error.into(),
			message: message.into(),
		}
	}

	/// Convenience constructor for 404 responses.
	pub fn not_found(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self::NotFound {
			error: error.into(),
			message: message.into(),
		}
	}

	/// Convenience constructor for 500 responses.
	pub fn internal(message: impl Into<String>) -> Self {
		Self::Internal {
			error: "internal_error".into(),
			message: message.into(),
		}
	}

	/// Returns the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::BadRequest { .. } => 400,
			ApiError::NotFound { .. } => 404,
			ApiError::Conflict { .. } => 409,
			ApiError::TooManyRequests { .. } => 429,
			ApiError::Internal { .. } => 500,
		}
	}

	/// Converts to an [`ErrorResponse`] for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error, message, retry_after) = match self {
			ApiError::BadRequest { error, message }
			| ApiError::NotFound { error, message }
			| ApiError::Conflict { error, message }
			| ApiError::Internal { error, message } => (error, message, None),
			ApiError::TooManyRequests {
				error,
				message,
				retry_after,
			} => (error, message, *retry_after),
		};
		ErrorResponse {
			error: error.clone(),
			message: message.clone(),
			details: None,
			retry_after,
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let response = self.to_error_response();
		write!(f, "{} ({})", response.message, response.error)
	}
}

impl std::error::Error for ApiError {}

impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
