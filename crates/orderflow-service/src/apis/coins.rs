//! Coin balance endpoint.

use orderflow_core::Engine;
use orderflow_types::{normalize_phone, ApiError, CoinsResponse, COIN_VALUE};

/// Processes a `GET /api/coins` request.
pub async fn balance(engine: &Engine, phone: &str) -> Result<CoinsResponse, ApiError> {
	let phone = normalize_phone(phone)
		.ok_or_else(|| ApiError::bad_request("bad_request", "phone required"))?;

	let balance = engine
		.ledger()
		.balance(&phone)
		.await
		.map_err(|e| ApiError::internal(e.to_string()))?;

	Ok(CoinsResponse {
		phone,
		balance,
		sum_value: balance * COIN_VALUE,
	})
}
