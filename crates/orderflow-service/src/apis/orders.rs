//! Order endpoints: creation, listing, retrieval and cancellation.

use orderflow_core::{CancelError, CreateError, Engine, NewOrder};
use orderflow_core::state::OrderStateError;
use orderflow_types::{
	normalize_phone, ApiError, CancelOrderResponse, CreateOrderRequest, CreateOrderResponse,
	LineItem, Order, OrdersQuery, OrdersResponse,
};

/// Processes a `POST /api/orders` request.
pub async fn create(
	engine: &Engine,
	request: CreateOrderRequest,
) -> Result<CreateOrderResponse, ApiError> {
	let mut items = Vec::with_capacity(request.items.len());
	for item in &request.items {
		let name = item.display_name().ok_or_else(|| {
			ApiError::bad_request("bad_request", "Every item needs a name or fullName")
		})?;
		items.push(LineItem {
			name: name.to_string(),
			quantity: item.quantity,
			price: item.price,
		});
	}

	let order = engine
		.orders()
		.create_order(NewOrder {
			address: request.address,
			items,
			total: request.total,
			payment: request.payment,
			phone: request.phone.as_deref().and_then(normalize_phone),
			customer_name: request.customer_name,
			extra_phone: request.extra_phone,
			comment: request.comment,
			coins_used: request.coins_used.unwrap_or(0).max(0),
			created_at: request.date,
		})
		.await
		.map_err(map_create_error)?;

	Ok(CreateOrderResponse {
		success: true,
		order_id: order.id,
		status: order.status,
	})
}

/// Processes a `GET /api/orders` request.
pub async fn list(engine: &Engine, query: OrdersQuery) -> Result<OrdersResponse, ApiError> {
	let phone = query.phone.as_deref().and_then(normalize_phone);

	let mut orders: Vec<Order> = engine
		.state()
		.list_orders()
		.await
		.map_err(|e| ApiError::internal(e.to_string()))?
		.into_iter()
		.filter(|o| query.status.is_none_or(|s| o.status == s))
		.filter(|o| phone.as_deref().is_none_or(|p| o.phone.as_deref() == Some(p)))
		.collect();

	orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
	let total = orders.len();
	let orders = orders
		.into_iter()
		.skip(query.offset)
		.take(query.limit)
		.collect();

	Ok(OrdersResponse { orders, total })
}

/// Processes a `GET /api/orders/{id}` request.
pub async fn get(engine: &Engine, order_id: &str) -> Result<Order, ApiError> {
	engine.state().get_order(order_id).await.map_err(|e| match e {
		OrderStateError::OrderNotFound(id) => {
			ApiError::not_found("not_found", format!("Order {} not found", id))
		}
		other => ApiError::internal(other.to_string()),
	})
}

/// Processes a `PATCH /api/orders/{id}/cancel` request.
pub async fn cancel(engine: &Engine, order_id: &str) -> Result<CancelOrderResponse, ApiError> {
	let order = engine
		.orders()
		.cancel_order(order_id)
		.await
		.map_err(|e| match e {
			CancelError::NotFound(id) => {
				ApiError::not_found("not_found", format!("Order {} not found", id))
			}
			CancelError::WrongStatus => {
				ApiError::bad_request("wrong_status", "Only pending orders can be cancelled")
			}
			CancelError::WindowElapsed { window_seconds } => ApiError::bad_request(
				"window_elapsed",
				format!("The cancellation window of {}s has elapsed", window_seconds),
			),
			CancelError::Storage(e) => ApiError::internal(e),
		})?;

	Ok(CancelOrderResponse {
		success: true,
		status: order.status,
	})
}

fn map_create_error(error: CreateError) -> ApiError {
	match error {
		CreateError::BelowMinimum { minimum } => ApiError::bad_request(
			"min_total",
			format!("Minimum order total is {} UZS", minimum),
		),
		CreateError::DuplicateId => {
			ApiError::Conflict {
				error: "duplicate_id".into(),
				message: "An order with this id already exists".into(),
			}
		}
		CreateError::Storage(e) => ApiError::internal(e),
		other => ApiError::bad_request("bad_request", other.to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::apis::testing;
	use orderflow_types::{OrderItemRequest, OrderStatus, PaymentMethod};

	fn request(total: i64) -> CreateOrderRequest {
		CreateOrderRequest {
			items: vec![OrderItemRequest {
				name: None,
				full_name: Some("Burger".into()),
				quantity: 2,
				price: 27_500,
			}],
			address: "Main street 1".into(),
			total,
			date: None,
			phone: Some("998901234567".into()),
			customer_name: Some("Alex".into()),
			coins_used: None,
			payment: PaymentMethod::Cash,
			extra_phone: None,
			comment: None,
		}
	}

	#[tokio::test]
	async fn creates_and_fetches_an_order() {
		let (engine, _channel) = testing::engine();

		let created = create(&engine, request(55_000)).await.unwrap();
		assert!(created.success);
		assert_eq!(created.order_id, "0001");
		assert_eq!(created.status, OrderStatus::Pending);

		let fetched = get(&engine, "0001").await.unwrap();
		// fullName wins and the phone is normalized.
		assert_eq!(fetched.items[0].name, "Burger");
		assert_eq!(fetched.phone.as_deref(), Some("+998901234567"));
	}

	#[tokio::test]
	async fn below_minimum_totals_are_rejected() {
		let (engine, _channel) = testing::engine();
		let result = create(&engine, request(49_000)).await;
		assert!(matches!(
			result,
			Err(ApiError::BadRequest { error, .. }) if error == "min_total"
		));
	}

	#[tokio::test]
	async fn listing_filters_by_status_and_phone() {
		let (engine, _channel) = testing::engine();
		create(&engine, request(55_000)).await.unwrap();
		create(&engine, request(60_000)).await.unwrap();

		let all = list(
			&engine,
			OrdersQuery {
				status: None,
				phone: None,
				limit: 50,
				offset: 0,
			},
		)
		.await
		.unwrap();
		assert_eq!(all.total, 2);

		let pending = list(
			&engine,
			OrdersQuery {
				status: Some(OrderStatus::Pending),
				phone: Some("+998901234567".into()),
				limit: 50,
				offset: 0,
			},
		)
		.await
		.unwrap();
		assert_eq!(pending.total, 2);
		assert_eq!(pending.orders.len(), 2);
		// Newest first.
		assert_eq!(pending.orders[0].id, "0002");

		let done = list(
			&engine,
			OrdersQuery {
				status: Some(OrderStatus::Done),
				phone: None,
				limit: 50,
				offset: 0,
			},
		)
		.await
		.unwrap();
		assert_eq!(done.total, 0);
	}

	#[tokio::test]
	async fn cancel_maps_domain_rejections() {
		let (engine, _channel) = testing::engine();
		create(&engine, request(55_000)).await.unwrap();

		let cancelled = cancel(&engine, "0001").await.unwrap();
		assert_eq!(cancelled.status, OrderStatus::Cancelled);

		// Already cancelled: not pending any more.
		let result = cancel(&engine, "0001").await;
		assert!(matches!(
			result,
			Err(ApiError::BadRequest { error, .. }) if error == "wrong_status"
		));

		let result = cancel(&engine, "0404").await;
		assert!(matches!(result, Err(ApiError::NotFound { .. })));
	}
}
