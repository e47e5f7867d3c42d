//! Order state machine implementation.
//!
//! Single authority for order persistence and status movement. Transition
//! checks and the status write run inside one read-modify-write sequence
//! under the orders collection lock, so a stale interface can never slip
//! an illegal move past a concurrent update.

use orderflow_storage::{StorageError, StorageService};
use orderflow_types::{Collection, Order, OrderStatus};
use std::sync::Arc;
use thiserror::Error;

/// Name of the sequence counter backing order id assignment.
const ORDER_SEQUENCE: &str = "orders";

/// Errors that can occur during order state management.
#[derive(Debug, Error)]
pub enum OrderStateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Invalid status transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Order not found: {0}")]
	OrderNotFound(String),
	#[error("Order id already taken: {0}")]
	DuplicateId(String),
}

/// Manages order state transitions and persistence.
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
}

impl OrderStateMachine {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Allocates the next order id, zero-padded for stable sorting.
	pub async fn next_order_id(&self) -> Result<String, OrderStateError> {
		let number = self
			.storage
			.next_sequence(ORDER_SEQUENCE)
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))?;
		Ok(format!("{:04}", number))
	}

	/// Gets an order by ID.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderStateError> {
		self.storage
			.retrieve(Collection::Orders, order_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => OrderStateError::OrderNotFound(order_id.to_string()),
				other => OrderStateError::Storage(other.to_string()),
			})
	}

	/// Stores a new order, rejecting duplicate ids.
	pub async fn store_order(&self, order: &Order) -> Result<(), OrderStateError> {
		self.storage
			.create(Collection::Orders, &order.id, order)
			.await
			.map_err(|e| match e {
				StorageError::Duplicate => OrderStateError::DuplicateId(order.id.clone()),
				other => OrderStateError::Storage(other.to_string()),
			})
	}

	/// Lists every stored order.
	pub async fn list_orders(&self) -> Result<Vec<Order>, OrderStateError> {
		self.storage
			.list(Collection::Orders)
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))
	}

	/// Updates an order with a closure and persists it.
	pub async fn update_order_with<F>(
		&self,
		order_id: &str,
		updater: F,
	) -> Result<Order, OrderStateError>
	where
		F: FnOnce(&mut Order),
	{
		self.storage
			.mutate::<Order, _, _>(Collection::Orders, order_id, |order| {
				updater(order);
				order.clone()
			})
			.await
			.map_err(|e| match e {
				StorageError::NotFound => OrderStateError::OrderNotFound(order_id.to_string()),
				other => OrderStateError::Storage(other.to_string()),
			})
	}

	/// Transitions an order to a new status with validation.
	///
	/// The legality check and the write happen atomically under the orders
	/// collection lock. On an illegal move the record is left unchanged and
	/// [`OrderStateError::InvalidTransition`] is returned.
	pub async fn transition_order_status(
		&self,
		order_id: &str,
		new_status: OrderStatus,
	) -> Result<Order, OrderStateError> {
		self.storage
			.mutate::<Order, _, _>(Collection::Orders, order_id, |order| {
				if !order.status.can_transition(new_status) {
					return Err(OrderStateError::InvalidTransition {
						from: order.status,
						to: new_status,
					});
				}
				order.status = new_status;
				Ok(order.clone())
			})
			.await
			.map_err(|e| match e {
				StorageError::NotFound => OrderStateError::OrderNotFound(order_id.to_string()),
				other => OrderStateError::Storage(other.to_string()),
			})?
	}

	/// Records the admin-message handle on an order.
	pub async fn set_message_ref(
		&self,
		order_id: &str,
		message_id: i64,
	) -> Result<Order, OrderStateError> {
		self.update_order_with(order_id, |order| {
			order.channel_message_id = Some(message_id);
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use orderflow_storage::implementations::memory::MemoryStorage;
	use orderflow_types::PaymentMethod;

	fn machine() -> OrderStateMachine {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		OrderStateMachine::new(storage)
	}

	fn order(id: &str, status: OrderStatus) -> Order {
		Order {
			id: id.into(),
			created_at: Utc::now(),
			address: "Main street 1".into(),
			items: vec![],
			total: 55_000,
			status,
			payment: PaymentMethod::Cash,
			phone: None,
			customer_name: None,
			extra_phone: None,
			comment: None,
			coins_used: 0,
			channel_message_id: None,
		}
	}

	#[tokio::test]
	async fn ids_are_zero_padded_and_monotonic() {
		let machine = machine();
		assert_eq!(machine.next_order_id().await.unwrap(), "0001");
		assert_eq!(machine.next_order_id().await.unwrap(), "0002");
	}

	#[tokio::test]
	async fn duplicate_ids_are_rejected() {
		let machine = machine();
		machine
			.store_order(&order("0001", OrderStatus::Pending))
			.await
			.unwrap();
		let result = machine.store_order(&order("0001", OrderStatus::Pending)).await;
		assert!(matches!(result, Err(OrderStateError::DuplicateId(id)) if id == "0001"));
	}

	#[tokio::test]
	async fn legal_transition_is_persisted() {
		let machine = machine();
		machine
			.store_order(&order("0001", OrderStatus::Pending))
			.await
			.unwrap();
		let updated = machine
			.transition_order_status("0001", OrderStatus::Confirmed)
			.await
			.unwrap();
		assert_eq!(updated.status, OrderStatus::Confirmed);

		let stored = machine.get_order("0001").await.unwrap();
		assert_eq!(stored.status, OrderStatus::Confirmed);
	}

	#[tokio::test]
	async fn illegal_transition_leaves_the_order_unchanged() {
		let machine = machine();
		machine
			.store_order(&order("0001", OrderStatus::Confirmed))
			.await
			.unwrap();
		let result = machine
			.transition_order_status("0001", OrderStatus::Pending)
			.await;
		assert!(matches!(
			result,
			Err(OrderStateError::InvalidTransition {
				from: OrderStatus::Confirmed,
				to: OrderStatus::Pending
			})
		));

		let stored = machine.get_order("0001").await.unwrap();
		assert_eq!(stored.status, OrderStatus::Confirmed);
	}

	#[tokio::test]
	async fn missing_order_reports_not_found() {
		let machine = machine();
		assert!(matches!(
			machine
				.transition_order_status("0404", OrderStatus::Confirmed)
				.await,
			Err(OrderStateError::OrderNotFound(id)) if id == "0404"
		));
	}

	#[tokio::test]
	async fn message_ref_is_recorded() {
		let machine = machine();
		machine
			.store_order(&order("0001", OrderStatus::Pending))
			.await
			.unwrap();
		let updated = machine.set_message_ref("0001", 77).await.unwrap();
		assert_eq!(updated.channel_message_id, Some(77));
	}
}
