//! Order lifecycle handler.
//!
//! Owns creation, cancellation and status movement of orders, including
//! the side-effect fan-out that accompanies every transition. The status
//! write is the durable fact; notification delivery is best-effort and a
//! failed send never rolls a transition back.

use crate::state::{OrderStateError, OrderStateMachine};
use chrono::{DateTime, Duration, Utc};
use orderflow_ledger::{LedgerError, LedgerService};
use orderflow_notify::{keyboard, render, NotificationService};
use orderflow_types::{ActorRole, LineItem, Order, OrderStatus, PaymentMethod};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during order creation.
#[derive(Debug, Error)]
pub enum CreateError {
	#[error("Order must contain at least one item")]
	EmptyItems,
	#[error("Every item needs a display name")]
	UnnamedItem,
	#[error("Item quantity must be positive")]
	BadQuantity,
	#[error("Item price must not be negative")]
	BadPrice,
	#[error("Minimum order total is {minimum}")]
	BelowMinimum { minimum: i64 },
	#[error("An order with this id already exists")]
	DuplicateId,
	#[error("Storage error: {0}")]
	Storage(String),
}

/// Errors that can occur during customer cancellation.
#[derive(Debug, Error)]
pub enum CancelError {
	#[error("Order not found: {0}")]
	NotFound(String),
	#[error("Only pending orders can be cancelled")]
	WrongStatus,
	#[error("The cancellation window of {window_seconds}s has elapsed")]
	WindowElapsed { window_seconds: u64 },
	#[error("Storage error: {0}")]
	Storage(String),
}

/// Errors that can occur during a status transition request.
#[derive(Debug, Error)]
pub enum TransitionError {
	#[error("Order not found: {0}")]
	NotFound(String),
	#[error("This role may not set status {0}")]
	Unauthorized(OrderStatus),
	#[error("Invalid status transition from {from} to {to}")]
	Invalid { from: OrderStatus, to: OrderStatus },
	#[error("Storage error: {0}")]
	Storage(String),
}

/// Validated input for order creation, already normalized by the caller.
#[derive(Debug, Clone)]
pub struct NewOrder {
	pub address: String,
	pub items: Vec<LineItem>,
	pub total: i64,
	pub payment: PaymentMethod,
	pub phone: Option<String>,
	pub customer_name: Option<String>,
	pub extra_phone: Option<String>,
	pub comment: Option<String>,
	pub coins_used: i64,
	/// Client-supplied creation instant; the server clock is used if absent.
	pub created_at: Option<DateTime<Utc>>,
}

/// Handler driving the order lifecycle.
pub struct OrderHandler {
	state: Arc<OrderStateMachine>,
	ledger: Arc<LedgerService>,
	notifier: Arc<NotificationService>,
	min_order_total: i64,
	cancel_window: Duration,
	announce_delay: std::time::Duration,
}

impl OrderHandler {
	/// Creates a new OrderHandler.
	pub fn new(
		state: Arc<OrderStateMachine>,
		ledger: Arc<LedgerService>,
		notifier: Arc<NotificationService>,
		min_order_total: i64,
		cancel_window_seconds: u64,
		announce_delay_seconds: u64,
	) -> Arc<Self> {
		Arc::new(Self {
			state,
			ledger,
			notifier,
			min_order_total,
			cancel_window: Duration::seconds(cancel_window_seconds as i64),
			announce_delay: std::time::Duration::from_secs(announce_delay_seconds),
		})
	}

	/// Creates a new order in `pending` state.
	///
	/// Requested coins are debited best-effort: an insufficient balance
	/// voids the discount silently instead of failing the order. The admin
	/// announcement is scheduled after the cancellation grace period.
	pub async fn create_order(&self, request: NewOrder) -> Result<Order, CreateError> {
		validate_request(&request, self.min_order_total)?;

		let id = self
			.state
			.next_order_id()
			.await
			.map_err(|e| CreateError::Storage(e.to_string()))?;

		let order = Order {
			id: id.clone(),
			created_at: request.created_at.unwrap_or_else(Utc::now),
			address: request.address,
			items: request.items,
			total: request.total,
			status: OrderStatus::Pending,
			payment: request.payment,
			phone: request.phone,
			customer_name: request.customer_name,
			extra_phone: request.extra_phone,
			comment: request.comment,
			coins_used: request.coins_used,
			channel_message_id: None,
		};

		self.state.store_order(&order).await.map_err(|e| match e {
			OrderStateError::DuplicateId(_) => CreateError::DuplicateId,
			other => CreateError::Storage(other.to_string()),
		})?;

		tracing::info!(order_id = %order.id, total = order.total, "Order created");

		// Coin discount is best-effort: the order already carries the
		// discounted total, a failed debit only voids the coin spend.
		if order.coins_used > 0 {
			if let Some(phone) = &order.phone {
				match self
					.ledger
					.debit_for_order(phone, order.coins_used, &order.id)
					.await
				{
					Ok(balance) => {
						tracing::info!(order_id = %order.id, balance, "Coins debited");
					}
					Err(LedgerError::InsufficientBalance { requested, available }) => {
						tracing::warn!(
							order_id = %order.id,
							requested,
							available,
							"Coin balance too low, discount voided"
						);
					}
					Err(e) => {
						tracing::error!(order_id = %order.id, error = %e, "Coin debit failed");
					}
				}
			}
		}

		// Announce to the admin only after the customer's self-service
		// cancellation window has passed.
		let state = self.state.clone();
		let notifier = self.notifier.clone();
		let order_id = order.id.clone();
		let delay = self.announce_delay;
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			announce(&state, &notifier, &order_id).await;
		});

		Ok(order)
	}

	/// Sends the admin announcement for an order unless it was cancelled.
	pub async fn announce_order(&self, order_id: &str) {
		announce(&self.state, &self.notifier, order_id).await;
	}

	/// Cancels a pending order within the cancellation window.
	pub async fn cancel_order(&self, order_id: &str) -> Result<Order, CancelError> {
		let order = self.state.get_order(order_id).await.map_err(|e| match e {
			OrderStateError::OrderNotFound(id) => CancelError::NotFound(id),
			other => CancelError::Storage(other.to_string()),
		})?;

		if order.status != OrderStatus::Pending {
			return Err(CancelError::WrongStatus);
		}
		if Utc::now() - order.created_at > self.cancel_window {
			return Err(CancelError::WindowElapsed {
				window_seconds: self.cancel_window.num_seconds() as u64,
			});
		}

		let updated = self
			.state
			.transition_order_status(order_id, OrderStatus::Cancelled)
			.await
			.map_err(|e| match e {
				OrderStateError::OrderNotFound(id) => CancelError::NotFound(id),
				// Raced with a concurrent transition away from pending.
				OrderStateError::InvalidTransition { .. } => CancelError::WrongStatus,
				other => CancelError::Storage(other.to_string()),
			})?;

		tracing::info!(order_id, "Order cancelled by customer");
		self.notifier
			.send_to_admin(&render::admin_cancelled(&updated), None)
			.await;

		Ok(updated)
	}

	/// Requests a status transition on behalf of an actor.
	///
	/// The role gate runs first, then the state machine validates the
	/// move. A self-transition is accepted as a no-op without firing any
	/// side effects. On success the new status is persisted before the
	/// notification fan-out starts.
	pub async fn apply_transition(
		&self,
		order_id: &str,
		new_status: OrderStatus,
		actor: ActorRole,
	) -> Result<Order, TransitionError> {
		if !actor.may_set(new_status) {
			return Err(TransitionError::Unauthorized(new_status));
		}

		let current = self.state.get_order(order_id).await.map_err(|e| match e {
			OrderStateError::OrderNotFound(id) => TransitionError::NotFound(id),
			other => TransitionError::Storage(other.to_string()),
		})?;
		if current.status == new_status {
			return Ok(current);
		}

		let updated = self
			.state
			.transition_order_status(order_id, new_status)
			.await
			.map_err(|e| match e {
				OrderStateError::OrderNotFound(id) => TransitionError::NotFound(id),
				OrderStateError::InvalidTransition { from, to } => {
					TransitionError::Invalid { from, to }
				}
				other => TransitionError::Storage(other.to_string()),
			})?;

		tracing::info!(order_id, status = %new_status, "Order status changed");
		self.fan_out(&updated).await;
		Ok(updated)
	}

	/// Fires the notifications accompanying a committed transition.
	///
	/// Delivery failures are contained inside the notification service;
	/// nothing here can undo the status change.
	async fn fan_out(&self, order: &Order) {
		// Keep the admin view of the order current.
		if let Some(message_id) = order.channel_message_id {
			self.notifier
				.edit_message(
					self.notifier.admin_chat_id(),
					message_id,
					&render::order_summary(order, "New order"),
					Some(&keyboard::admin_keyboard(order)),
				)
				.await;
		}

		match order.status {
			OrderStatus::Confirmed => {
				if let Some(phone) = &order.phone {
					self.notifier
						.send_to_customer(phone, &render::customer_confirmed(order), None)
						.await;
				}
			}
			OrderStatus::Ready => {
				self.notifier
					.send_to_courier(
						&render::order_summary(order, "Delivery"),
						Some(&keyboard::courier_keyboard(order)),
					)
					.await;
				if let Some(phone) = &order.phone {
					self.notifier
						.send_to_customer(phone, &render::customer_ready(order), None)
						.await;
				}
			}
			OrderStatus::Delivering => {
				if let Some(phone) = &order.phone {
					self.notifier
						.send_to_customer(phone, &render::customer_delivering(order), None)
						.await;
				}
				self.notifier
					.send_to_admin(&render::admin_delivering(&order.id), None)
					.await;
			}
			OrderStatus::Done => {
				self.complete_delivery(order).await;
				self.notifier
					.send_to_admin(&render::admin_delivered(&order.id), None)
					.await;
			}
			_ => {}
		}
	}

	/// Credits the cash-back and sends the delivery confirmation.
	async fn complete_delivery(&self, order: &Order) {
		let Some(phone) = &order.phone else {
			return;
		};

		let (earned, balance) = match self.ledger.credit_for_delivery(phone, order).await {
			Ok(outcome) => (outcome.earned, outcome.balance),
			Err(e) => {
				tracing::error!(order_id = %order.id, error = %e, "Cash-back credit failed");
				(0, 0)
			}
		};

		self.notifier
			.send_to_customer(
				phone,
				&render::customer_delivered(order, earned, balance),
				Some(&keyboard::review_keyboard(&order.id)),
			)
			.await;
	}
}

/// Announces an order to the admin unless it was cancelled meanwhile.
///
/// Re-reads the order first: a customer may have cancelled during the
/// grace period, in which case the admin never sees it. The returned
/// message id is recorded on the order for later re-renders.
async fn announce(
	state: &Arc<OrderStateMachine>,
	notifier: &Arc<NotificationService>,
	order_id: &str,
) {
	let order = match state.get_order(order_id).await {
		Ok(order) => order,
		Err(e) => {
			tracing::error!(order_id, error = %e, "Cannot announce order");
			return;
		}
	};
	if order.status == OrderStatus::Cancelled {
		tracing::debug!(order_id, "Order cancelled before announcement, skipping");
		return;
	}

	let text = render::order_summary(&order, "New order");
	let markup = keyboard::admin_keyboard(&order);
	if let Some(message_id) = notifier.send_to_admin(&text, Some(&markup)).await {
		if let Err(e) = state.set_message_ref(order_id, message_id).await {
			tracing::warn!(order_id, error = %e, "Failed to record message ref");
		}
	}
}

/// Checks the creation invariants before anything is persisted.
fn validate_request(request: &NewOrder, min_order_total: i64) -> Result<(), CreateError> {
	if request.items.is_empty() {
		return Err(CreateError::EmptyItems);
	}
	for item in &request.items {
		if item.name.trim().is_empty() {
			return Err(CreateError::UnnamedItem);
		}
		if item.quantity <= 0 {
			return Err(CreateError::BadQuantity);
		}
		if item.price < 0 {
			return Err(CreateError::BadPrice);
		}
	}
	if request.total < min_order_total {
		return Err(CreateError::BelowMinimum {
			minimum: min_order_total,
		});
	}
	Ok(())
}
