//! Order types for the ordering backend.
//!
//! This module defines the central order entity, its line items and the
//! status state machine that governs the delivery lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ledger::COIN_VALUE;

/// A single customer purchase request tracked through the delivery lifecycle.
///
/// Orders are created once and then mutated only through status transitions
/// and the admin-message reference update. They are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier, a zero-padded monotonically assigned sequence number.
	pub id: String,
	/// Timestamp when this order was created. Immutable once set.
	pub created_at: DateTime<Utc>,
	/// Delivery address.
	pub address: String,
	/// Ordered line items.
	pub items: Vec<LineItem>,
	/// Total after the coin discount was applied.
	pub total: i64,
	/// Current status of the order.
	pub status: OrderStatus,
	/// Payment method chosen by the customer.
	#[serde(default)]
	pub payment: PaymentMethod,
	/// Customer phone in `+`-prefixed form, if known.
	pub phone: Option<String>,
	/// Customer display name, if known.
	pub customer_name: Option<String>,
	/// Secondary contact phone.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub extra_phone: Option<String>,
	/// Free-text note from the customer.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub comment: Option<String>,
	/// Loyalty coins the customer asked to spend on this order.
	#[serde(default)]
	pub coins_used: i64,
	/// Handle of the admin-facing announcement message, for later edits.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub channel_message_id: Option<i64>,
}

impl Order {
	/// Returns the total before the coin discount was applied.
	///
	/// Cash-back is computed against this amount so that spending coins
	/// does not shrink the reward for the order.
	pub fn pre_discount_total(&self) -> i64 {
		self.total + self.coins_used * COIN_VALUE
	}
}

/// One position of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
	/// Display name of the product.
	pub name: String,
	/// Ordered quantity, always positive.
	pub quantity: i64,
	/// Unit price, never negative.
	pub price: i64,
}

impl LineItem {
	/// Returns the line total (`price * quantity`).
	pub fn line_total(&self) -> i64 {
		self.price * self.quantity
	}
}

/// Payment method for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
	/// Cash on delivery.
	#[default]
	Cash,
	/// Card payment.
	Card,
}

/// Lifecycle stage of an order.
///
/// Orders move along the linear flow
/// `pending -> confirmed -> cooking -> ready -> delivering -> done`;
/// cancellation is reachable from `pending` only. `done` and `cancelled`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	/// Order has been placed and awaits confirmation.
	Pending,
	/// Order has been accepted by the kitchen.
	Confirmed,
	/// Order is being prepared.
	Cooking,
	/// Order is packed and waiting for a courier.
	Ready,
	/// A courier is on the way to the customer.
	Delivering,
	/// Order has been delivered.
	Done,
	/// Order was cancelled while still pending.
	Cancelled,
}

impl OrderStatus {
	/// Position in the linear flow, `None` for `cancelled`.
	fn rank(self) -> Option<u8> {
		match self {
			OrderStatus::Pending => Some(0),
			OrderStatus::Confirmed => Some(1),
			OrderStatus::Cooking => Some(2),
			OrderStatus::Ready => Some(3),
			OrderStatus::Delivering => Some(4),
			OrderStatus::Done => Some(5),
			OrderStatus::Cancelled => None,
		}
	}

	/// Returns true for statuses that permit no further movement.
	pub fn is_terminal(self) -> bool {
		matches!(self, OrderStatus::Done | OrderStatus::Cancelled)
	}

	/// Checks whether an order in this status may move to `new`.
	///
	/// The rule, in evaluation order:
	/// - a self-transition is a permitted no-op, terminal statuses included;
	/// - a terminal status permits nothing else;
	/// - `cancelled` is reachable from `pending` only;
	/// - otherwise movement must not go backwards along the linear flow.
	pub fn can_transition(self, new: OrderStatus) -> bool {
		if self == new {
			return true;
		}
		if self.is_terminal() {
			return false;
		}
		if new == OrderStatus::Cancelled {
			return self == OrderStatus::Pending;
		}
		match (self.rank(), new.rank()) {
			(Some(from), Some(to)) => to >= from,
			_ => false,
		}
	}

	/// Returns the wire name of the status.
	pub fn as_str(self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Confirmed => "confirmed",
			OrderStatus::Cooking => "cooking",
			OrderStatus::Ready => "ready",
			OrderStatus::Delivering => "delivering",
			OrderStatus::Done => "done",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Returns an iterator over all status variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Pending,
			Self::Confirmed,
			Self::Cooking,
			Self::Ready,
			Self::Delivering,
			Self::Done,
			Self::Cancelled,
		]
		.into_iter()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(Self::Pending),
			"confirmed" => Ok(Self::Confirmed),
			"cooking" => Ok(Self::Cooking),
			"ready" => Ok(Self::Ready),
			"delivering" => Ok(Self::Delivering),
			"done" => Ok(Self::Done),
			"cancelled" => Ok(Self::Cancelled),
			_ => Err(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn legal(from: OrderStatus, to: OrderStatus) -> bool {
		use OrderStatus::*;

		// Reference table, spelled out pair by pair for the linear flow.
		if from == to {
			return true;
		}
		match (from, to) {
			(Pending, Confirmed | Cooking | Ready | Delivering | Done | Cancelled) => true,
			(Confirmed, Cooking | Ready | Delivering | Done) => true,
			(Cooking, Ready | Delivering | Done) => true,
			(Ready, Delivering | Done) => true,
			(Delivering, Done) => true,
			_ => false,
		}
	}

	#[test]
	fn transition_table_matches_reference() {
		for from in OrderStatus::all() {
			for to in OrderStatus::all() {
				assert_eq!(
					from.can_transition(to),
					legal(from, to),
					"unexpected verdict for {} -> {}",
					from,
					to
				);
			}
		}
	}

	#[test]
	fn terminal_statuses_are_locked_in() {
		for to in OrderStatus::all() {
			if to != OrderStatus::Done {
				assert!(!OrderStatus::Done.can_transition(to));
			}
			if to != OrderStatus::Cancelled {
				assert!(!OrderStatus::Cancelled.can_transition(to));
			}
		}
	}

	#[test]
	fn terminal_self_transition_is_a_noop() {
		assert!(OrderStatus::Done.can_transition(OrderStatus::Done));
		assert!(OrderStatus::Cancelled.can_transition(OrderStatus::Cancelled));
	}

	#[test]
	fn cancellation_only_from_pending() {
		for from in OrderStatus::all() {
			let expected = from == OrderStatus::Pending || from == OrderStatus::Cancelled;
			assert_eq!(from.can_transition(OrderStatus::Cancelled), expected);
		}
	}

	#[test]
	fn rank_never_decreases() {
		assert!(!OrderStatus::Confirmed.can_transition(OrderStatus::Pending));
		assert!(!OrderStatus::Delivering.can_transition(OrderStatus::Ready));
		assert!(OrderStatus::Cooking.can_transition(OrderStatus::Done));
	}

	#[test]
	fn status_round_trips_through_wire_name() {
		for status in OrderStatus::all() {
			assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
		}
	}

	#[test]
	fn pre_discount_total_restores_coin_value() {
		let order = Order {
			id: "0001".into(),
			created_at: Utc::now(),
			address: "somewhere".into(),
			items: vec![],
			total: 90_000,
			status: OrderStatus::Pending,
			payment: PaymentMethod::Cash,
			phone: None,
			customer_name: None,
			extra_phone: None,
			comment: None,
			coins_used: 10,
			channel_message_id: None,
		};
		assert_eq!(order.pre_discount_total(), 100_000);
	}
}
